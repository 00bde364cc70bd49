//! Seams to the external tools a build depends on.
//!
//! Symbol lookup and the bulk rootfs copy are performed by host programs
//! (`nm`, `dd`). The core only sees these traits; the binary crate provides
//! process-backed implementations and tests provide in-memory ones.

use std::path::Path;

use crate::error::{BuildError, Result};

/// Kernel link addresses that shape the object image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSymbols {
    /// `_stext`, first loaded byte
    pub stext: u32,
    /// `_start`, entry point
    pub start: u32,
    /// `__stop_fixup`, end of initialized data
    pub edata: u32,
    /// `_end`, end of bss
    pub end: u32,
}

impl KernelSymbols {
    /// Parse an `nm` listing (`<hex addr> <type> <name>` per line).
    ///
    /// Lines without an address (undefined symbols) are skipped. A symbol
    /// listed more than once takes its last address.
    pub fn from_nm_output(listing: &str) -> Result<Self> {
        let mut stext = None;
        let mut start = None;
        let mut edata = None;
        let mut end = None;

        for line in listing.lines() {
            let mut fields = line.split_whitespace();
            let (Some(addr), Some(_kind), Some(name)) = (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };

            let slot = match name {
                "_stext" => &mut stext,
                "_start" => &mut start,
                "__stop_fixup" => &mut edata,
                "_end" => &mut end,
                _ => continue,
            };

            let value = u32::from_str_radix(addr, 16)
                .map_err(|_| BuildError::MalformedSymbol(line.trim().to_string()))?;
            *slot = Some(value);
        }

        Ok(Self {
            stext: stext.ok_or(BuildError::MissingSymbol("_stext"))?,
            start: start.ok_or(BuildError::MissingSymbol("_start"))?,
            edata: edata.ok_or(BuildError::MissingSymbol("__stop_fixup"))?,
            end: end.ok_or(BuildError::MissingSymbol("_end"))?,
        })
    }
}

/// Looks up the link addresses of a kernel ELF.
pub trait SymbolResolver {
    fn resolve(&mut self, kernel: &Path) -> Result<KernelSymbols>;
}

/// Copies `len` bytes of `src` into `dst` starting at sector `seek_lba`,
/// leaving zero runs as holes and keeping the rest of `dst` intact.
pub trait BulkCopy {
    fn copy_sparse(&mut self, src: &Path, dst: &Path, seek_lba: u64, len: u64) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
         U __udivsi3
00001000 T _stext
00001000 T _start
00001a40 t do_one_initcall
0002f3c0 D __stop_fixup
00041000 B _end
";

    #[test]
    fn test_parse_listing() {
        let symbols = KernelSymbols::from_nm_output(LISTING).unwrap();
        assert_eq!(
            symbols,
            KernelSymbols {
                stext: 0x1000,
                start: 0x1000,
                edata: 0x2f3c0,
                end: 0x41000,
            }
        );
    }

    #[test]
    fn test_duplicate_symbol_keeps_last() {
        let listing = format!("{}00000400 T _start\n00041800 B _end\n", LISTING);
        let symbols = KernelSymbols::from_nm_output(&listing).unwrap();
        assert_eq!(symbols.stext, 0x1000);
        assert_eq!(symbols.start, 0x400);
        assert_eq!(symbols.end, 0x41800);
    }

    #[test]
    fn test_missing_symbol() {
        let listing = LISTING.replace("_end", "_end_of_text");
        assert!(matches!(
            KernelSymbols::from_nm_output(&listing),
            Err(BuildError::MissingSymbol("_end"))
        ));
    }

    #[test]
    fn test_malformed_address() {
        let listing = LISTING.replace("0002f3c0", "0002f3zz");
        assert!(matches!(
            KernelSymbols::from_nm_output(&listing),
            Err(BuildError::MalformedSymbol(line)) if line.contains("__stop_fixup")
        ));
    }

    #[test]
    fn test_empty_listing() {
        assert!(matches!(
            KernelSymbols::from_nm_output(""),
            Err(BuildError::MissingSymbol("_stext"))
        ));
    }
}
