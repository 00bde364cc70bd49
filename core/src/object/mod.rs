//! SVR2 object image packaging.
//!
//! The boot ROM loads a COFF-like image: a 32-byte header giving text, data
//! and bss sizes plus the entry point, followed by memory contents from
//! address zero. Low memory below `_stext` is not part of the raw kernel
//! binary, so it is materialized as zeros. The image always ends with
//! 1 to 1024 bytes of zero padding, so it is a whole number of 1 KiB blocks
//! and never ends exactly on its last loaded byte.

use zerocopy::big_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{BuildError, Result};
use crate::geometry::BLOCK_SIZE;
use crate::toolchain::KernelSymbols;

/// Format tag in the first header word
pub const OBJECT_MAGIC: u32 = 0x108;
pub const OBJECT_HEADER_SIZE: usize = 32;

/// Text ends on the last page boundary before `__stop_fixup`
const PAGE_MASK: u32 = 0xfff;

/// Object image header, big-endian
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ObjectHeader {
    pub magic: U32,
    pub tsize: U32,
    pub dsize: U32,
    pub bsize: U32,
    pub reserved: [U32; 3],
    pub entry: U32,
}

const _: () = assert!(core::mem::size_of::<ObjectHeader>() == OBJECT_HEADER_SIZE);

impl ObjectHeader {
    /// Segment sizes for a kernel described by `symbols`.
    pub fn for_symbols(symbols: &KernelSymbols) -> Self {
        Self {
            magic: U32::new(OBJECT_MAGIC),
            tsize: U32::new(symbols.edata & !PAGE_MASK),
            dsize: U32::new(symbols.edata & PAGE_MASK),
            bsize: U32::new(symbols.end - symbols.edata),
            reserved: [U32::ZERO; 3],
            entry: U32::new(symbols.start),
        }
    }

    /// Read the header at the start of an object image.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = Self::read_from_bytes(bytes.get(..OBJECT_HEADER_SIZE)?).ok()?;
        (header.magic.get() == OBJECT_MAGIC).then_some(header)
    }
}

/// Packaged kernel, ready for the tape file or the disk's data area.
#[derive(Debug, Clone)]
pub struct ObjectImage {
    header: ObjectHeader,
    bytes: Vec<u8>,
}

impl ObjectImage {
    /// Wrap the raw kernel `binary` (the loaded range `_stext..__stop_fixup`)
    /// into an object image.
    ///
    /// Fails without producing anything if the symbols are out of order or
    /// the binary length disagrees with them.
    pub fn package(binary: &[u8], symbols: &KernelSymbols) -> Result<Self> {
        if symbols.stext > symbols.edata || symbols.edata > symbols.end {
            return Err(BuildError::SymbolOrder {
                stext: symbols.stext,
                edata: symbols.edata,
                end: symbols.end,
            });
        }

        let expected = (symbols.edata - symbols.stext) as u64;
        if binary.len() as u64 != expected {
            return Err(BuildError::SizeMismatch {
                binary_len: binary.len() as u64,
                expected,
            });
        }

        let header = ObjectHeader::for_symbols(symbols);

        let loaded = OBJECT_HEADER_SIZE + symbols.edata as usize;
        let padding = BLOCK_SIZE - loaded % BLOCK_SIZE;

        let mut bytes = Vec::with_capacity(loaded + padding);
        bytes.extend_from_slice(header.as_bytes());
        bytes.resize(OBJECT_HEADER_SIZE + symbols.stext as usize, 0);
        bytes.extend_from_slice(binary);
        bytes.resize(loaded + padding, 0);

        log::info!(
            "Object image: text {:#x} data {:#x} bss {:#x} entry {:#x}, {} bytes",
            header.tsize.get(),
            header.dsize.get(),
            header.bsize.get(),
            header.entry.get(),
            bytes.len()
        );

        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(stext: u32, start: u32, edata: u32, end: u32) -> KernelSymbols {
        KernelSymbols {
            stext,
            start,
            edata,
            end,
        }
    }

    #[test]
    fn test_reference_kernel() {
        let binary = vec![0x4e; 0x1000];
        let image = ObjectImage::package(&binary, &symbols(0x1000, 0x1000, 0x2000, 0x3000)).unwrap();
        let header = image.header();

        assert_eq!(header.magic.get(), 0x108);
        // __stop_fixup on a page boundary: all text, no data
        assert_eq!(header.tsize.get(), 0x2000);
        assert_eq!(header.dsize.get(), 0);
        assert_eq!(header.bsize.get(), 0x1000);
        assert_eq!(header.entry.get(), 0x1000);
        assert_eq!(image.len() % 1024, 0);
        assert_eq!(image.len(), 0x2400);

        let bytes = image.as_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 1, 8]);
        assert!(bytes[32..32 + 0x1000].iter().all(|&b| b == 0));
        assert!(bytes[32 + 0x1000..32 + 0x2000].iter().all(|&b| b == 0x4e));
        assert!(bytes[32 + 0x2000..].iter().all(|&b| b == 0));
        assert_eq!(ObjectHeader::parse(bytes), Some(*header));
    }

    #[test]
    fn test_data_segment_split() {
        let binary = vec![1u8; 0x1234];
        let image = ObjectImage::package(&binary, &symbols(0x400, 0x408, 0x1634, 0x2000)).unwrap();

        assert_eq!(image.header().tsize.get(), 0x1000);
        assert_eq!(image.header().dsize.get(), 0x634);
        assert_eq!(image.header().bsize.get(), 0x2000 - 0x1634);
        assert_eq!(image.header().entry.get(), 0x408);
        assert_eq!(image.len(), (32 + 0x1634usize).div_ceil(1024) * 1024);
    }

    #[test]
    fn test_aligned_image_gets_full_pad_block() {
        let binary = vec![1u8; 0x3e0];
        let image = ObjectImage::package(&binary, &symbols(0, 0, 0x3e0, 0x3e0)).unwrap();
        assert_eq!(image.len(), 0x800);
        assert!(image.as_bytes()[0x400..].iter().all(|&b| b == 0));

        let binary = vec![1u8; 0x3df];
        let image = ObjectImage::package(&binary, &symbols(0, 0, 0x3df, 0x3df)).unwrap();
        assert_eq!(image.len(), 0x400);
    }

    #[test]
    fn test_size_mismatch() {
        let binary = vec![0u8; 0xfff];
        let err = ObjectImage::package(&binary, &symbols(0x1000, 0x1000, 0x2000, 0x3000)).unwrap_err();
        assert!(matches!(
            err,
            BuildError::SizeMismatch {
                binary_len: 0xfff,
                expected: 0x1000
            }
        ));
    }

    #[test]
    fn test_symbols_out_of_order() {
        let err = ObjectImage::package(&[], &symbols(0x2000, 0x2000, 0x1000, 0x3000)).unwrap_err();
        assert!(matches!(err, BuildError::SymbolOrder { .. }));

        let err = ObjectImage::package(&[], &symbols(0x1000, 0x1000, 0x1000, 0x800)).unwrap_err();
        assert!(matches!(err, BuildError::SymbolOrder { .. }));
    }

    #[test]
    fn test_parse_rejects_foreign_magic() {
        assert_eq!(ObjectHeader::parse(&[0u8; 32]), None);
        assert_eq!(ObjectHeader::parse(&[0u8; 8]), None);
    }
}
