//! Host programs behind the core's collaborator traits.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use plexus_core::geometry::SECTOR_SIZE;
use plexus_core::toolchain::{BulkCopy, KernelSymbols, SymbolResolver};
use plexus_core::{BuildError, Result};

pub const DEFAULT_CROSS_PREFIX: &str = "m68k-plexus-linux-musl-";
pub const DEFAULT_HOST_BIN: &str = "output/host/bin";

/// Locates `<prefix><tool>` binaries of the cross toolchain.
#[derive(Debug, Clone)]
pub struct Crosstool {
    prefix: String,
    host_bin: PathBuf,
}

impl Crosstool {
    pub fn new(prefix: impl Into<String>, host_bin: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            host_bin: host_bin.into(),
        }
    }

    /// Path of `tool`: first match on `PATH`, then the host build
    /// directory, else the bare name.
    pub fn tool(&self, tool: &str) -> PathBuf {
        let name = format!("{}{}", self.prefix, tool);

        let search = env::var_os("PATH").unwrap_or_default();
        if let Some(found) = env::split_paths(&search)
            .map(|dir| dir.join(&name))
            .find(|candidate| candidate.is_file())
        {
            return found;
        }

        let local = self.host_bin.join(&name);
        if local.exists() {
            return local;
        }

        PathBuf::from(name)
    }

    /// Raw loaded image of `elf` via `objcopy -O binary`.
    pub fn objcopy_binary(&self, elf: &Path) -> Result<Vec<u8>> {
        let scratch = ScratchFile::new("vmlinux.bin");

        let mut cmd = Command::new(self.tool("objcopy"));
        cmd.arg("-O").arg("binary").arg(elf).arg(scratch.path());
        run(cmd)?;

        Ok(fs::read(scratch.path())?)
    }
}

/// Temporary output file, removed on drop
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn new(name: &str) -> Self {
        Self(env::temp_dir().join(format!("plexus-{}-{}", std::process::id(), name)))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

/// Run `cmd` to completion, mapping spawn errors and non-zero exits.
fn run(mut cmd: Command) -> Result<Output> {
    let tool = Path::new(cmd.get_program())
        .file_name()
        .unwrap_or(OsStr::new("?"))
        .to_string_lossy()
        .into_owned();
    log::debug!("running {:?}", cmd);

    let output = cmd.output().map_err(|e| BuildError::ToolFailed {
        tool: tool.clone(),
        status: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::ToolFailed {
            tool,
            status: format!("{} {}", output.status, stderr.trim()),
        });
    }
    Ok(output)
}

/// Reads kernel symbols with the cross `nm`.
pub struct NmResolver<'a> {
    pub tools: &'a Crosstool,
}

impl SymbolResolver for NmResolver<'_> {
    fn resolve(&mut self, kernel: &Path) -> Result<KernelSymbols> {
        let mut cmd = Command::new(self.tools.tool("nm"));
        cmd.arg(kernel);
        let output = run(cmd)?;

        let symbols = KernelSymbols::from_nm_output(&String::from_utf8_lossy(&output.stdout))?;
        log::debug!(
            "symbols: _stext={:#x} _start={:#x} __stop_fixup={:#x} _end={:#x}",
            symbols.stext,
            symbols.start,
            symbols.edata,
            symbols.end
        );
        Ok(symbols)
    }
}

/// Sparse copy with `dd`.
pub struct DdCopy;

impl DdCopy {
    fn command(src: &Path, dst: &Path, seek_lba: u64, len: u64) -> Command {
        let count = len.div_ceil(SECTOR_SIZE as u64);

        let mut cmd = Command::new("dd");
        cmd.arg(prefixed("if=", src))
            .arg(prefixed("of=", dst))
            .arg(format!("bs={}", SECTOR_SIZE))
            .arg(format!("seek={}", seek_lba))
            .arg(format!("count={}", count))
            .arg("conv=sparse,notrunc")
            .arg("status=none");
        cmd
    }
}

impl BulkCopy for DdCopy {
    fn copy_sparse(&mut self, src: &Path, dst: &Path, seek_lba: u64, len: u64) -> Result<()> {
        run(Self::command(src, dst, seek_lba, len))?;
        Ok(())
    }
}

fn prefixed(key: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(key);
    arg.push(path);
    arg
}
