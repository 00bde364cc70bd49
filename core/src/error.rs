//! Build error type shared by every stage of the image assembler.

use std::path::PathBuf;

/// Everything that can abort a disk image build.
///
/// None of these are recoverable: a build that fails after the output file
/// was opened leaves whatever was already written in place.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// File needs more indirection than single + double indirect blocks
    #[error("{what} of {size} bytes needs triple-indirect blocks (max {max} bytes)")]
    SizeOverflow {
        what: &'static str,
        size: u64,
        max: u64,
    },

    /// Object image does not fit the reserved kernel block budget
    #[error("kernel image needs {blocks} blocks but only {budget} are reserved")]
    KernelTooLarge { blocks: u32, budget: u32 },

    /// Auxiliary payload would run into the kernel data area
    #[error("ccal ends at block {end_block:#x}, past the legacy region limit {limit:#x}")]
    LegacyRegionOverflow { end_block: u32, limit: u32 },

    /// Raw kernel length disagrees with its own symbol table
    #[error("image size mismatch: binary is {binary_len:#x} bytes, symbols say {expected:#x}")]
    SizeMismatch { binary_len: u64, expected: u64 },

    /// Segment symbols are not in `_stext <= __stop_fixup <= _end` order
    #[error("kernel symbols out of order: _stext={stext:#x} __stop_fixup={edata:#x} _end={end:#x}")]
    SymbolOrder { stext: u32, edata: u32, end: u32 },

    #[error("symbol `{0}` not found in kernel symbol table")]
    MissingSymbol(&'static str),

    #[error("malformed symbol table line: `{0}`")]
    MalformedSymbol(String),

    /// External process could not be run or exited non-zero
    #[error("`{tool}` failed: {status}")]
    ToolFailed { tool: String, status: String },

    #[error("required input `{}` does not exist", .0.display())]
    MissingInput(PathBuf),

    /// Geometry inputs that cannot describe a valid disk
    #[error("invalid layout: {0}")]
    InvalidLayout(&'static str),

    /// Partition ranges empty, descending or overlapping
    #[error("partition `{name}` LBA range {start:#x}..={end:#x} is invalid: {reason}")]
    PartitionLayout {
        name: String,
        start: u64,
        end: u64,
        reason: &'static str,
    },

    #[error("invalid partition name `{0}`")]
    PartitionName(String),

    /// Directory entry names are limited to 14 bytes
    #[error("directory entry name `{0}` is longer than 14 bytes")]
    NameTooLong(String),

    /// Inode block addresses are 24 bits wide
    #[error("block number {0:#x} does not fit in a 3-byte inode address")]
    BlockAddress(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, BuildError>;
