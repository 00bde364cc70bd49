// SVR2 on-disk records. All integers are big-endian (68k boot ROM).

use zerocopy::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{BuildError, Result};
use crate::geometry::ADDRS_PER_BLOCK;

/// Address slots in an inode: 10 direct, single, double, triple indirect
pub const NADDR: usize = 13;
/// Bytes per packed block address
pub const ADDR_BYTES: usize = 3;
pub const INODE_SIZE: usize = 64;
pub const DIRENT_SIZE: usize = 16;
pub const DIRENT_NAME_LEN: usize = 14;

/// Directory file mode
pub const S_IFDIR: u16 = 0x4000;

/// Inode numbers are 1-based positions in the inode table
pub const ROOT_INO: u16 = 2;
pub const LOST_FOUND_INO: u16 = 3;
pub const KERNEL_INO: u16 = 4;
pub const CCAL_INO: u16 = 5;

pub const SINGLE_INDIRECT_SLOT: usize = 10;
pub const DOUBLE_INDIRECT_SLOT: usize = 11;

/// Disk inode
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Inode {
    pub mode: U16,
    pub nlink: U16,
    pub uid: U16,
    pub gid: U16,
    pub size: U32,
    /// 13 packed 3-byte block numbers and one pad byte
    pub addr: [u8; 40],
    pub atime: U32,
    pub mtime: U32,
    pub ctime: U32,
}

const _: () = assert!(core::mem::size_of::<Inode>() == INODE_SIZE);

impl Inode {
    /// Unpack the 13 block addresses.
    pub fn addresses(&self) -> [u32; NADDR] {
        let mut out = [0u32; NADDR];
        for (slot, chunk) in out.iter_mut().zip(self.addr.chunks_exact(ADDR_BYTES)) {
            *slot = (chunk[0] as u32) << 16 | (chunk[1] as u32) << 8 | chunk[2] as u32;
        }
        out
    }
}

/// Pack block numbers into the inode's 3-byte big-endian address field.
pub fn pack_addresses(addrs: &[u32; NADDR]) -> Result<[u8; 40]> {
    let mut packed = [0u8; 40];
    for (chunk, &addr) in packed.chunks_exact_mut(ADDR_BYTES).zip(addrs) {
        if addr > 0x00ff_ffff {
            return Err(BuildError::BlockAddress(addr));
        }
        chunk.copy_from_slice(&addr.to_be_bytes()[1..]);
    }
    Ok(packed)
}

/// Directory entry
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DirEntry {
    pub ino: U16,
    /// NUL padded, not necessarily NUL terminated
    pub name: [u8; DIRENT_NAME_LEN],
}

const _: () = assert!(core::mem::size_of::<DirEntry>() == DIRENT_SIZE);

impl DirEntry {
    pub fn new(ino: u16, name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > DIRENT_NAME_LEN {
            return Err(BuildError::NameTooLong(name.to_string()));
        }

        let mut entry = Self {
            ino: U16::new(ino),
            name: [0; DIRENT_NAME_LEN],
        };
        entry.name[..bytes.len()].copy_from_slice(bytes);
        Ok(entry)
    }
}

/// One block of 32-bit block numbers
#[repr(C)]
#[derive(Debug, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IndirectBlock {
    pub addrs: [U32; ADDRS_PER_BLOCK as usize],
}

impl IndirectBlock {
    pub fn zeroed() -> Self {
        Self {
            addrs: [U32::ZERO; ADDRS_PER_BLOCK as usize],
        }
    }

    /// Number of leading non-zero slots
    #[cfg(test)]
    pub(crate) fn populated(&self) -> usize {
        self.addrs.iter().take_while(|a| a.get() != 0).count()
    }
}
