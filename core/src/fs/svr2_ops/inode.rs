// Inode construction for contiguously stored files

use zerocopy::big_endian::{U16, U32};
use zerocopy::IntoBytes;

use super::types::{
    pack_addresses, Inode, DOUBLE_INDIRECT_SLOT, INODE_SIZE, NADDR, SINGLE_INDIRECT_SLOT,
};
use crate::error::{BuildError, Result};
use crate::geometry::{BLOCK_SIZE, DIRECT_BLOCKS, DOUBLE_INDIRECT_LIMIT, SINGLE_INDIRECT_LIMIT};

/// Largest file an inode can describe without triple-indirect blocks
pub const MAX_FILE_SIZE: u64 = DOUBLE_INDIRECT_LIMIT as u64 * BLOCK_SIZE as u64;

/// Build the inode of a file of `size` bytes stored contiguously from
/// `data_block`, whose index chain starts at `index_block`.
///
/// The indirection depth follows from `size` alone: direct slot `n` is set
/// once the file reaches into block `n`, slot 10 once it passes the direct
/// blocks, slot 11 (pointing at the double-indirect block right after the
/// single-indirect one) once it passes the single-indirect range.
pub fn build_inode(mode: u16, size: u64, data_block: u32, index_block: u32) -> Result<Inode> {
    if size > MAX_FILE_SIZE {
        return Err(BuildError::SizeOverflow {
            what: "file",
            size,
            max: MAX_FILE_SIZE,
        });
    }

    let block = BLOCK_SIZE as u64;
    let mut addrs = [0u32; NADDR];

    for (n, slot) in addrs.iter_mut().take(DIRECT_BLOCKS as usize).enumerate() {
        if size > n as u64 * block {
            *slot = data_block + n as u32;
        }
    }
    if size > block * DIRECT_BLOCKS as u64 {
        addrs[SINGLE_INDIRECT_SLOT] = index_block;
    }
    if size > block * SINGLE_INDIRECT_LIMIT as u64 {
        addrs[DOUBLE_INDIRECT_SLOT] = index_block + 1;
    }

    Ok(Inode {
        mode: U16::new(mode),
        nlink: U16::ZERO,
        uid: U16::ZERO,
        gid: U16::ZERO,
        // MAX_FILE_SIZE fits in 32 bits
        size: U32::new(size as u32),
        addr: pack_addresses(&addrs)?,
        atime: U32::ZERO,
        mtime: U32::ZERO,
        ctime: U32::ZERO,
    })
}

/// Unused inode slot
pub fn empty_inode() -> Inode {
    Inode {
        mode: U16::ZERO,
        nlink: U16::ZERO,
        uid: U16::ZERO,
        gid: U16::ZERO,
        size: U32::ZERO,
        addr: [0; 40],
        atime: U32::ZERO,
        mtime: U32::ZERO,
        ctime: U32::ZERO,
    }
}

/// Serialize inodes 1..=n into one inode-table block.
pub fn build_inode_table(inodes: &[Inode]) -> Vec<u8> {
    let mut table = vec![0u8; (inodes.len() * INODE_SIZE).div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE];
    for (chunk, inode) in table.chunks_exact_mut(INODE_SIZE).zip(inodes) {
        chunk.copy_from_slice(inode.as_bytes());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_has_no_blocks() {
        let inode = build_inode(0, 0, 0x400, 0x22).unwrap();
        assert_eq!(inode.addresses(), [0u32; NADDR]);
        assert_eq!(inode, empty_inode());
    }

    #[test]
    fn test_partial_direct() {
        let inode = build_inode(0, 2049, 0x100, 0x22).unwrap();
        let addrs = inode.addresses();
        assert_eq!(&addrs[..4], &[0x100, 0x101, 0x102, 0]);
        assert_eq!(addrs[SINGLE_INDIRECT_SLOT], 0);
    }

    #[test]
    fn test_exactly_ten_blocks_needs_no_indirect() {
        let addrs = build_inode(0, 10 * 1024, 0x400, 0x22).unwrap().addresses();
        assert_eq!(addrs[9], 0x409);
        assert_eq!(addrs[SINGLE_INDIRECT_SLOT], 0);
    }

    #[test]
    fn test_single_indirect_threshold() {
        let addrs = build_inode(0, 10 * 1024 + 1, 0x400, 0x22).unwrap().addresses();

        for n in 0..10 {
            assert_eq!(addrs[n], 0x400 + n as u32);
        }
        assert_eq!(addrs[SINGLE_INDIRECT_SLOT], 0x22);
        assert_eq!(addrs[DOUBLE_INDIRECT_SLOT], 0);
        assert_eq!(addrs[12], 0);
    }

    #[test]
    fn test_double_indirect_threshold() {
        let at_limit = build_inode(0, 266 * 1024, 0x400, 0x22).unwrap().addresses();
        assert_eq!(at_limit[DOUBLE_INDIRECT_SLOT], 0);

        let past = build_inode(0, 266 * 1024 + 1, 0x400, 0x22).unwrap().addresses();
        assert_eq!(past[SINGLE_INDIRECT_SLOT], 0x22);
        assert_eq!(past[DOUBLE_INDIRECT_SLOT], 0x23);
        assert_eq!(past[12], 0);
    }

    #[test]
    fn test_triple_indirect_rejected() {
        assert!(build_inode(0, MAX_FILE_SIZE, 0x400, 0x22).is_ok());
        let err = build_inode(0, 0x400 * (10 + 256 + 65536) + 1, 0x400, 0x22).unwrap_err();
        assert!(matches!(err, BuildError::SizeOverflow { .. }));
    }

    #[test]
    fn test_header_fields_big_endian() {
        let inode = build_inode(0x4000, 0x20, 0x21, 0).unwrap();
        let bytes = inode.as_bytes();

        assert_eq!(&bytes[0..2], &[0x40, 0x00]);
        assert_eq!(&bytes[2..8], &[0; 6]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0x20]);
        assert_eq!(&bytes[12..15], &[0, 0, 0x21]);
        assert_eq!(&bytes[52..64], &[0; 12]);
    }

    #[test]
    fn test_inode_table_positions() {
        let root = build_inode(0x4000, 0x10, 0x21, 0).unwrap();
        let table = build_inode_table(&[empty_inode(), root]);

        assert_eq!(table.len(), 1024);
        assert!(table[..64].iter().all(|&b| b == 0));
        assert_eq!(&table[64..66], &[0x40, 0x00]);
    }
}
