//! Block and LBA geometry of the P20 boot disk.
//!
//! The disk is addressed two ways at once: the GPT side uses 512-byte LBAs,
//! the boot ROM's SVR2 filesystem uses 1 KiB blocks counted from the start of
//! the disk. Block `n` is LBA `2n`. Everything below `DATA_START_BLOCK` is
//! legacy filesystem metadata interleaved with the GPT structures, so the
//! fixed positions here are load-bearing for the firmware.

use crate::error::{BuildError, Result};

/// GPT sector size
pub const SECTOR_SIZE: usize = 0x200;
/// SVR2 filesystem block size
pub const BLOCK_SIZE: usize = 0x400;
pub const SECTORS_PER_BLOCK: u64 = (BLOCK_SIZE / SECTOR_SIZE) as u64;

/// LBA of the partition entry array, pushed back to leave room for the inode table
pub const GPT_LBA: u64 = 8;
pub const GPT_ENTRY_COUNT: u32 = 128;
pub const GPT_ENTRY_SIZE: usize = 0x80;
pub const GPT_ARRAY_SECTORS: u64 = (GPT_ENTRY_COUNT as u64 * GPT_ENTRY_SIZE as u64) / SECTOR_SIZE as u64;

/// Size the protective MBR and the GPT header claim for the disk
pub const REPORTED_DISK_SECTORS: u64 = 0xa000;
/// Zeroed room left after the rootfs for a secondary GPT
pub const SECONDARY_GPT_SECTORS: u64 = 40;

/// Blocks reserved for the kernel object image, whatever its actual size
pub const MAX_KERNEL_BLOCKS: u32 = 4 * 1024;

pub const INODE_TABLE_BLOCK: u32 = 0x2;
pub const DIRENT_BLOCK: u32 = 0x21;
pub const INDIRECT_START_BLOCK: u32 = 0x22;
pub const DATA_START_BLOCK: u32 = 0x400;

pub const DEFAULT_SWAP_MB: u32 = 4;
pub const ROOTFS_ALIGN: u64 = 0x1000;

pub const DIRECT_BLOCKS: u32 = 10;
pub const ADDRS_PER_BLOCK: u32 = (BLOCK_SIZE / 4) as u32;
/// Largest file (in blocks) reachable without the double-indirect slot
pub const SINGLE_INDIRECT_LIMIT: u32 = DIRECT_BLOCKS + ADDRS_PER_BLOCK;
/// Largest file (in blocks) reachable without triple-indirect blocks
pub const DOUBLE_INDIRECT_LIMIT: u32 = SINGLE_INDIRECT_LIMIT + ADDRS_PER_BLOCK * ADDRS_PER_BLOCK;

/// Number of index blocks (single-indirect, double-indirect top level and
/// second-level blocks) needed to map a contiguous file of `blocks` blocks.
///
/// `None` means the file needs triple-indirect blocks.
pub const fn index_blocks_for(blocks: u32) -> Option<u32> {
    if blocks <= DIRECT_BLOCKS {
        Some(0)
    } else if blocks <= SINGLE_INDIRECT_LIMIT {
        Some(1)
    } else if blocks <= DOUBLE_INDIRECT_LIMIT {
        Some(2 + (blocks - SINGLE_INDIRECT_LIMIT).div_ceil(ADDRS_PER_BLOCK))
    } else {
        None
    }
}

/// Number of 1 KiB blocks covering `len` bytes.
pub const fn blocks_for(len: u64) -> u64 {
    len.div_ceil(BLOCK_SIZE as u64)
}

/// Byte offset of a 1 KiB block.
pub const fn block_pos(block: u32) -> u64 {
    block as u64 * BLOCK_SIZE as u64
}

pub const KERNEL_INDEX_BLOCKS: u32 = match index_blocks_for(MAX_KERNEL_BLOCKS) {
    Some(n) => n,
    None => panic!("kernel budget needs triple-indirect blocks"),
};

// Static regions must not step on each other.
const _: () = assert!((INODE_TABLE_BLOCK as u64 + 1) * SECTORS_PER_BLOCK <= GPT_LBA);
const _: () = assert!(GPT_LBA + GPT_ARRAY_SECTORS <= DIRENT_BLOCK as u64 * SECTORS_PER_BLOCK);
const _: () = assert!(DIRENT_BLOCK < INDIRECT_START_BLOCK);
const _: () = assert!(INDIRECT_START_BLOCK + KERNEL_INDEX_BLOCKS < DATA_START_BLOCK);

/// Where the optional `ccal` payload lives in the legacy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxRegion {
    /// First index block
    pub index_block: u32,
    /// Index blocks actually reserved (at least one)
    pub index_blocks: u32,
    /// First data block, right after the index blocks
    pub start_block: u32,
    /// Data blocks
    pub blocks: u32,
    /// Payload length in bytes
    pub len: u64,
}

/// Every block/LBA boundary of one build, computed once and passed by
/// reference to the GPT builder, the filesystem builder and the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub max_kernel_blocks: u32,
    pub inode_table_block: u32,
    pub dirent_block: u32,
    /// Single-indirect block of the kernel, followed by its double-indirect chain
    pub kernel_index_block: u32,
    pub kernel_index_blocks: u32,
    pub data_start_block: u32,
    pub aux: Option<AuxRegion>,

    pub swap_mb: u32,
    /// Rootfs size rounded up to `ROOTFS_ALIGN`
    pub rootfs_size: u64,
    pub swap_start_lba: u64,
    pub rootfs_start_lba: u64,
    /// Exclusive end of the rootfs partition, also where the secondary GPT room starts
    pub rootfs_end_lba: u64,
}

impl Geometry {
    /// Compute the layout for a rootfs of `rootfs_len` bytes, `swap_mb` MiB of
    /// swap and an optional auxiliary payload of `aux_len` bytes.
    pub fn new(swap_mb: u32, rootfs_len: u64, aux_len: Option<u64>) -> Result<Self> {
        if swap_mb == 0 {
            return Err(BuildError::InvalidLayout("swap partition must be at least 1 MiB"));
        }
        if rootfs_len == 0 {
            return Err(BuildError::InvalidLayout("rootfs image is empty"));
        }

        let rootfs_size = rootfs_len.div_ceil(ROOTFS_ALIGN) * ROOTFS_ALIGN;
        let swap_start_lba = (DATA_START_BLOCK as u64 + MAX_KERNEL_BLOCKS as u64) * SECTORS_PER_BLOCK;
        let rootfs_start_lba = swap_start_lba + ((swap_mb as u64 * 1024 * 1024) >> 9);
        let rootfs_end_lba = rootfs_start_lba + (rootfs_size >> 9);

        let aux_index_block = INDIRECT_START_BLOCK + KERNEL_INDEX_BLOCKS;
        let aux = aux_len
            .map(|len| Self::place_aux(aux_index_block, len))
            .transpose()?;

        Ok(Self {
            max_kernel_blocks: MAX_KERNEL_BLOCKS,
            inode_table_block: INODE_TABLE_BLOCK,
            dirent_block: DIRENT_BLOCK,
            kernel_index_block: INDIRECT_START_BLOCK,
            kernel_index_blocks: KERNEL_INDEX_BLOCKS,
            data_start_block: DATA_START_BLOCK,
            aux,
            swap_mb,
            rootfs_size,
            swap_start_lba,
            rootfs_start_lba,
            rootfs_end_lba,
        })
    }

    fn place_aux(index_block: u32, len: u64) -> Result<AuxRegion> {
        let overflow = || BuildError::SizeOverflow {
            what: "ccal",
            size: len,
            max: DOUBLE_INDIRECT_LIMIT as u64 * BLOCK_SIZE as u64,
        };

        let blocks = u32::try_from(blocks_for(len)).map_err(|_| overflow())?;
        // Even a tiny payload keeps its (empty) index block so the data
        // always starts one block after `index_block`.
        let index_blocks = index_blocks_for(blocks).ok_or_else(overflow)?.max(1);

        let start_block = index_block + index_blocks;
        let end_block = start_block as u64 + blocks as u64;
        if end_block > DATA_START_BLOCK as u64 {
            return Err(BuildError::LegacyRegionOverflow {
                end_block: u32::try_from(end_block).unwrap_or(u32::MAX),
                limit: DATA_START_BLOCK,
            });
        }

        Ok(AuxRegion {
            index_block,
            index_blocks,
            start_block,
            blocks,
            len,
        })
    }

    pub fn kernel_start_lba(&self) -> u64 {
        self.data_start_block as u64 * SECTORS_PER_BLOCK
    }

    pub fn kernel_end_lba(&self) -> u64 {
        self.swap_start_lba - 1
    }

    pub fn swap_end_lba(&self) -> u64 {
        self.rootfs_start_lba - 1
    }

    /// Inclusive last LBA of the rootfs partition
    pub fn rootfs_last_lba(&self) -> u64 {
        self.rootfs_end_lba - 1
    }

    pub fn first_usable_lba(&self) -> u64 {
        self.kernel_start_lba()
    }

    pub fn last_usable_lba(&self) -> u64 {
        self.rootfs_last_lba()
    }

    pub fn secondary_gpt_lba(&self) -> u64 {
        self.rootfs_end_lba
    }

    /// Length of the finished image file before the rootfs is copied in.
    pub fn image_len(&self) -> u64 {
        (self.rootfs_end_lba + SECONDARY_GPT_SECTORS) * SECTOR_SIZE as u64
    }
}
