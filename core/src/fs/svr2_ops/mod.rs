//! Just enough of an SVR2 filesystem for the P20 boot ROM to find `/linux`.
//!
//! The ROM reads the inode table at a fixed block, looks the kernel up in the
//! root directory and follows direct, single- and double-indirect block
//! addresses. Files are stored contiguously, so every map here is a run of
//! consecutive block numbers.

mod directory;
mod indirect;
mod inode;
mod types;

pub use directory::build_directory_entries;
pub use indirect::{build_block_map, write_double_indirect, write_indirect_block};
pub use inode::{build_inode, build_inode_table, empty_inode, MAX_FILE_SIZE};
pub use types::{
    pack_addresses, DirEntry, IndirectBlock, Inode, CCAL_INO, DIRENT_SIZE, INODE_SIZE, KERNEL_INO,
    LOST_FOUND_INO, NADDR, ROOT_INO, S_IFDIR,
};

use zerocopy::IntoBytes;

use crate::error::{BuildError, Result};
use crate::geometry::{blocks_for, Geometry, BLOCK_SIZE};

/// Path the boot ROM loads
pub const KERNEL_NAME: &str = "linux";
pub const CCAL_NAME: &str = "ccal";

/// Kernel and ccal are plain files with no permission bits
const FILE_MODE: u16 = 0;

/// Metadata blocks of the legacy filesystem for one build.
#[derive(Debug, Clone)]
pub struct Svr2Filesystem {
    /// One block, inodes 1..=5
    pub inode_table: Vec<u8>,
    /// Root directory block
    pub root_dir: Vec<u8>,
    /// Index chain covering the whole kernel budget
    pub kernel_map: Vec<IndirectBlock>,
    /// Index chain of the ccal payload, empty without one
    pub aux_map: Vec<IndirectBlock>,
}

impl Svr2Filesystem {
    /// Lay out the filesystem for a kernel object image of `kernel_len` bytes
    /// and the ccal payload described by `geometry.aux`.
    ///
    /// The kernel inode reflects the actual image size while its index chain
    /// always maps the full `max_kernel_blocks` budget.
    pub fn build(geometry: &Geometry, kernel_len: u64) -> Result<Self> {
        let kernel_blocks = blocks_for(kernel_len);
        if kernel_blocks > geometry.max_kernel_blocks as u64 {
            return Err(BuildError::KernelTooLarge {
                blocks: u32::try_from(kernel_blocks).unwrap_or(u32::MAX),
                budget: geometry.max_kernel_blocks,
            });
        }

        let mut dirents: Vec<(u16, &str)> = vec![(KERNEL_INO, KERNEL_NAME)];
        if geometry.aux.is_some() {
            dirents.push((CCAL_INO, CCAL_NAME));
        }
        let dir_bytes = build_directory_entries(&dirents)?;

        let mut inodes = vec![
            empty_inode(),
            build_inode(S_IFDIR, dir_bytes.len() as u64, geometry.dirent_block, 0)?,
            // lost+found
            empty_inode(),
            build_inode(
                FILE_MODE,
                kernel_len,
                geometry.data_start_block,
                geometry.kernel_index_block,
            )?,
        ];

        let kernel_map = build_block_map(
            geometry.max_kernel_blocks,
            geometry.data_start_block,
            geometry.kernel_index_block,
        )?;
        debug_assert_eq!(kernel_map.len(), geometry.kernel_index_blocks as usize);

        let mut aux_map = Vec::new();
        if let Some(aux) = &geometry.aux {
            inodes.push(build_inode(FILE_MODE, aux.len, aux.start_block, aux.index_block)?);

            aux_map = build_block_map(aux.blocks, aux.start_block, aux.index_block)?;
            // Reserved but unneeded index blocks are written as zeros
            aux_map.resize(aux.index_blocks as usize, IndirectBlock::zeroed());
        }

        let mut root_dir = dir_bytes;
        root_dir.resize(BLOCK_SIZE, 0);

        log::debug!(
            "svr2: {} inodes, kernel {} bytes in {} blocks, {} kernel index blocks",
            inodes.len(),
            kernel_len,
            kernel_blocks,
            kernel_map.len()
        );

        Ok(Self {
            inode_table: build_inode_table(&inodes),
            root_dir,
            kernel_map,
            aux_map,
        })
    }

    /// Every metadata block paired with the block number it belongs at.
    pub fn placements<'a>(&'a self, geometry: &Geometry) -> Vec<(u32, &'a [u8])> {
        let mut out = vec![
            (geometry.inode_table_block, self.inode_table.as_slice()),
            (geometry.dirent_block, self.root_dir.as_slice()),
        ];
        out.extend(
            self.kernel_map
                .iter()
                .enumerate()
                .map(|(n, block)| (geometry.kernel_index_block + n as u32, block.as_bytes())),
        );
        if let Some(aux) = &geometry.aux {
            out.extend(
                self.aux_map
                    .iter()
                    .enumerate()
                    .map(|(n, block)| (aux.index_block + n as u32, block.as_bytes())),
            );
        }
        out
    }

    /// Decode inode `ino` (1-based) from the inode table.
    pub fn inode(&self, ino: u16) -> Option<Inode> {
        let index = (ino as usize).checked_sub(1)?;
        let bytes = self.inode_table.get(index * INODE_SIZE..(index + 1) * INODE_SIZE)?;
        zerocopy::FromBytes::read_from_bytes(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_only() {
        let geometry = Geometry::new(4, 1 << 20, None).unwrap();
        let fs = Svr2Filesystem::build(&geometry, 0x2400).unwrap();

        let root = fs.inode(ROOT_INO).unwrap();
        assert_eq!(root.mode.get(), S_IFDIR);
        assert_eq!(root.size.get(), 16);
        assert_eq!(root.addresses()[0], 0x21);

        let kernel = fs.inode(KERNEL_INO).unwrap();
        assert_eq!(kernel.size.get(), 0x2400);
        assert_eq!(&kernel.addresses()[..10], &[0x400, 0x401, 0x402, 0x403, 0x404, 0x405, 0x406, 0x407, 0x408, 0]);

        assert_eq!(fs.inode(1).unwrap(), empty_inode());
        assert_eq!(fs.inode(LOST_FOUND_INO).unwrap(), empty_inode());
        assert_eq!(fs.inode(CCAL_INO).unwrap(), empty_inode());
        assert!(fs.aux_map.is_empty());
        assert_eq!(fs.kernel_map.len(), 17);
        assert_eq!(&fs.root_dir[..7], b"\x00\x04linux");
        assert_eq!(fs.root_dir.len(), 1024);
    }

    #[test]
    fn test_with_ccal() {
        let geometry = Geometry::new(4, 1 << 20, Some(12 * 1024 + 5)).unwrap();
        let fs = Svr2Filesystem::build(&geometry, 0x2400).unwrap();

        let root = fs.inode(ROOT_INO).unwrap();
        assert_eq!(root.size.get(), 32);
        assert_eq!(&fs.root_dir[16..22], b"\x00\x05ccal");

        let ccal = fs.inode(CCAL_INO).unwrap();
        let addrs = ccal.addresses();
        assert_eq!(ccal.size.get(), 12 * 1024 + 5);
        assert_eq!(addrs[0], 0x34);
        assert_eq!(addrs[10], 0x33);

        // 13 blocks: 3 past the direct range
        assert_eq!(fs.aux_map.len(), 1);
        assert_eq!(fs.aux_map[0].populated(), 3);
        assert_eq!(fs.aux_map[0].addrs[0].get(), 0x34 + 10);
    }

    #[test]
    fn test_small_ccal_keeps_zeroed_index_block() {
        let geometry = Geometry::new(4, 1 << 20, Some(100)).unwrap();
        let fs = Svr2Filesystem::build(&geometry, 1024).unwrap();

        assert_eq!(fs.aux_map.len(), 1);
        assert_eq!(fs.aux_map[0].populated(), 0);
    }

    #[test]
    fn test_placements_are_ordered_and_disjoint() {
        let geometry = Geometry::new(4, 1 << 20, Some(400 * 1024)).unwrap();
        let fs = Svr2Filesystem::build(&geometry, 0x2400).unwrap();
        let placements = fs.placements(&geometry);

        assert_eq!(placements[0].0, 2);
        assert_eq!(placements[1].0, 0x21);
        assert_eq!(placements[2].0, 0x22);
        for pair in placements[1..].windows(2) {
            assert_eq!(pair[1].0, pair[0].0 + 1);
        }
        assert!(placements.iter().all(|(_, bytes)| bytes.len() == 1024));
        let last = placements.last().unwrap().0;
        assert!(last < geometry.aux.unwrap().start_block);
    }

    #[test]
    fn test_kernel_over_budget() {
        let geometry = Geometry::new(4, 1 << 20, None).unwrap();
        let err = Svr2Filesystem::build(&geometry, 4096 * 1024 + 1).unwrap_err();
        assert!(matches!(err, BuildError::KernelTooLarge { blocks: 4097, budget: 4096 }));
    }
}
