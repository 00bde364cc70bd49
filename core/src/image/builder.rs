// File-level disk build: geometry, GUID continuity, write, rootfs copy

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use crate::disk::gpt_ops::{DiskGuids, GuidSource};
use crate::disk::ImageBlockIo;
use crate::error::{BuildError, Result};
use crate::geometry::Geometry;
use crate::object::ObjectImage;
use crate::toolchain::BulkCopy;

use super::writer::write_disk_image;

/// Inputs of one disk image build.
#[derive(Debug, Clone, Copy)]
pub struct DiskBuilder<'a> {
    pub disk: &'a Path,
    pub rootfs: &'a Path,
    pub swap_mb: u32,
}

/// What a successful build produced
#[derive(Debug, Clone)]
pub struct DiskReport {
    pub geometry: Geometry,
    pub guids: DiskGuids,
    pub guid_source: GuidSource,
}

impl<'a> DiskBuilder<'a> {
    pub fn new(disk: &'a Path, rootfs: &'a Path, swap_mb: u32) -> Self {
        Self {
            disk,
            rootfs,
            swap_mb,
        }
    }

    /// Build the disk image file.
    ///
    /// GUIDs of an image already at `disk` are carried over. The file is
    /// truncated and rewritten, then `copier` places the rootfs at the start
    /// of the rootfs partition. A failure part way leaves whatever was
    /// written so far.
    pub fn build(
        &self,
        object_image: &ObjectImage,
        aux: Option<&[u8]>,
        copier: &mut dyn BulkCopy,
    ) -> Result<DiskReport> {
        let rootfs_len = match fs::metadata(self.rootfs) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BuildError::MissingInput(self.rootfs.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let geometry = Geometry::new(self.swap_mb, rootfs_len, aux.map(|a| a.len() as u64))?;
        log::info!(
            "Layout: kernel LBA {:#x}..={:#x}, swap {:#x}..={:#x}, root {:#x}..={:#x}",
            geometry.kernel_start_lba(),
            geometry.kernel_end_lba(),
            geometry.swap_start_lba,
            geometry.swap_end_lba(),
            geometry.rootfs_start_lba,
            geometry.rootfs_last_lba()
        );

        let (guids, guid_source) = DiskGuids::preserve_or_generate(self.disk)?;

        {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(self.disk)?;
            let mut block_io = ImageBlockIo::new(file);
            write_disk_image(&mut block_io, &geometry, &guids, object_image, aux)?;
            block_io.get_ref().sync_all()?;
        }

        log::info!(
            "Copying {} ({} bytes) to LBA {:#x}",
            self.rootfs.display(),
            rootfs_len,
            geometry.rootfs_start_lba
        );
        copier.copy_sparse(self.rootfs, self.disk, geometry.rootfs_start_lba, rootfs_len)?;

        Ok(DiskReport {
            geometry,
            guids,
            guid_source,
        })
    }
}
