//! Disk and partition GUID continuity.
//!
//! Rebuilding the image must not change the GUIDs the OS uses to find its
//! partitions, so an existing image is read back before being overwritten.

use std::fs::File;
use std::io;
use std::path::Path;

use gpt_disk_io::BlockIo;
use gpt_disk_types::{GptHeaderSignature, Lba};
use uguid::Guid;

use super::entries::parse_partition_entry;
use super::header::parse_gpt_header;
use crate::disk::ImageBlockIo;
use crate::error::Result;
use crate::geometry::{GPT_LBA, SECTOR_SIZE};

/// The four GUIDs that identify a P20 disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGuids {
    pub disk: Guid,
    pub kernel: Guid,
    pub swap: Guid,
    pub root: Guid,
}

/// Where a build's GUIDs came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidSource {
    /// Read back from the image being replaced
    Preserved,
    /// No usable image; freshly generated
    Generated,
}

impl DiskGuids {
    /// Fresh random (version 4) GUIDs.
    pub fn generate() -> Self {
        Self {
            disk: Guid::from_random_bytes(rand::random()),
            kernel: Guid::from_random_bytes(rand::random()),
            swap: Guid::from_random_bytes(rand::random()),
            root: Guid::from_random_bytes(rand::random()),
        }
    }

    /// Reuse the GUIDs of the image at `path` if it holds a primary GPT,
    /// otherwise generate new ones.
    ///
    /// A missing file, a file too short to hold the GPT or a header without
    /// the `EFI PART` signature fall back to generation. Any other I/O error
    /// aborts the build.
    pub fn preserve_or_generate(path: &Path) -> Result<(Self, GuidSource)> {
        let existing = match File::open(path) {
            Ok(file) => read_existing_guids(&mut ImageBlockIo::new(file))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        match existing {
            Some(guids) => {
                log::info!("Preserving disk GUID {} from {}", guids.disk, path.display());
                Ok((guids, GuidSource::Preserved))
            }
            None => {
                let guids = Self::generate();
                log::info!("Generated new disk GUID {}", guids.disk);
                Ok((guids, GuidSource::Generated))
            }
        }
    }
}

/// Read the disk GUID from the primary header and the unique GUIDs of the
/// first three partition slots.
///
/// Returns `Ok(None)` when the image does not contain a primary GPT.
pub fn read_existing_guids<B>(block_io: &mut B) -> Result<Option<DiskGuids>>
where
    B: BlockIo<Error = io::Error>,
{
    // Header at LBA 1 and the first four entries at GPT_LBA
    if block_io.num_blocks()? <= GPT_LBA {
        log::debug!("existing image too short for a GPT");
        return Ok(None);
    }

    let mut header_buf = [0u8; SECTOR_SIZE];
    block_io.read_blocks(Lba(1), &mut header_buf)?;

    let header = match parse_gpt_header(&header_buf) {
        Some(header) => header,
        None => return Ok(None),
    };
    if header.signature != GptHeaderSignature::EFI_COMPATIBLE_PARTITION_TABLE_HEADER {
        log::debug!("existing image has no GPT signature");
        return Ok(None);
    }

    let mut entry_buf = [0u8; SECTOR_SIZE];
    block_io.read_blocks(Lba(GPT_LBA), &mut entry_buf)?;

    let unique = |index| parse_partition_entry(&entry_buf, index).map(|e| e.unique_partition_guid);
    match (unique(0), unique(1), unique(2)) {
        (Some(kernel), Some(swap), Some(root)) => Ok(Some(DiskGuids {
            disk: header.disk_guid,
            kernel,
            swap,
            root,
        })),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_generate_distinct() {
        let a = DiskGuids::generate();
        let b = DiskGuids::generate();

        assert_ne!(a, b);
        assert_ne!(a.disk, a.kernel);
        assert_ne!(a.disk, Guid::ZERO);
    }

    #[test]
    fn test_empty_image_has_no_guids() {
        let mut io = ImageBlockIo::new(Cursor::new(Vec::new()));
        assert_eq!(read_existing_guids(&mut io).unwrap(), None);
    }

    #[test]
    fn test_image_without_signature_has_no_guids() {
        let mut io = ImageBlockIo::new(Cursor::new(vec![0xffu8; 64 * SECTOR_SIZE]));
        assert_eq!(read_existing_guids(&mut io).unwrap(), None);
    }

    #[test]
    fn test_missing_file_generates() {
        let path = std::env::temp_dir().join(format!(
            "plexus-guids-missing-{}.img",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let (_, source) = DiskGuids::preserve_or_generate(&path).unwrap();
        assert_eq!(source, GuidSource::Generated);
    }
}
