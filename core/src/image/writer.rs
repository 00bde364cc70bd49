//! Disk image assembly over `BlockIo`.
//!
//! Layout of a finished image (LBA = 512 bytes, block = 1 KiB = 2 LBAs):
//!
//! ```text
//! LBA 0        boot ROM fields + protective MBR
//! LBA 1        primary GPT header
//! LBA 4..6     block 2: SVR2 inode table
//! LBA 8..40    GPT partition entry array
//! LBA 0x42     block 0x21: root directory
//! LBA 0x44..   block 0x22..: kernel index chain, ccal index + data
//! LBA 0x800..  block 0x400..: kernel object image  (kernel partition)
//! swap_start   swap partition
//! rootfs_start rootfs partition (copied in afterwards)
//! rootfs_end   40 sectors reserved for the secondary GPT
//! ```

use std::io;

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use zerocopy::big_endian::{U16, U32};
use zerocopy::{FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::disk::gpt_ops::{
    build_gpt_header, build_partition_array, build_protective_mbr, standard_partitions, DiskGuids,
    MBR_PARTITION_OFFSET,
};
use crate::error::{BuildError, Result};
use crate::fs::svr2_ops::Svr2Filesystem;
use crate::geometry::{block_pos, Geometry, GPT_LBA, SECONDARY_GPT_SECTORS, SECTOR_SIZE};
use crate::object::ObjectImage;

/// Disk type tag the ROM checks in sector 0
pub const DISK_TYPE_OFFSET: usize = 0x1a;
pub const DISK_TYPE: [u8; 2] = [0x70, 0x64];

/// NUL-terminated path of the file the ROM boots
pub const BOOT_PATH_OFFSET: usize = 0x20;
pub const BOOT_PATH: &[u8] = b"/linux\0";

pub const BOOT_DESCRIPTOR_OFFSET: usize = 0x190;

/// Legacy boot descriptor in sector 0, all zero on P20 disks
#[repr(C)]
#[derive(Debug, Clone, Copy, FromZeros, IntoBytes, Immutable, KnownLayout)]
struct BootDescriptor {
    kind: U16,
    spec: U16,
    initlen: U32,
    cdb: [u8; 6],
    _pad: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<BootDescriptor>() == 16);
const _: () = assert!(BOOT_DESCRIPTOR_OFFSET + 16 <= MBR_PARTITION_OFFSET);

/// Sector 0: ROM boot fields and the protective MBR.
pub fn build_boot_sector() -> [u8; SECTOR_SIZE] {
    let mut sector = [0u8; SECTOR_SIZE];

    sector[DISK_TYPE_OFFSET..DISK_TYPE_OFFSET + DISK_TYPE.len()].copy_from_slice(&DISK_TYPE);
    sector[BOOT_PATH_OFFSET..BOOT_PATH_OFFSET + BOOT_PATH.len()].copy_from_slice(BOOT_PATH);

    let descriptor = BootDescriptor::new_zeroed();
    sector[BOOT_DESCRIPTOR_OFFSET..BOOT_DESCRIPTOR_OFFSET + 16].copy_from_slice(descriptor.as_bytes());

    sector[MBR_PARTITION_OFFSET..].copy_from_slice(&build_protective_mbr());
    sector
}

/// Write everything except the rootfs contents.
///
/// The device must accept writes up to `geometry.image_len()`; a stream
/// backed device grows as needed.
pub fn write_disk_image<B>(
    block_io: &mut B,
    geometry: &Geometry,
    guids: &DiskGuids,
    object_image: &ObjectImage,
    aux: Option<&[u8]>,
) -> Result<()>
where
    B: BlockIo<Error = io::Error>,
{
    match (&geometry.aux, aux) {
        (Some(region), Some(data)) if region.len == data.len() as u64 => {}
        (None, None) => {}
        _ => return Err(BuildError::InvalidLayout("ccal payload does not match the geometry")),
    }

    let fs = Svr2Filesystem::build(geometry, object_image.len() as u64)?;

    block_io.write_blocks(Lba(0), &build_boot_sector())?;

    let partitions = standard_partitions(geometry, guids);
    let array = build_partition_array(&partitions)?;
    let header = build_gpt_header(&array, guids.disk, geometry);
    block_io.write_blocks(Lba(1), &header)?;
    block_io.write_blocks(Lba(GPT_LBA), &array)?;

    for (block, bytes) in fs.placements(geometry) {
        write_at_block(block_io, block, bytes)?;
    }

    if let (Some(region), Some(data)) = (&geometry.aux, aux) {
        log::debug!(
            "ccal: {} bytes at block {:#x}, index at {:#x}",
            data.len(),
            region.start_block,
            region.index_block
        );
        write_at_block(block_io, region.start_block, data)?;
    }

    log::debug!(
        "kernel: {} bytes at block {:#x}",
        object_image.len(),
        geometry.data_start_block
    );
    write_at_block(block_io, geometry.data_start_block, object_image.as_bytes())?;

    let reservation = vec![0u8; SECONDARY_GPT_SECTORS as usize * SECTOR_SIZE];
    block_io.write_blocks(Lba(geometry.secondary_gpt_lba()), &reservation)?;

    block_io.flush()?;
    Ok(())
}

/// Write `bytes` at 1 KiB block `block`, zero-extending the tail to a whole sector.
fn write_at_block<B>(block_io: &mut B, block: u32, bytes: &[u8]) -> Result<()>
where
    B: BlockIo<Error = io::Error>,
{
    let lba = Lba(block_pos(block) / SECTOR_SIZE as u64);
    if bytes.len() % SECTOR_SIZE == 0 {
        block_io.write_blocks(lba, bytes)?;
    } else {
        let mut padded = bytes.to_vec();
        padded.resize(bytes.len().next_multiple_of(SECTOR_SIZE), 0);
        block_io.write_blocks(lba, &padded)?;
    }
    Ok(())
}
