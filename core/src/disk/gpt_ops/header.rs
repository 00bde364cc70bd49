use gpt_disk_types::{
    Crc32, GptHeader, GptHeaderRevision, GptHeaderSignature, LbaLe, U32Le,
};
use uguid::Guid;

use super::crc::crc32;
use crate::geometry::{
    Geometry, GPT_ENTRY_COUNT, GPT_ENTRY_SIZE, GPT_LBA, REPORTED_DISK_SECTORS, SECTOR_SIZE,
};

/// Declared size of the GPT header, the range covered by its CRC
pub const GPT_HEADER_SIZE: u32 = 0x5c;

const _: () = assert!(core::mem::size_of::<GptHeader>() == GPT_HEADER_SIZE as usize);

/// Build the primary GPT header sector for `partition_array`.
///
/// The array CRC is taken over the full serialized array; the header CRC is
/// computed over the first `header_size` bytes with its own field zeroed and
/// then written back in.
pub fn build_gpt_header(
    partition_array: &[u8],
    disk_guid: Guid,
    geometry: &Geometry,
) -> [u8; SECTOR_SIZE] {
    let mut header = GptHeader {
        signature: GptHeaderSignature::EFI_COMPATIBLE_PARTITION_TABLE_HEADER,
        revision: GptHeaderRevision::VERSION_1_0,
        header_size: U32Le::from_u32(GPT_HEADER_SIZE),
        header_crc32: Crc32(U32Le::from_u32(0)),
        reserved: U32Le::from_u32(0),
        my_lba: LbaLe::from_u64(1),
        alternate_lba: LbaLe::from_u64(REPORTED_DISK_SECTORS - 1),
        first_usable_lba: LbaLe::from_u64(geometry.first_usable_lba()),
        last_usable_lba: LbaLe::from_u64(geometry.last_usable_lba()),
        disk_guid,
        // Pushed back from LBA 2 to leave room for the SVR2 inode table
        partition_entry_lba: LbaLe::from_u64(GPT_LBA),
        number_of_partition_entries: U32Le::from_u32(GPT_ENTRY_COUNT),
        size_of_partition_entry: U32Le::from_u32(GPT_ENTRY_SIZE as u32),
        partition_entry_array_crc32: Crc32(U32Le::from_u32(crc32(partition_array))),
    };

    let declared = header.header_size.to_u32() as usize;
    let header_crc = crc32(&bytemuck::bytes_of(&header)[..declared]);
    header.header_crc32 = Crc32(U32Le::from_u32(header_crc));

    log::debug!(
        "GPT header: usable LBAs {:#x}..={:#x}, header crc {:#010x}",
        geometry.first_usable_lba(),
        geometry.last_usable_lba(),
        header_crc
    );

    let mut sector = [0u8; SECTOR_SIZE];
    sector[..declared].copy_from_slice(&bytemuck::bytes_of(&header)[..declared]);
    sector
}

/// Decode the header fields of a GPT header sector.
pub fn parse_gpt_header(sector: &[u8]) -> Option<GptHeader> {
    let bytes = sector.get(..GPT_HEADER_SIZE as usize)?;
    Some(bytemuck::pod_read_unaligned(bytes))
}
