use bytemuck::Zeroable;
use gpt_disk_types::{Chs, MasterBootRecord, MbrPartitionRecord, U32Le};

use crate::geometry::{REPORTED_DISK_SECTORS, SECTOR_SIZE};

/// Offset of the first MBR partition record in sector 0
pub const MBR_PARTITION_OFFSET: usize = 0x1be;
/// Partition records plus boot signature
pub const MBR_TAIL_LEN: usize = SECTOR_SIZE - MBR_PARTITION_OFFSET;

/// Protective MBR tail (four partition records + `55 AA`) for sector 0.
///
/// Only the tail is produced: the start of sector 0 belongs to the boot ROM's
/// disk header (disk type, kernel path, boot device descriptor).
pub fn build_protective_mbr() -> [u8; MBR_TAIL_LEN] {
    let mut mbr = MasterBootRecord::zeroed();

    mbr.partitions[0] = MbrPartitionRecord {
        boot_indicator: 0,
        start_chs: Chs([0x00, 0x02, 0x00]),
        os_indicator: 0xee,
        end_chs: Chs([0xff, 0xff, 0xff]),
        starting_lba: U32Le::from_u32(1),
        size_in_lba: U32Le::from_u32((REPORTED_DISK_SECTORS - 1) as u32),
    };
    mbr.signature = [0x55, 0xaa];

    let mut tail = [0u8; MBR_TAIL_LEN];
    tail.copy_from_slice(&bytemuck::bytes_of(&mbr)[MBR_PARTITION_OFFSET..]);
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64 bytes the boot ROM expects starting at 0x1c0
    const EXPECTED_FROM_1C0: [u8; 64] = [
        0x02, 0x00, 0xee, 0xff, 0xff, 0xff, 0x01, 0x00, 0x00, 0x00, 0xff, 0x9f, 0x00, 0x00, 0x00,
        0x00, //
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x55, 0xaa,
    ];

    #[test]
    fn test_matches_boot_rom_blob() {
        let tail = build_protective_mbr();
        assert_eq!(tail.len(), 66);
        assert_eq!(&tail[..2], &[0, 0]);
        assert_eq!(&tail[2..], &EXPECTED_FROM_1C0[..]);
    }

    #[test]
    fn test_partition_record_fields() {
        let tail = build_protective_mbr();
        assert_eq!(tail[4], 0xee);
        assert_eq!(u32::from_le_bytes(tail[8..12].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(tail[12..16].try_into().unwrap()), 0x9fff);
    }
}
