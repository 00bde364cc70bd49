//! GPT structures for the P20 disk: protective MBR, primary header and the
//! partition entry array, plus GUID continuity across rebuilds.

mod crc;
mod entries;
mod guids;
mod header;
mod mbr;
mod types;

pub use crc::crc32;
pub use entries::{build_partition_array, parse_partition_entry};
pub use guids::{read_existing_guids, DiskGuids, GuidSource};
pub use header::{build_gpt_header, parse_gpt_header, GPT_HEADER_SIZE};
pub use mbr::{build_protective_mbr, MBR_PARTITION_OFFSET, MBR_TAIL_LEN};
pub use types::{standard_partitions, PartitionSpec, PTG_KERNEL, PTG_ROOTFS, PTG_SWAP};
