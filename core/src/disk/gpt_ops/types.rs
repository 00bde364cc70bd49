use uguid::{guid, Guid};

use super::guids::DiskGuids;
use crate::geometry::Geometry;

/// Partition type of the kernel partition (raw SVR2 object image area)
pub const PTG_KERNEL: Guid = guid!("dbb396ba-c12b-4d20-a92e-b7845152f1cb");
/// Linux swap
pub const PTG_SWAP: Guid = guid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f");
/// Linux filesystem data
pub const PTG_ROOTFS: Guid = guid!("0fc63daf-8483-4772-8e79-3d69d8477de4");

/// One populated partition table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub name: &'static str,
    pub type_guid: Guid,
    pub unique_guid: Guid,
    pub start_lba: u64,
    /// Inclusive
    pub end_lba: u64,
    pub flags: u64,
}

/// Kernel, swap and root partitions for `geometry`, in LBA order.
pub fn standard_partitions(geometry: &Geometry, guids: &DiskGuids) -> [PartitionSpec; 3] {
    [
        PartitionSpec {
            name: "kernel",
            type_guid: PTG_KERNEL,
            unique_guid: guids.kernel,
            start_lba: geometry.kernel_start_lba(),
            end_lba: geometry.kernel_end_lba(),
            flags: 0,
        },
        PartitionSpec {
            name: "swap",
            type_guid: PTG_SWAP,
            unique_guid: guids.swap,
            start_lba: geometry.swap_start_lba,
            end_lba: geometry.swap_end_lba(),
            flags: 0,
        },
        PartitionSpec {
            name: "root",
            type_guid: PTG_ROOTFS,
            unique_guid: guids.root,
            start_lba: geometry.rootfs_start_lba,
            end_lba: geometry.rootfs_last_lba(),
            flags: 0,
        },
    ]
}
