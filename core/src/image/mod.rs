//! Bootable disk image output.

mod builder;
mod writer;

pub use builder::{DiskBuilder, DiskReport};
pub use writer::{
    build_boot_sector, write_disk_image, BOOT_DESCRIPTOR_OFFSET, BOOT_PATH, BOOT_PATH_OFFSET,
    DISK_TYPE, DISK_TYPE_OFFSET,
};
