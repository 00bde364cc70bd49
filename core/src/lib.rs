//! Boot disk assembly for the Plexus P20.
//!
//! Produces a GPT-partitioned image that also carries just enough of an SVR2
//! filesystem for the board's boot ROM to load `/linux`, plus the SVR2
//! object image the kernel is wrapped in.
//!
//! ```text
//! kernel ELF ──nm/objcopy──▶ object::ObjectImage ─┐
//!                                                 ├─▶ image::write_disk_image
//! rootfs size, swap, ccal ──▶ geometry::Geometry ─┘        │
//!                                  │                        ├─ disk::gpt_ops
//!                                  │                        └─ fs::svr2_ops
//!                                  └──────▶ toolchain::BulkCopy (rootfs)
//! ```

pub mod disk;
pub mod error;
pub mod fs;
pub mod geometry;
pub mod image;
pub mod object;
pub mod toolchain;

pub use error::{BuildError, Result};
