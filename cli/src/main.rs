//! `plexus-disk-img`: build the P20 tape and disk images from a kernel ELF.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use plexus_core::geometry::DEFAULT_SWAP_MB;
use plexus_core::image::DiskBuilder;
use plexus_core::object::ObjectImage;
use plexus_core::toolchain::SymbolResolver;

mod logger;
mod toolchain;

use toolchain::{Crosstool, DdCopy, NmResolver, DEFAULT_CROSS_PREFIX, DEFAULT_HOST_BIN};

#[derive(Parser, Debug)]
#[command(version, about = "Build Plexus P20 tape and disk images")]
struct Args {
    /// vmlinux ELF binary (in)
    #[arg(short = 'v', long, default_value = "output/images/vmlinux")]
    vmlinux: PathBuf,

    /// Root filesystem image (in), empty for none
    #[arg(short = 'r', long, default_value = "output/images/rootfs.ext4")]
    rootfs: OsString,

    /// ccal binary (in)
    #[arg(short = 'c', long)]
    ccal: Option<PathBuf>,

    /// Disk image filename (out)
    #[arg(short = 'd', long, default_value = "output/images/plexus.img")]
    disk: PathBuf,

    /// Tape image filename (out)
    #[arg(short = 't', long, default_value = "output/images/vmlinux.coff")]
    tape: PathBuf,

    /// Swap partition size in MiB
    #[arg(short = 's', long, default_value_t = DEFAULT_SWAP_MB)]
    swap: u32,

    /// Skip the disk image
    #[arg(long)]
    no_disk: bool,

    /// Skip the tape image
    #[arg(long)]
    no_tape: bool,

    /// Cross toolchain binary prefix
    #[arg(long, default_value = DEFAULT_CROSS_PREFIX)]
    cross_prefix: String,

    /// Fallback directory for the cross toolchain
    #[arg(long, default_value = DEFAULT_HOST_BIN)]
    host_bin: PathBuf,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// More logging, repeat for trace output
    #[arg(long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Validated outputs and inputs of one run
#[derive(Debug, PartialEq, Eq)]
struct BuildOptions {
    vmlinux: PathBuf,
    ccal: Option<PathBuf>,
    tape: Option<PathBuf>,
    /// Disk image and the rootfs it is built around
    disk: Option<(PathBuf, PathBuf)>,
    swap_mb: u32,
}

impl TryFrom<Args> for BuildOptions {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        let disk = if args.no_disk {
            None
        } else {
            if args.rootfs.is_empty() {
                bail!("--disk requires --rootfs");
            }
            Some((args.disk, PathBuf::from(args.rootfs)))
        };

        Ok(Self {
            vmlinux: args.vmlinux,
            ccal: args.ccal,
            tape: (!args.no_tape).then_some(args.tape),
            disk,
            swap_mb: args.swap,
        })
    }
}

fn build_object_image(tools: &Crosstool, vmlinux: &Path) -> Result<ObjectImage> {
    if !vmlinux.exists() {
        return Err(plexus_core::BuildError::MissingInput(vmlinux.to_path_buf()).into());
    }

    let symbols = NmResolver { tools }
        .resolve(vmlinux)
        .with_context(|| format!("reading symbols of {}", vmlinux.display()))?;
    let binary = tools
        .objcopy_binary(vmlinux)
        .with_context(|| format!("extracting binary from {}", vmlinux.display()))?;

    Ok(ObjectImage::package(&binary, &symbols)?)
}

fn run(options: BuildOptions, tools: &Crosstool) -> Result<()> {
    let object_image = build_object_image(tools, &options.vmlinux)?;

    if let Some(tape) = &options.tape {
        fs::write(tape, object_image.as_bytes())
            .with_context(|| format!("writing {}", tape.display()))?;
        println!("Created {}", tape.display());
    }

    if let Some((disk, rootfs)) = &options.disk {
        let ccal = options
            .ccal
            .as_deref()
            .map(|path| fs::read(path).with_context(|| format!("reading {}", path.display())))
            .transpose()?;

        let report = DiskBuilder::new(disk, rootfs, options.swap_mb)
            .build(&object_image, ccal.as_deref(), &mut DdCopy)
            .with_context(|| format!("building {}", disk.display()))?;
        info!("Disk GUID {} ({:?})", report.guids.disk, report.guid_source);
        println!("Created {}", disk.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(logger::level_for(args.quiet, args.verbose))?;

    info!(
        "Running {} {}",
        env!("CARGO_CRATE_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let tools = Crosstool::new(args.cross_prefix.clone(), args.host_bin.clone());
    let options = BuildOptions::try_from(args)?;
    run(options, &tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(argv: &[&str]) -> Result<BuildOptions> {
        let args = Args::try_parse_from(std::iter::once("plexus-disk-img").chain(argv.iter().copied()))?;
        BuildOptions::try_from(args)
    }

    #[test]
    fn test_defaults() {
        let opts = options(&[]).unwrap();
        assert_eq!(
            opts,
            BuildOptions {
                vmlinux: "output/images/vmlinux".into(),
                ccal: None,
                tape: Some("output/images/vmlinux.coff".into()),
                disk: Some((
                    "output/images/plexus.img".into(),
                    "output/images/rootfs.ext4".into()
                )),
                swap_mb: 4,
            }
        );
    }

    #[test]
    fn test_short_flags() {
        let opts = options(&["-v", "k.elf", "-c", "ccal.bin", "-s", "16", "-d", "out.img", "--no-tape"]).unwrap();
        assert_eq!(opts.vmlinux, PathBuf::from("k.elf"));
        assert_eq!(opts.ccal, Some(PathBuf::from("ccal.bin")));
        assert_eq!(opts.swap_mb, 16);
        assert_eq!(opts.tape, None);
        assert_eq!(opts.disk.unwrap().0, PathBuf::from("out.img"));
    }

    #[test]
    fn test_disk_requires_rootfs() {
        let err = options(&["-r", ""]).unwrap_err();
        assert_eq!(err.to_string(), "--disk requires --rootfs");

        let opts = options(&["-r", "", "--no-disk"]).unwrap();
        assert_eq!(opts.disk, None);
    }

    #[test]
    fn test_verbosity() {
        let args = Args::try_parse_from(["plexus-disk-img", "--verbose", "--verbose"]).unwrap();
        assert_eq!(args.verbose, 2);
        let args = Args::try_parse_from(["plexus-disk-img", "-q"]).unwrap();
        assert!(args.quiet);
    }
}
