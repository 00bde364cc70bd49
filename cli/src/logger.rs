use std::io::Write;

use env_logger::{Builder, Target};
use log::{LevelFilter, SetLoggerError};

/// Install an env_logger writing `[LEVEL] target: message` lines to stderr.
///
/// `RUST_LOG` directives are applied on top of `level`.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    builder(level).try_init()
}

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .target(Target::Stderr)
        .filter_level(level)
        .format(|buf, record| {
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
        });
    if let Ok(directives) = std::env::var("RUST_LOG") {
        builder.parse_filters(&directives);
    }
    builder
}

/// Level for `-q` / repeated `--verbose`, starting from `Info`.
pub fn level_for(quiet: bool, verbose: u8) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
