use std::io;

use comgov_util_error::WhateverResult;
use snafu::whatever;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Log to stderr, keeping stdout for command output
///
/// `RUST_LOG` takes precedence over the level picked by `verbose`.
pub fn init_logging(verbose: bool) -> WhateverResult<()> {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        whatever!("Logging already initialized");
    }

    Ok(())
}
