use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Opts {
    /// Directory with the state database; in-memory if not set
    #[arg(long, env = "COMGOV_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Import a genesis file into an empty state
    Init {
        #[arg(long)]
        genesis: PathBuf,
    },
    /// Print the current state as a genesis file
    Export,
    /// Apply blocks from a file, printing their effects
    Replay {
        #[arg(long)]
        blocks: PathBuf,

        /// Import this genesis first
        #[arg(long)]
        genesis: Option<PathBuf>,
    },
}
