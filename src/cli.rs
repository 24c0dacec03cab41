//! Command-line arguments
//!
//! The positional file list is the whole required surface; every option has
//! a default and the tuning knobs can also come from the environment.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::scheduler::{ChunkPlan, DEFAULT_THRESHOLD};

/// Usage line printed when no input files are given
pub const USAGE: &str = "wzip: file1 [file2 ...]";

/// Run-length encode files into one binary stream on stdout
#[derive(Parser, Debug)]
#[command(name = "wzip", version, about, long_about = None)]
#[command(override_usage = "wzip [OPTIONS] file1 [file2 ...]")]
#[command(
    after_help = "Output is refused (exit status 1) when stdout is a terminal, unless --force is given."
)]
pub struct WzipArgs {
    /// Input files, encoded as if concatenated
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Number of chunk workers per file
    #[arg(
        short = 'p',
        long,
        value_name = "N",
        env = "WZIP_PROCESSES",
        default_value_t = ChunkPlan::default().workers
    )]
    pub processes: NonZeroUsize,

    /// Files of at most this many bytes are encoded by one worker
    #[arg(
        long,
        value_name = "BYTES",
        env = "WZIP_THRESHOLD",
        default_value_t = DEFAULT_THRESHOLD
    )]
    pub threshold: usize,

    /// Write binary output even when stdout is a terminal (refused otherwise)
    #[arg(short, long)]
    pub force: bool,

    /// Log per-file progress to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl WzipArgs {
    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan::new(self.processes, self.threshold)
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
