//! wzip - parallel run-length encoding compressor
//!
//! Encodes one or more files as a single stream of (count, byte) records on
//! stdout. Each file is split across a small pool of worker threads; run
//! boundaries cut by chunk or file edges are merged back afterwards.

use std::io::{self, IsTerminal, Write};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod compression;
mod error;
mod format;
mod reconcile;
mod rle;
mod scheduler;

use cli::{WzipArgs, USAGE};
use error::WzipResult;

#[cfg(unix)]
fn install_signal_handlers() {
    // SIGPIPE: exit quietly (e.g., piping to head)
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

fn init_tracing(args: &WzipArgs) {
    // stdout carries the record stream, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    install_signal_handlers();

    match run() {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("wzip: {}", e);
            process::exit(1);
        }
    }
}

fn run() -> WzipResult<i32> {
    let args = match WzipArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return Ok(code);
        }
    };

    if args.files.is_empty() {
        eprintln!("{}", USAGE);
        return Ok(1);
    }

    init_tracing(&args);

    // Refuse to write binary data to a terminal (unless -f)
    if !args.force && io::stdout().is_terminal() {
        eprintln!("wzip: compressed data not written to a terminal. Use -f to force.");
        return Ok(1);
    }

    let stdout = io::stdout();
    let (mut out, _stats) =
        compression::compress_files(&args.files, args.plan(), stdout.lock())?;
    out.flush()?;

    Ok(0)
}
