//! Output record format
//!
//! The stream is a bare sequence of 5-byte records: a `u32` count in native
//! byte order followed by the byte value. No header, no trailer, no file
//! boundary markers.

use std::io::{self, BufWriter, Write};

use crate::rle::Run;

/// Size of one serialized record
pub const RECORD_SIZE: usize = 5;

/// Largest count a single record can hold
pub const MAX_RECORD_COUNT: u64 = u32::MAX as u64;

/// Append the records for `run` to `out`
///
/// A run longer than `MAX_RECORD_COUNT` is written as several records with
/// the same value.
pub fn encode_run(out: &mut Vec<u8>, run: Run) {
    let mut remaining = run.count;
    while remaining > 0 {
        let count = remaining.min(MAX_RECORD_COUNT);
        out.extend_from_slice(&(count as u32).to_ne_bytes());
        out.push(run.value);
        remaining -= count;
    }
}

/// Buffered record sink that counts what it writes
pub struct RecordWriter<W: Write> {
    inner: BufWriter<W>,
    scratch: Vec<u8>,
    records: u64,
    bytes: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(64 * 1024, writer),
            scratch: Vec::with_capacity(RECORD_SIZE),
            records: 0,
            bytes: 0,
        }
    }

    pub fn write_run(&mut self, run: Run) -> io::Result<()> {
        self.scratch.clear();
        encode_run(&mut self.scratch, run);
        self.inner.write_all(&self.scratch)?;
        self.records += (self.scratch.len() / RECORD_SIZE) as u64;
        self.bytes += self.scratch.len() as u64;
        Ok(())
    }

    pub fn write_runs<I: IntoIterator<Item = Run>>(&mut self, runs: I) -> io::Result<()> {
        for run in runs {
            self.write_run(run)?;
        }
        Ok(())
    }

    /// Records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Bytes written so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Flush buffered records and hand back the destination
    pub fn finish(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}
