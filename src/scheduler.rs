//! Chunked parallel encoding of one input buffer
//!
//! The buffer is split into at most K contiguous chunks and each chunk is
//! encoded on its own scoped worker thread:
//!
//! 1. Workers borrow a disjoint, read-only slice of the buffer
//! 2. Each worker returns an owned `ChunkResult` through its join handle
//! 3. Every worker is joined before any result is handed back
//!
//! Results come back in chunk order, never completion order, which is what
//! the reconciler relies on to stitch run boundaries.

use std::num::NonZeroUsize;
use std::thread;

use tracing::trace;

use crate::error::{WzipError, WzipResult};
use crate::rle::{encode_chunk, ChunkResult};

/// Default number of chunk workers per file
pub const DEFAULT_WORKERS: usize = 3;

/// Inputs of at most this many bytes are encoded by a single worker
pub const DEFAULT_THRESHOLD: usize = 4096;

/// How a buffer is divided among workers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    pub workers: NonZeroUsize,
    pub threshold: usize,
}

impl Default for ChunkPlan {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ChunkPlan {
    pub fn new(workers: NonZeroUsize, threshold: usize) -> Self {
        Self { workers, threshold }
    }

    /// Number of chunks used for a buffer of `len` bytes
    ///
    /// Never more than `len`, so no chunk is empty.
    #[inline]
    pub fn effective_workers(&self, len: usize) -> usize {
        if len <= self.threshold {
            1
        } else {
            self.workers.get().min(len)
        }
    }
}

/// Split `buffer` into `n` contiguous slices covering it exactly once
///
/// The first `n - 1` slices are `len / n` bytes; the last absorbs the
/// remainder. `n` is clamped to `1..=len` (an empty buffer yields one empty
/// slice).
pub fn split_chunks(buffer: &[u8], n: usize) -> Vec<&[u8]> {
    let n = n.clamp(1, buffer.len().max(1));
    let chunk_size = buffer.len() / n;

    let mut chunks = Vec::with_capacity(n);
    for i in 0..n - 1 {
        chunks.push(&buffer[i * chunk_size..(i + 1) * chunk_size]);
    }
    chunks.push(&buffer[(n - 1) * chunk_size..]);
    chunks
}

/// Encode `buffer` in parallel according to `plan`
///
/// Returns one `ChunkResult` per chunk in chunk order. An empty buffer yields
/// no results. Failure to start a worker, or a worker panicking, is fatal for
/// the whole buffer and no partial results are returned.
pub fn schedule(buffer: &[u8], plan: &ChunkPlan) -> WzipResult<Vec<ChunkResult>> {
    if buffer.is_empty() {
        return Ok(Vec::new());
    }

    let workers = plan.effective_workers(buffer.len());
    if workers == 1 {
        // Not worth a thread
        return Ok(encode_chunk(buffer).into_iter().collect());
    }

    let chunks = split_chunks(buffer, workers);
    trace!(
        workers,
        chunk_size = chunks[0].len(),
        "dispatching chunk workers"
    );

    thread::scope(|scope| -> WzipResult<Vec<ChunkResult>> {
        let mut handles = Vec::with_capacity(chunks.len());
        for (idx, &chunk) in chunks.iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("wzip-chunk-{idx}"))
                .spawn_scoped(scope, move || encode_chunk(chunk))
                .map_err(|e| {
                    WzipError::thread(format!("unable to start worker {idx}: {e}"))
                })?;
            handles.push(handle);
        }

        // Join every worker before looking at any result
        let mut results = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(result) => results.extend(result),
                Err(_) => {
                    failure.get_or_insert_with(|| {
                        WzipError::thread(format!("worker {idx} panicked"))
                    });
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => {
                debug_assert_eq!(
                    results.iter().map(ChunkResult::byte_len).sum::<u64>(),
                    buffer.len() as u64
                );
                Ok(results)
            }
        }
    })
}
