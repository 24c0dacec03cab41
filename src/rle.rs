//! Run-length encoding of a single chunk
//!
//! A chunk is encoded independently of its neighbors. The run touching the
//! chunk's start and the run touching its end are reported separately from
//! the interior runs, because either may continue into the adjacent chunk
//! (or the adjacent file) and has to be merged by the reconciler.

/// A maximal repetition of one byte value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    /// Number of repetitions, always >= 1
    pub count: u64,
    pub value: u8,
}

impl Run {
    #[inline]
    pub fn new(count: u64, value: u8) -> Self {
        debug_assert!(count > 0, "run count must be positive");
        Self { count, value }
    }

    /// Whether `other` continues this run (same byte value)
    #[inline]
    pub fn continues_with(&self, other: &Run) -> bool {
        self.value == other.value
    }

    /// Merge a continuation into this run
    #[inline]
    pub fn absorb(&mut self, other: Run) {
        debug_assert!(self.continues_with(&other));
        self.count += other.count;
    }
}

/// Encoding of one chunk with its edge runs held apart
///
/// `interior` never touches either edge of the chunk. When the whole chunk is
/// a single run, `last` is `None` and `first` is both the leading and the
/// trailing run, so it can only be emitted once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkResult {
    pub first: Run,
    pub interior: Vec<Run>,
    pub last: Option<Run>,
}

impl ChunkResult {
    /// Number of input bytes this chunk covers
    pub fn byte_len(&self) -> u64 {
        self.first.count
            + self.interior.iter().map(|r| r.count).sum::<u64>()
            + self.last.map_or(0, |r| r.count)
    }

    /// Number of runs, counting a single-run chunk once
    pub fn run_count(&self) -> usize {
        1 + self.interior.len() + usize::from(self.last.is_some())
    }
}

/// Encode a chunk, returning `None` for an empty slice
///
/// Scans left to right. Every completed run goes to `first` if it started at
/// offset 0, otherwise to `interior`. The run still open at the end of the
/// scan is the trailing run.
pub fn encode_chunk(chunk: &[u8]) -> Option<ChunkResult> {
    let (&head, rest) = chunk.split_first()?;

    let mut first: Option<Run> = None;
    let mut interior = Vec::new();
    let mut current = head;
    let mut count: u64 = 1;

    for &byte in rest {
        if byte == current {
            count += 1;
            continue;
        }

        let done = Run::new(count, current);
        if first.is_none() {
            first = Some(done);
        } else {
            interior.push(done);
        }
        current = byte;
        count = 1;
    }

    let open = Run::new(count, current);
    Some(match first {
        // Whole chunk is one run
        None => ChunkResult {
            first: open,
            interior,
            last: None,
        },
        Some(first) => ChunkResult {
            first,
            interior,
            last: Some(open),
        },
    })
}
