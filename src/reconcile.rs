//! Stitching per-chunk encodings into one stream
//!
//! Chunk and file boundaries are arbitrary cut points, so the run touching a
//! boundary may be only part of a logical run. The reconciler keeps exactly
//! one pending run: the rightmost run seen so far, which may still grow.
//! Everything to its left is final.

use crate::rle::{ChunkResult, Run};

/// Output of reconciling one file's chunks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Finalized runs, in input order
    pub runs: Vec<Run>,
    /// Trailing run that the next file may continue
    pub carry: Option<Run>,
}

/// Reconcile one file's chunk results against the carry from the previous file
///
/// `results` must be in chunk order. Adjacent edge runs with the same byte
/// value are merged, including the incoming carry with the first chunk's
/// leading run. The trailing run is never emitted here; it is returned as the
/// new carry. With no results (an empty file) the carry passes through
/// untouched.
pub fn reconcile(results: Vec<ChunkResult>, carry: Option<Run>) -> Reconciled {
    let capacity = results.iter().map(ChunkResult::run_count).sum();
    let mut runs = Vec::with_capacity(capacity);
    let mut pending = carry;

    for ChunkResult {
        first,
        interior,
        last,
    } in results
    {
        pending = Some(match pending {
            Some(mut prev) if prev.continues_with(&first) => {
                prev.absorb(first);
                prev
            }
            Some(prev) => {
                runs.push(prev);
                first
            }
            None => first,
        });

        // A single-run chunk leaves the pending run open
        let Some(last) = last else {
            debug_assert!(interior.is_empty());
            continue;
        };

        runs.extend(pending.take());
        runs.extend(interior);
        pending = Some(last);
    }

    Reconciled {
        runs,
        carry: pending,
    }
}
