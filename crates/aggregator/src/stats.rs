use serde::{Deserialize, Serialize};

/// Row counts reported by the record source once it is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    /// Rows handed to the worker pool
    pub rows_read: u64,

    /// Rows dropped for wrong arity or a row-level decode error
    pub rows_skipped: u64,

    /// Failed reads on the ledger handle, retried or not
    pub read_errors: u64,

    /// The stream ended on an I/O error instead of end-of-file
    pub read_failed: bool,
}

/// Statistics about one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Rows aggregated
    pub rows_read: u64,

    /// Malformed rows dropped (never itemised)
    pub rows_skipped: u64,

    /// I/O errors hit while reading the ledger
    pub read_errors: u64,

    /// Worker count the run actually used
    pub workers: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl RunStats {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn absorb_source(&mut self, counts: SourceCounts) {
        self.rows_read += counts.rows_read;
        self.rows_skipped += counts.rows_skipped;
        self.read_errors += counts.read_errors;
    }
}
