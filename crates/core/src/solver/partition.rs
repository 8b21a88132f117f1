//! Static partitioning of the (bin, direction) work space
//!
//! The flattened `bins * dirs` index space is split into contiguous,
//! near-equal blocks before any sweep starts. Workers never rebalance or
//! steal work; each owns its half-open slice for the whole run.

use crate::error::RadiationError;
use serde::{Deserialize, Serialize};

/// Order in which a worker walks its (bin, direction) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IterationOrder {
    /// Outer loop over bins, inner over directions. Lets whole-field
    /// opacity precomputation amortize one table pass across all
    /// directions of a bin.
    #[default]
    BinMajor,
    /// Outer loop over directions, inner over bins.
    DirMajor,
}

/// One worker's contiguous slice of the flattened (bin, direction) space.
#[derive(Debug, Clone, Copy)]
pub struct WorkPartition {
    n_bins: usize,
    n_dirs: usize,
    order: IterationOrder,
    start: usize,
    end: usize,
}

impl WorkPartition {
    /// Assign worker `worker_id` of `n_workers` its slice of the
    /// `n_bins * n_dirs` pair space. All workers except the last get
    /// `total / n_workers` pairs; the last absorbs the remainder.
    ///
    /// # Errors
    ///
    /// [`RadiationError::Config`] when the worker count is zero, exceeds
    /// the pair count (some workers would own nothing) or `worker_id` is
    /// out of range.
    pub fn new(
        n_bins: usize,
        n_dirs: usize,
        n_workers: usize,
        worker_id: usize,
        order: IterationOrder,
    ) -> Result<Self, RadiationError> {
        let total = n_bins * n_dirs;
        if n_workers == 0 {
            return Err(RadiationError::Config("worker count must be at least 1".to_string()));
        }
        if n_workers > total {
            return Err(RadiationError::Config(format!(
                "{n_workers} workers for {total} (bin, direction) pairs: some workers would idle"
            )));
        }
        if worker_id >= n_workers {
            return Err(RadiationError::Config(format!(
                "worker id {worker_id} out of range for {n_workers} workers"
            )));
        }

        let per_worker = total / n_workers;
        let start = worker_id * per_worker;
        let end = if worker_id == n_workers - 1 {
            total
        } else {
            start + per_worker
        };

        Ok(Self {
            n_bins,
            n_dirs,
            order,
            start,
            end,
        })
    }

    /// Half-open flat range owned by this worker
    #[must_use]
    pub fn flat_range(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Number of owned pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn order(&self) -> IterationOrder {
        self.order
    }

    /// (bin, direction) pair at flat index `idx` under the configured order
    #[must_use]
    fn decode(&self, idx: usize) -> (usize, usize) {
        match self.order {
            IterationOrder::BinMajor => (idx / self.n_dirs, idx % self.n_dirs),
            IterationOrder::DirMajor => (idx % self.n_bins, idx / self.n_bins),
        }
    }

    /// Owned (bin, direction) pairs in iteration order
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.start..self.end).map(|idx| self.decode(idx))
    }

    /// (start bin, start direction) of the first owned pair
    #[must_use]
    pub fn start_pair(&self) -> (usize, usize) {
        self.decode(self.start)
    }

    /// (end bin, end direction): the pair one past the last owned index
    #[must_use]
    pub fn end_pair(&self) -> (usize, usize) {
        self.decode(self.end.saturating_sub(1).max(self.start))
    }

    /// Distinct direction indices this worker touches, ascending. Sweep
    /// orders are only built for these.
    #[must_use]
    pub fn owned_dirs(&self) -> Vec<usize> {
        let mut dirs: Vec<usize> = self.pairs().map(|(_, dir)| dir).collect();
        dirs.sort_unstable();
        dirs.dedup();
        dirs
    }
}
