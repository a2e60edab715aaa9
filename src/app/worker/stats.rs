//! Per-worker counters and their aggregation
//!
//! Each worker owns a private [`WorkerStats`] for its lifetime and publishes
//! it exactly once at exit. After all workers have joined, the coordinator
//! folds the published counters into one [`AggregateResult`]; the fold is a
//! plain sum, so it is commutative and associative and any fold order yields
//! the same result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Counters owned exclusively by one worker while it runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Requests dequeued by this worker
    pub total_seen: u64,
    /// Requests that were actually fetched (not skipped)
    pub attempted: u64,
    /// Attempts that fetched and wrote successfully
    pub succeeded: u64,
}

impl WorkerStats {
    pub fn record_seen(&mut self) {
        self.total_seen += 1;
    }

    pub fn record_attempt(&mut self) {
        self.attempted += 1;
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }
}

/// Final pipeline outcome, derived from all workers' counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// All requests seen by any worker
    pub total: u64,
    /// Fetched and written successfully
    pub succeeded: u64,
    /// Attempted but not succeeded
    pub failed: u64,
    /// Seen but skipped because the output file already existed
    pub skipped: u64,
}

impl AggregateResult {
    /// Fold an unordered collection of per-worker counters.
    ///
    /// Tolerates an empty collection (all zeros) and workers that saw
    /// nothing (their contribution is a no-op).
    pub fn from_worker_stats<'a, I>(stats: I) -> Self
    where
        I: IntoIterator<Item = &'a WorkerStats>,
    {
        let (mut total, mut attempted, mut succeeded) = (0u64, 0u64, 0u64);
        for s in stats {
            total += s.total_seen;
            attempted += s.attempted;
            succeeded += s.succeeded;
        }
        Self {
            total,
            succeeded,
            failed: attempted - succeeded,
            skipped: total - attempted,
        }
    }

    /// Fold from the keyed result collection published at worker exit
    pub fn from_worker_map(stats: &HashMap<usize, WorkerStats>) -> Self {
        Self::from_worker_stats(stats.values())
    }
}

impl std::fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total: {}, Ok: {}, Failed: {}, Skipped: {}",
            self.total, self.succeeded, self.failed, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total_seen: u64, attempted: u64, succeeded: u64) -> WorkerStats {
        WorkerStats {
            total_seen,
            attempted,
            succeeded,
        }
    }

    #[test]
    fn test_aggregate_identities() {
        let result = AggregateResult::from_worker_stats([
            &stats(10, 8, 6),
            &stats(5, 5, 5),
            &stats(3, 1, 0),
        ]);

        assert_eq!(result.total, 18);
        assert_eq!(result.succeeded, 11);
        assert_eq!(result.failed, 3);
        assert_eq!(result.skipped, 4);
        assert_eq!(
            result.total,
            result.succeeded + result.failed + result.skipped
        );
    }

    #[test]
    fn test_fold_is_order_independent() {
        let workers = vec![stats(7, 4, 2), stats(0, 0, 0), stats(12, 12, 9), stats(1, 1, 1)];

        let forward = AggregateResult::from_worker_stats(workers.iter());
        let reverse = AggregateResult::from_worker_stats(workers.iter().rev());

        // Any permutation must agree; forward vs reverse covers the
        // commutativity requirement for a sum
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_empty_fold_is_all_zero() {
        let result = AggregateResult::from_worker_stats(std::iter::empty());
        assert_eq!(result, AggregateResult::default());
    }

    #[test]
    fn test_zero_item_worker_is_a_noop() {
        let with = AggregateResult::from_worker_stats([&stats(4, 3, 3), &stats(0, 0, 0)]);
        let without = AggregateResult::from_worker_stats([&stats(4, 3, 3)]);
        assert_eq!(with, without);
    }

    #[test]
    fn test_summary_line_format() {
        let result = AggregateResult {
            total: 3,
            succeeded: 2,
            failed: 1,
            skipped: 0,
        };
        assert_eq!(result.to_string(), "Total: 3, Ok: 2, Failed: 1, Skipped: 0");
    }
}
