//! Aggregate statistics for one download run.

use std::path::PathBuf;
use std::time::Duration;

/// Counts and timing for a completed run.
///
/// Invariants: `failed == unavailable + errors`, and
/// `successful + skipped + failed == requested` (the number of ids actually
/// scheduled, itself bounded by the max-results cap and the match count).
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadStats {
    /// The query that was searched.
    pub query: String,

    /// Total matches reported by the search endpoint.
    pub total_found: u64,

    /// Ids actually scheduled for download.
    pub requested: usize,

    /// Artifacts newly written this run.
    pub successful: usize,

    /// Artifacts already on disk, not fetched again.
    pub skipped: usize,

    /// Records that reached no artifact.
    pub failed: usize,

    /// Of `failed`: records the repository reports as not retrievable.
    pub unavailable: usize,

    /// Of `failed`: transport or storage faults.
    pub errors: usize,

    /// Wall-clock time from the search call to the last finished item.
    pub duration: Duration,

    /// Namespace directory the artifacts were written under.
    pub output_dir: PathBuf,
}

/// Caller-facing outcome of a run, mapped to CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one record ended up available on disk (or nothing failed).
    Completed,
    /// The query matched nothing at all.
    NoResults,
    /// Every scheduled record failed.
    AllFailed,
}

impl DownloadStats {
    pub fn outcome(&self) -> RunOutcome {
        if self.total_found == 0 {
            RunOutcome::NoResults
        } else if self.successful + self.skipped == 0 && self.failed > 0 {
            RunOutcome::AllFailed
        } else {
            RunOutcome::Completed
        }
    }

    /// Share of requested records available on disk after the run, as a
    /// percentage. Skipped records count: they were downloaded earlier.
    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        (self.successful + self.skipped) as f64 / self.requested as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> DownloadStats {
        DownloadStats {
            query: "test".to_string(),
            total_found: 10,
            requested: 4,
            successful: 2,
            skipped: 1,
            failed: 1,
            unavailable: 1,
            errors: 0,
            duration: Duration::from_secs(3),
            output_dir: PathBuf::from("publications/test"),
        }
    }

    #[test]
    fn counts_balance() {
        let s = stats();
        assert_eq!(s.successful + s.skipped + s.failed, s.requested);
        assert_eq!(s.unavailable + s.errors, s.failed);
    }

    #[test]
    fn outcome_mapping() {
        assert_eq!(stats().outcome(), RunOutcome::Completed);

        let none = DownloadStats {
            total_found: 0,
            requested: 0,
            successful: 0,
            skipped: 0,
            failed: 0,
            unavailable: 0,
            errors: 0,
            ..stats()
        };
        assert_eq!(none.outcome(), RunOutcome::NoResults);

        let all_failed = DownloadStats {
            requested: 2,
            successful: 0,
            skipped: 0,
            failed: 2,
            unavailable: 1,
            errors: 1,
            ..stats()
        };
        assert_eq!(all_failed.outcome(), RunOutcome::AllFailed);
    }

    #[test]
    fn success_rate_counts_skips() {
        let s = stats();
        assert!((s.success_rate() - 75.0).abs() < f64::EPSILON);

        let empty = DownloadStats {
            requested: 0,
            successful: 0,
            skipped: 0,
            failed: 0,
            unavailable: 0,
            errors: 0,
            ..stats()
        };
        assert_eq!(empty.success_rate(), 0.0);
    }
}
