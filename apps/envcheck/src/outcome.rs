//! Command outcome: the process fails iff any run failed.

use crate::error::EXIT_DEFECTS;
use crate::models::{RunOutcome, RunResult};
use std::time::Duration;

/// True when at least one run failed. Skipped runs never count.
pub fn command_failed(results: &[RunResult]) -> bool {
    results.iter().any(|r| r.outcome == RunOutcome::Failed)
}

/// Process exit status for a completed matrix.
pub fn exit_code(results: &[RunResult]) -> i32 {
    if command_failed(results) {
        EXIT_DEFECTS
    } else {
        0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Counts and cumulative duration used by the summary line.
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
    pub ignored: usize,
    /// Sum of per-run durations; skipped runs contribute nothing.
    pub duration: Duration,
}

impl Tally {
    pub fn from_results(results: &[RunResult]) -> Tally {
        let mut tally = Tally::default();
        for r in results {
            match r.outcome {
                RunOutcome::Succeeded => tally.succeeded += 1,
                RunOutcome::Failed => tally.failed += 1,
                RunOutcome::Skipped => tally.ignored += 1,
            }
            tally.duration += r.duration.unwrap_or_default();
        }
        tally
    }
}
