//! Run results: one record per scheduled (environment, tool) pair.

use super::{Defect, Severity};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Tri-state outcome of one (environment, tool) pair.
pub enum RunOutcome {
    /// The environment was not selected; the tool never ran.
    Skipped,
    Succeeded,
    Failed,
}

impl RunOutcome {
    /// Outcome of a completed run: failed when the tool's exit indicator is
    /// non-zero or any defect sits at the highest severity.
    pub fn from_run(exit_code: i32, defects: &[Defect]) -> RunOutcome {
        if exit_code != 0 || defects.iter().any(|d| d.severity == Severity::HIGHEST) {
            RunOutcome::Failed
        } else {
            RunOutcome::Succeeded
        }
    }

    /// Status label shown in the human report.
    pub fn label(self) -> &'static str {
        match self {
            RunOutcome::Skipped => "IGNORED",
            RunOutcome::Succeeded => "PASSED",
            RunOutcome::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub environment: String,
    pub tool: String,
    pub outcome: RunOutcome,
    /// Wall-clock time of the tool invocation; `None` when skipped.
    pub duration: Option<Duration>,
    pub defects: Vec<Defect>,
}

impl RunResult {
    pub fn skipped(environment: impl Into<String>, tool: impl Into<String>) -> Self {
        RunResult {
            environment: environment.into(),
            tool: tool.into(),
            outcome: RunOutcome::Skipped,
            duration: None,
            defects: Vec::new(),
        }
    }

    pub fn completed(
        environment: impl Into<String>,
        tool: impl Into<String>,
        exit_code: i32,
        duration: Duration,
        defects: Vec<Defect>,
    ) -> Self {
        RunResult {
            environment: environment.into(),
            tool: tool.into(),
            outcome: RunOutcome::from_run(exit_code, &defects),
            duration: Some(duration),
            defects,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == RunOutcome::Skipped
    }
}
