//! Shared data models: defects reported by tools and per-run results.

pub mod run;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use run::{RunOutcome, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Defect severity, ordered low to high.
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// All severities from lowest to highest.
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// The level that fails a run on its own.
    pub const HIGHEST: Severity = Severity::High;

    /// Lowercase label used in config files and JSON.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Parse a label case-insensitively.
    pub fn from_label(s: &str) -> Option<Severity> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.label().eq_ignore_ascii_case(s.trim()))
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single finding reported by a static-analysis tool.
///
/// Only `file` and `severity` drive aggregation and pass/fail; the remaining
/// fields pass through to reports untouched.
pub struct Defect {
    pub severity: Severity,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub message: String,
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub callstack: Option<Vec<String>>,
    #[serde(default)]
    pub cwe: Option<u32>,
}

impl Defect {
    pub fn new(severity: Severity, file: impl Into<String>, message: impl Into<String>) -> Self {
        Defect {
            severity,
            category: String::new(),
            message: message.into(),
            file: file.into(),
            line: 0,
            column: 0,
            id: String::new(),
            callstack: None,
            cwe: None,
        }
    }

    /// One-line echo form with the file shown relative to `base` when possible.
    pub fn display_relative(&self, base: &Path) -> String {
        let file = Path::new(&self.file);
        let shown = if file.is_absolute() {
            pathdiff::diff_paths(file, base)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| self.file.clone())
        } else {
            self.file.clone()
        };
        let mut out = format!("{}:{}: [{}", shown, self.line, self.severity.label().to_uppercase());
        if !self.category.is_empty() {
            out.push(':');
            out.push_str(&self.category);
        }
        out.push_str("] ");
        out.push_str(&self.message);
        if !self.id.is_empty() {
            out.push_str(&format!(" [{}]", self.id));
        }
        out
    }
}
