//! Per-component defect histogram for the human report.
//!
//! Each defect is counted at its parent directory. When that directory lies
//! inside the project root, the count is also rolled up into every ancestor
//! down to and including the root, so a directory row covers its whole
//! subtree. Relative defect paths are taken as relative to the root.

use crate::models::{RunResult, Severity};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Defect counts indexed by severity.
pub struct SeverityCounts([usize; 3]);

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        self.0[severity.index()] += 1;
    }

    pub fn get(&self, severity: Severity) -> usize {
        self.0[severity.index()]
    }

    pub fn sum(&self) -> usize {
        self.0.iter().sum()
    }
}

#[derive(Debug, Default)]
pub struct ComponentHistogram {
    components: BTreeMap<String, SeverityCounts>,
    total: SeverityCounts,
}

impl ComponentHistogram {
    /// Build the histogram from all non-skipped results.
    pub fn build(results: &[RunResult], project_dir: &Path) -> Self {
        let mut hist = ComponentHistogram::default();
        for result in results.iter().filter(|r| !r.is_skipped()) {
            for defect in &result.defects {
                hist.add(&defect.file, defect.severity, project_dir);
            }
        }
        hist
    }

    fn add(&mut self, file: &str, severity: Severity, root: &Path) {
        let component = immediate_component(&resolve(file, root));
        self.credit(&component, severity);
        self.total.add(severity);

        let mut cur = Path::new(&component);
        if root.as_os_str().is_empty() || !cur.starts_with(root) {
            return;
        }
        while cur != root {
            match cur.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    cur = parent;
                    self.credit(&parent.to_string_lossy(), severity);
                }
                _ => break,
            }
        }
    }

    fn credit(&mut self, component: &str, severity: Severity) {
        self.components
            .entry(component.to_string())
            .or_default()
            .add(severity);
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, component: &str) -> Option<&SeverityCounts> {
        self.components.get(component)
    }

    /// Components in lexicographic order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &SeverityCounts)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Each defect counted once, independent of roll-up rows.
    pub fn total(&self) -> &SeverityCounts {
        &self.total
    }
}

/// Relative defect paths are project-relative; anchor them at an absolute root.
fn resolve(file: &str, root: &Path) -> String {
    let path = Path::new(file);
    if root.is_absolute() && path.is_relative() {
        root.join(path).to_string_lossy().to_string()
    } else {
        file.to_string()
    }
}

/// Parent directory of `file`, or `file` itself when it has none.
fn immediate_component(file: &str) -> String {
    match Path::new(file).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().to_string(),
        _ => file.to_string(),
    }
}
