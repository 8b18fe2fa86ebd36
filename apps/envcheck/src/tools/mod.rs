//! Tool adapters: the seam between the run matrix and the analyzers.
//!
//! The orchestrator only sees the `ToolAdapter` trait. `ToolRegistry` is the
//! production adapter; it dispatches to the built-in `cppcheck` runner or to a
//! command declared under `[tool.<name>]`.

pub mod command;
pub mod cppcheck;
pub mod filter;

use crate::config::ProjectConfig;
use crate::error::ToolError;
use crate::models::{Defect, Severity};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::Child;
use tracing::debug;

/// Tool used by environments that do not declare `check_tool`.
pub const DEFAULT_TOOL: &str = "cppcheck";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Effective options for one (environment, tool) run.
pub struct ToolOptions {
    pub verbose: bool,
    pub silent: bool,
    /// `+<glob>` / `-<glob>` source selection tokens.
    pub filter: Vec<String>,
    /// Raw flags appended to the tool command line.
    pub flags: Vec<String>,
    /// Severities to report; empty means all.
    pub severity: Vec<Severity>,
}

impl ToolOptions {
    pub fn accepts(&self, severity: Severity) -> bool {
        self.severity.is_empty() || self.severity.contains(&severity)
    }
}

/// Everything an adapter needs to run one tool for one environment.
pub struct CheckRequest<'a> {
    pub tool: &'a str,
    pub project_dir: &'a Path,
    pub env: &'a str,
    pub options: &'a ToolOptions,
}

#[derive(Debug, Clone, Default)]
/// What a tool reported: its exit indicator and the defects that passed the
/// severity filter.
pub struct ToolRun {
    pub exit_code: i32,
    pub defects: Vec<Defect>,
}

/// Runs a single analyzer.
///
/// `on_defect`, when given, is called for every reported defect before
/// `check` returns. It must not influence the returned `ToolRun`.
pub trait ToolAdapter {
    fn check(
        &self,
        request: &CheckRequest<'_>,
        on_defect: Option<&mut dyn FnMut(&Defect)>,
    ) -> Result<ToolRun, ToolError>;
}

/// Applies the severity filter and forwards defects to the streaming
/// callback while collecting them.
pub(crate) struct DefectCollector<'a, 'cb> {
    options: &'a ToolOptions,
    on_defect: Option<&'cb mut dyn FnMut(&Defect)>,
    defects: Vec<Defect>,
}

impl<'a, 'cb> DefectCollector<'a, 'cb> {
    pub(crate) fn new(
        options: &'a ToolOptions,
        on_defect: Option<&'cb mut dyn FnMut(&Defect)>,
    ) -> Self {
        DefectCollector {
            options,
            on_defect,
            defects: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, defect: Defect) {
        if !self.options.accepts(defect.severity) {
            return;
        }
        if let Some(cb) = self.on_defect.as_deref_mut() {
            cb(&defect);
        }
        self.defects.push(defect);
    }

    pub(crate) fn finish(self, exit_code: i32) -> ToolRun {
        ToolRun {
            exit_code,
            defects: self.defects,
        }
    }
}

/// Feed each line of `reader` to `each`, decoding invalid UTF-8 lossily.
///
/// Only genuine read failures are returned as errors.
pub(crate) fn read_lines<R: Read>(reader: R, mut each: impl FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        each(line.trim_end_matches(['\n', '\r']));
    }
}

/// Reap a child whose output could not be read, then report the read error.
pub(crate) fn abort_child(child: &mut Child, tool: &str, source: io::Error) -> ToolError {
    if let Err(e) = child.kill() {
        debug!(tool, error = %e, "kill after read failure");
    }
    let _ = child.wait();
    ToolError::Output {
        tool: tool.to_string(),
        source,
    }
}

/// Production adapter backed by the project configuration.
pub struct ToolRegistry<'a> {
    config: &'a ProjectConfig,
}

impl<'a> ToolRegistry<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        ToolRegistry { config }
    }

    /// Whether `tool` can be dispatched.
    pub fn knows(&self, tool: &str) -> bool {
        self.config.tool.contains_key(tool) || tool == cppcheck::NAME
    }
}

impl ToolAdapter for ToolRegistry<'_> {
    fn check(
        &self,
        request: &CheckRequest<'_>,
        on_defect: Option<&mut dyn FnMut(&Defect)>,
    ) -> Result<ToolRun, ToolError> {
        if let Some(cfg) = self.config.tool.get(request.tool) {
            return command::CommandTool::new(request.tool, &cfg.command).check(request, on_defect);
        }
        if request.tool == cppcheck::NAME {
            let include_dir = request.project_dir.join(self.config.include_dir());
            return cppcheck::Cppcheck::new(include_dir).check(request, on_defect);
        }
        Err(ToolError::Unknown(request.tool.to_string()))
    }
}
