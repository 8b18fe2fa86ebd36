//! Run matrix: every declared environment × its tools, in declaration order.
//!
//! Inactive environments still produce one skipped result per tool so the
//! report can show them as ignored. Active pairs run one at a time; each run
//! is timed on its own.

use crate::config::{resolve_tool_options, EnvConfig, Overrides, ProjectConfig};
use crate::error::{CheckError, ConfigError};
use crate::models::{Defect, RunResult};
use crate::tools::{CheckRequest, ToolAdapter};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Whether `env` runs in this invocation.
///
/// An explicit selection wins; otherwise `default_envs` applies when present,
/// and every environment is active when neither is given.
pub fn is_env_active(env: &str, requested: &[String], default_envs: &[String]) -> bool {
    if !requested.is_empty() {
        return requested.iter().any(|r| r == env);
    }
    default_envs.is_empty() || default_envs.iter().any(|d| d == env)
}

#[derive(Debug, Clone)]
/// One scheduled (environment, tool) pair.
pub struct PlannedRun<'c> {
    pub env: &'c str,
    pub config: &'c EnvConfig,
    pub tool: String,
    pub active: bool,
}

/// Expand the matrix without running anything.
pub fn plan<'c>(config: &'c ProjectConfig, requested: &[String]) -> Vec<PlannedRun<'c>> {
    let default_envs = config.default_envs();
    config
        .environments()
        .flat_map(|(name, env)| {
            let active = is_env_active(name, requested, &default_envs);
            env.tools().into_iter().map(move |tool| PlannedRun {
                env: name,
                config: env,
                tool,
                active,
            })
        })
        .collect()
}

/// Unknown tools referenced by active runs are a configuration error.
pub fn validate_tools(
    planned: &[PlannedRun<'_>],
    knows: impl Fn(&str) -> bool,
) -> Result<(), ConfigError> {
    match planned.iter().find(|p| p.active && !knows(&p.tool)) {
        Some(p) => Err(ConfigError::UnknownTool {
            env: p.env.to_string(),
            tool: p.tool.clone(),
        }),
        None => Ok(()),
    }
}

/// Observer for progress output while the matrix runs.
pub trait RunListener {
    /// Called before an active run; `env_dump` holds `key: value` pairs.
    fn run_started(&mut self, _env: &str, _tool: &str, _env_dump: &[String]) {}

    /// Whether `defect_found` should receive streamed defects.
    fn wants_defects(&self) -> bool {
        false
    }

    fn defect_found(&mut self, _defect: &Defect) {}

    /// Called after each result (skipped or not) is appended.
    fn run_finished(&mut self, _result: &RunResult) {}
}

pub struct Orchestrator<'a> {
    config: &'a ProjectConfig,
    adapter: &'a dyn ToolAdapter,
    project_dir: &'a Path,
    overrides: &'a Overrides,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        adapter: &'a dyn ToolAdapter,
        project_dir: &'a Path,
        overrides: &'a Overrides,
    ) -> Self {
        Orchestrator {
            config,
            adapter,
            project_dir,
            overrides,
        }
    }

    /// Run the full matrix and return one result per planned pair.
    ///
    /// A tool that cannot be invoked aborts the whole run; no result is
    /// recorded for it.
    pub fn run(
        &self,
        requested: &[String],
        listener: &mut dyn RunListener,
    ) -> Result<Vec<RunResult>, CheckError> {
        let mut results = Vec::new();
        for planned in plan(self.config, requested) {
            let result = if planned.active {
                self.run_one(planned.env, planned.config, &planned.tool, listener)?
            } else {
                debug!(env = planned.env, tool = %planned.tool, "environment not selected");
                RunResult::skipped(planned.env, planned.tool)
            };
            listener.run_finished(&result);
            results.push(result);
        }
        Ok(results)
    }

    fn run_one(
        &self,
        env_name: &str,
        env: &EnvConfig,
        tool: &str,
        listener: &mut dyn RunListener,
    ) -> Result<RunResult, CheckError> {
        let options = resolve_tool_options(self.config, env_name, env, self.overrides)?;
        debug!(env = env_name, tool, options = ?options, "resolved tool options");
        listener.run_started(env_name, tool, &env.dump());

        let request = CheckRequest {
            tool,
            project_dir: self.project_dir,
            env: env_name,
            options: &options,
        };
        let stream = listener.wants_defects();
        let start = Instant::now();
        let run = {
            let mut echo = |d: &Defect| listener.defect_found(d);
            let on_defect: Option<&mut dyn FnMut(&Defect)> =
                if stream { Some(&mut echo) } else { None };
            self.adapter.check(&request, on_defect)?
        };
        let duration = start.elapsed();

        let result = RunResult::completed(env_name, tool, run.exit_code, duration, run.defects);
        info!(
            env = env_name,
            tool,
            outcome = result.outcome.label(),
            defects = result.defects.len(),
            seconds = duration.as_secs_f64(),
            "check finished"
        );
        Ok(result)
    }
}
