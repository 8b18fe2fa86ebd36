//! Error types for configuration loading and tool invocation.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for a run matrix with at least one failed run.
pub const EXIT_DEFECTS: i32 = 1;
/// Exit status for configuration problems.
pub const EXIT_CONFIG: i32 = 2;
/// Exit status when a tool could not be invoked.
pub const EXIT_TOOL: i32 = 3;
/// Exit status when the report could not be written.
pub const EXIT_REPORT: i32 = 4;

/// Problems found before any tool runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project config not found in {0} (expected envcheck.toml or envcheck.yaml)")]
    NotFound(PathBuf),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no environments declared in {0}")]
    NoEnvironments(PathBuf),

    #[error("unknown environment name(s): {}", .0.join(", "))]
    UnknownEnvironments(Vec<String>),

    #[error("unknown default environment name(s): {}", .0.join(", "))]
    UnknownDefaultEnvironments(Vec<String>),

    #[error("environment '{env}' uses unknown check tool '{tool}'")]
    UnknownTool { env: String, tool: String },

    #[error("tool '{0}' declares an empty command")]
    EmptyToolCommand(String),

    #[error("invalid severity '{value}' in environment '{env}'")]
    InvalidSeverity { env: String, value: String },
}

/// Failure to run a tool at all. A tool that ran and reported a non-zero
/// exit code is not an error; it becomes a failed run result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown check tool '{0}'")]
    Unknown(String),

    #[error("failed to start '{program}' for tool '{tool}': {source}")]
    Spawn {
        tool: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading output of tool '{tool}': {source}")]
    Output {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tool '{tool}' was terminated by a signal")]
    Terminated { tool: String },
}

/// Fatal errors that abort `envcheck check` without a report.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl CheckError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckError::Config(_) => EXIT_CONFIG,
            CheckError::Tool(_) => EXIT_TOOL,
        }
    }
}

/// Exit status for any error that aborts `check`. Anything other than a
/// `CheckError` happened while writing the report.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CheckError>()
        .map(CheckError::exit_code)
        .unwrap_or(EXIT_REPORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_from_defect_failure() {
        let cfg: CheckError = ConfigError::UnknownEnvironments(vec!["x".into()]).into();
        let tool: CheckError = ToolError::Unknown("lint".into()).into();
        assert_eq!(cfg.exit_code(), EXIT_CONFIG);
        assert_eq!(tool.exit_code(), EXIT_TOOL);
        assert_ne!(cfg.exit_code(), EXIT_DEFECTS);
        assert_ne!(tool.exit_code(), EXIT_DEFECTS);
    }

    #[test]
    fn test_report_write_failure_is_not_a_defect_exit() {
        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err = anyhow::Error::from(broken);
        assert_eq!(exit_code_for(&err), EXIT_REPORT);
        assert_ne!(exit_code_for(&err), EXIT_DEFECTS);

        let tool = anyhow::Error::from(CheckError::from(ToolError::Unknown("lint".into())));
        assert_eq!(exit_code_for(&tool), EXIT_TOOL);
    }

    #[test]
    fn test_unknown_env_message_lists_names() {
        let e = ConfigError::UnknownEnvironments(vec!["a".into(), "b".into()]);
        assert_eq!(e.to_string(), "unknown environment name(s): a, b");
    }
}
