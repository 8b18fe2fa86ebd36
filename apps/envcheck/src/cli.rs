//! CLI argument parsing via `clap`.

use crate::models::Severity;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "envcheck",
    version,
    about = "Run static analyzers across project environments",
    long_about = "envcheck runs static-analysis tools for every environment declared in envcheck.toml, aggregates their defects, and fails when a run reports high-severity defects.\n\nConfiguration precedence: CLI > [env.<name>] section > defaults.",
    after_help = "Examples:\n  envcheck check\n  envcheck check -e uno -e esp32 --severity high\n  envcheck check --json-output > report.json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current envcheck version.")]
    Version,
    /// Run static analysis for the environment matrix
    #[command(
        about = "Run static analysis",
        long_about = "Run every configured tool for each active environment. Exits 1 when any run fails, 2 on configuration errors, 3 when a tool cannot be invoked.",
        after_help = "Examples:\n  envcheck check -e native --filter '+<src/>' --filter '-<src/vendor/>'\n  envcheck check --flags='--std=c++17' -v"
    )]
    Check {
        #[arg(short = 'e', long = "environment", help = "Only check this environment (repeatable)")]
        environment: Vec<String>,
        #[arg(short = 'd', long, help = "Project directory, or a file inside it (default: current dir)")]
        project_dir: Option<PathBuf>,
        #[arg(short = 'c', long, help = "Path to the project configuration file")]
        project_conf: Option<PathBuf>,
        #[arg(long, help = "Source filter tokens, e.g. '+<src/>' '-<src/vendor/>' (repeatable)")]
        filter: Vec<String>,
        #[arg(long, allow_hyphen_values = true, help = "Extra flags passed to the tool (repeatable)")]
        flags: Vec<String>,
        #[arg(long, value_enum, help = "Only report these severities (repeatable)")]
        severity: Vec<SeverityArg>,
        #[arg(short = 's', long, action = clap::ArgAction::SetTrue, help = "Only report high-severity defects; suppress progress and report tables")]
        silent: bool,
        #[arg(short = 'v', long, action = clap::ArgAction::SetTrue, help = "Print every defect of every run")]
        verbose: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Print results as a JSON document")]
        json_output: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Low,
    Medium,
    High,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_options() {
        let cli = Cli::try_parse_from([
            "envcheck",
            "check",
            "-e",
            "uno",
            "--environment",
            "esp32",
            "--severity",
            "high",
            "--severity",
            "medium",
            "--flags",
            "--std=c++17",
            "-s",
            "--json-output",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Check {
                environment,
                severity,
                flags,
                silent,
                verbose,
                json_output,
                project_dir,
                ..
            } => {
                assert_eq!(environment, vec!["uno", "esp32"]);
                let sev: Vec<Severity> = severity.into_iter().map(Severity::from).collect();
                assert_eq!(sev, vec![Severity::High, Severity::Medium]);
                assert_eq!(flags, vec!["--std=c++17"]);
                assert!(silent && json_output && !verbose);
                assert!(project_dir.is_none());
            }
            Commands::Version => panic!("expected check"),
        }
    }

    #[test]
    fn test_rejects_unknown_severity() {
        assert!(Cli::try_parse_from(["envcheck", "check", "--severity", "fatal"]).is_err());
    }
}
