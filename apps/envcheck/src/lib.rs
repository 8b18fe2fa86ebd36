//! envcheck core library.
//!
//! Runs static-analysis tools across the environments declared in a project
//! configuration, aggregates the defects they report, and decides whether the
//! whole check passed.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Project file discovery, parsing, validation, option precedence.
//! - `orchestrator`: Environment × tool matrix, sequential execution.
//! - `tools`: `ToolAdapter` seam with the cppcheck and command adapters.
//! - `aggregate`: Per-component defect histogram with directory roll-up.
//! - `outcome`: Command pass/fail and summary tally.
//! - `output`: Human/JSON report and console progress.
//! - `models`: Defect and run result types.
//! - `error`: Typed errors and exit codes.
//! - `utils`: Supporting helpers.
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod outcome;
pub mod output;
pub mod tools;
pub mod utils;
