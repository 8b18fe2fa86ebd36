//! envcheck CLI binary entry point.
//! Loads the project config, runs the environment matrix, and prints results.

use clap::Parser;
use envcheck::cli::{Cli, Commands};
use envcheck::config::{self, Overrides};
use envcheck::error::{exit_code_for, CheckError, ConfigError};
use envcheck::models::Severity;
use envcheck::orchestrator::{plan, validate_tools, Orchestrator};
use envcheck::output::{self, ConsoleListener, ConsoleMode};
use envcheck::tools::ToolRegistry;
use envcheck::{outcome, utils};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

struct CheckArgs {
    environment: Vec<String>,
    project_dir: Option<PathBuf>,
    project_conf: Option<PathBuf>,
    overrides: Overrides,
    json_output: bool,
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Check {
            environment,
            project_dir,
            project_conf,
            filter,
            flags,
            severity,
            silent,
            verbose,
            json_output,
        } => {
            init_logging(verbose);
            let args = CheckArgs {
                environment,
                project_dir,
                project_conf,
                overrides: Overrides {
                    filter,
                    flags,
                    severity: severity.into_iter().map(Severity::from).collect(),
                    silent,
                    verbose,
                },
                json_output,
            };
            let code = match run_check(&args) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    exit_code_for(&e)
                }
            };
            std::process::exit(code);
        }
    }
}

/// Initialize tracing; logs always go to stderr.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

fn resolve_project_dir(arg: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let start = arg.unwrap_or_else(|| Path::new("."));
    let abs = start.canonicalize().map_err(|source| ConfigError::Read {
        path: start.to_path_buf(),
        source,
    })?;
    Ok(config::detect_project_dir(&abs))
}

fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let project_dir = resolve_project_dir(args.project_dir.as_deref()).map_err(CheckError::from)?;
    let conf_path = config::find_config_file(&project_dir, args.project_conf.as_deref())
        .map_err(CheckError::from)?;
    let cfg = config::load_config(&conf_path).map_err(CheckError::from)?;
    cfg.validate(&args.environment, &conf_path)
        .map_err(CheckError::from)?;

    let registry = ToolRegistry::new(&cfg);
    validate_tools(&plan(&cfg, &args.environment), |t| registry.knows(t))
        .map_err(CheckError::from)?;
    debug!(project_dir = %project_dir.display(), config = %conf_path.display(), "configuration loaded");

    let mode = ConsoleMode {
        silent: args.overrides.silent,
        verbose: args.overrides.verbose,
        json: args.json_output,
    };
    let mut listener = ConsoleListener::stdio(&project_dir, mode);
    let results = Orchestrator::new(&cfg, &registry, &project_dir, &args.overrides)
        .run(&args.environment, &mut listener)?;

    if args.json_output {
        output::write_json(&results, &mut io::stdout().lock())?;
    } else if !args.overrides.silent {
        if results.iter().all(|r| r.is_skipped()) {
            eprintln!("{} no environment was selected to run", utils::note_prefix());
        }
        output::print_human(&results, &project_dir)?;
    }
    Ok(outcome::exit_code(&results))
}
