//! External tools declared under `[tool.<name>]`.
//!
//! The command prints one JSON defect per stdout line; everything else on
//! stdout is ignored. Its exit code is the run's exit indicator.

use super::{abort_child, read_lines, CheckRequest, DefectCollector, ToolRun};
use crate::error::ToolError;
use crate::models::Defect;
use std::process::{Command, Stdio};
use tracing::{debug, info};

pub struct CommandTool<'a> {
    name: &'a str,
    command: &'a [String],
}

impl<'a> CommandTool<'a> {
    pub fn new(name: &'a str, command: &'a [String]) -> Self {
        CommandTool { name, command }
    }

    /// Parse a stdout line as a defect; `None` for anything that is not one.
    pub fn parse_line(line: &str) -> Option<Defect> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    pub fn check(
        &self,
        request: &CheckRequest<'_>,
        on_defect: Option<&mut dyn FnMut(&Defect)>,
    ) -> Result<ToolRun, ToolError> {
        let Some((program, base_args)) = self.command.split_first() else {
            return Err(ToolError::Unknown(self.name.to_string()));
        };
        let options = request.options;
        info!(env = request.env, tool = self.name, "running command tool");
        debug!(program = %program, args = ?base_args, flags = ?options.flags, "command line");

        let mut child = Command::new(program)
            .args(base_args)
            .args(&options.flags)
            .current_dir(request.project_dir)
            .env("ENVCHECK_ENV", request.env)
            .env("ENVCHECK_PROJECT_DIR", request.project_dir)
            .env("ENVCHECK_FILTER", options.filter.join(" "))
            .stdout(Stdio::piped())
            .stderr(if options.verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: self.name.to_string(),
                program: program.clone(),
                source,
            })?;

        let mut collector = DefectCollector::new(options, on_defect);
        if let Some(stdout) = child.stdout.take() {
            let read = read_lines(stdout, |line| match Self::parse_line(line) {
                Some(defect) => collector.push(defect),
                None => debug!(tool = self.name, line = %line, "ignoring non-defect output"),
            });
            if let Err(source) = read {
                return Err(abort_child(&mut child, self.name, source));
            }
        }
        let status = child.wait().map_err(|source| ToolError::Output {
            tool: self.name.to_string(),
            source,
        })?;
        let code = status.code().ok_or_else(|| ToolError::Terminated {
            tool: self.name.to_string(),
        })?;
        Ok(collector.finish(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::tools::ToolOptions;
    use std::path::Path;

    #[test]
    fn test_parse_line_accepts_json_defects_only() {
        let d = CommandTool::parse_line(
            r#"{"severity":"medium","file":"src/a.c","line":3,"message":"shadowed variable","id":"shadow"}"#,
        )
        .unwrap();
        assert_eq!(d.severity, Severity::Medium);
        assert_eq!(d.line, 3);
        assert_eq!(d.column, 0);
        assert!(CommandTool::parse_line("checking src/a.c").is_none());
        assert!(CommandTool::parse_line(r#"{"file":"a.c"}"#).is_none());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let command = vec!["envcheck-definitely-missing-binary".to_string()];
        let tool = CommandTool::new("ghost", &command);
        let opts = ToolOptions::default();
        let req = CheckRequest {
            tool: "ghost",
            project_dir: Path::new("."),
            env: "native",
            options: &opts,
        };
        assert!(matches!(tool.check(&req, None), Err(ToolError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_noise_is_ignored() {
        let script = concat!(
            r#"printf 'caf\351 noise\n'; "#,
            r#"echo '{"severity":"low","file":"src/a.c","message":"style"}'; "#,
            "exit 0"
        );
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let tool = CommandTool::new("sh-lint", &command);
        let opts = ToolOptions::default();
        let req = CheckRequest {
            tool: "sh-lint",
            project_dir: Path::new("."),
            env: "native",
            options: &opts,
        };
        let run = tool.check(&req, None).unwrap();
        assert_eq!((run.exit_code, run.defects.len()), (0, 1));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_command_and_collects_defects() {
        let script = concat!(
            r#"echo '{"severity":"low","file":"src/a.c","message":"style"}'; "#,
            r#"echo 'noise'; "#,
            r#"echo '{"severity":"high","file":"src/b.c","message":"overflow"}'; "#,
            r#"echo "{\"severity\":\"low\",\"file\":\"$ENVCHECK_ENV.c\",\"message\":\"env\"}"; "#,
            "exit 3"
        );
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let tool = CommandTool::new("sh-lint", &command);
        let opts = ToolOptions::default();
        let req = CheckRequest {
            tool: "sh-lint",
            project_dir: Path::new("."),
            env: "native",
            options: &opts,
        };
        let mut streamed = 0usize;
        let mut cb = |_: &Defect| streamed += 1;
        let run = tool.check(&req, Some(&mut cb)).unwrap();
        assert_eq!(run.exit_code, 3);
        assert_eq!(run.defects.len(), 3);
        assert_eq!(run.defects[2].file, "native.c");
        assert_eq!(streamed, 3);
    }
}
