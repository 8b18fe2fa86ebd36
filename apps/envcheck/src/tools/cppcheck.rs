//! Built-in `cppcheck` runner.
//!
//! Sources come from the effective filter; findings are read from stderr
//! using a delimited `--template` so file paths with colons survive.

use super::filter::match_src_files;
use super::{abort_child, read_lines, CheckRequest, DefectCollector, ToolOptions, ToolRun};
use crate::error::ToolError;
use crate::models::{Defect, Severity};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

pub const NAME: &str = "cppcheck";

const DELIM: &str = "<&ENVCHECK&>";
const SOURCE_EXTENSIONS: [&str; 6] = ["c", "cc", "cpp", "cxx", "c++", "ino"];

pub struct Cppcheck {
    include_dir: PathBuf,
}

impl Cppcheck {
    pub fn new(include_dir: PathBuf) -> Self {
        Cppcheck { include_dir }
    }

    fn template() -> String {
        ["{file}", "{line}", "{column}", "{severity}", "{id}", "{message}"].join(DELIM)
    }

    /// Full argument list (without the program name).
    pub fn build_args(&self, options: &ToolOptions, sources: &[PathBuf]) -> Vec<String> {
        let mut args = vec![format!("--template={}", Self::template())];
        let has_flag = |name: &str| options.flags.iter().any(|f| f.starts_with(name));
        if !has_flag("--enable") {
            args.push("--enable=all".into());
        }
        if !has_flag("--language") && sources.iter().any(|s| is_cpp_source(s)) {
            args.push("--language=c++".into());
        }
        args.push("--inline-suppr".into());
        args.push("--quiet".into());
        if self.include_dir.is_dir() {
            args.push("-I".into());
            args.push(self.include_dir.to_string_lossy().to_string());
        }
        args.extend(options.flags.iter().cloned());
        args.extend(sources.iter().map(|s| s.to_string_lossy().to_string()));
        args
    }

    /// Parse one templated stderr line; `None` for noise and informational output.
    pub fn parse_line(line: &str) -> Option<Defect> {
        let parts: Vec<&str> = line.trim_end().splitn(6, DELIM).collect();
        let [file, ln, col, sev, id, message] = parts.as_slice() else {
            return None;
        };
        let severity = map_severity(sev)?;
        Some(Defect {
            severity,
            category: sev.to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line: ln.parse().unwrap_or(0),
            column: col.parse().unwrap_or(0),
            id: id.to_string(),
            callstack: None,
            cwe: None,
        })
    }

    pub fn check(
        &self,
        request: &CheckRequest<'_>,
        on_defect: Option<&mut dyn FnMut(&Defect)>,
    ) -> Result<ToolRun, ToolError> {
        let options = request.options;
        let sources = match_src_files(request.project_dir, &options.filter, &SOURCE_EXTENSIONS);
        if sources.is_empty() {
            warn!(env = request.env, filter = ?options.filter, "no source files to check");
            return Ok(ToolRun {
                exit_code: 1,
                defects: Vec::new(),
            });
        }
        let args = self.build_args(options, &sources);
        info!(env = request.env, files = sources.len(), "running cppcheck");
        debug!(args = ?args, "cppcheck command line");

        let mut child = Command::new(NAME)
            .args(&args)
            .current_dir(request.project_dir)
            .stdout(if options.verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: request.tool.to_string(),
                program: NAME.to_string(),
                source,
            })?;

        let mut collector = DefectCollector::new(options, on_defect);
        if let Some(stderr) = child.stderr.take() {
            let read = read_lines(stderr, |line| match Self::parse_line(line) {
                Some(defect) => collector.push(defect),
                None if !line.trim().is_empty() => debug!(line = %line, "cppcheck output"),
                None => {}
            });
            if let Err(source) = read {
                return Err(abort_child(&mut child, request.tool, source));
            }
        }
        let status = child.wait().map_err(|source| ToolError::Output {
            tool: request.tool.to_string(),
            source,
        })?;
        let code = status.code().ok_or_else(|| ToolError::Terminated {
            tool: request.tool.to_string(),
        })?;
        Ok(collector.finish(code))
    }
}

/// Any source that is not plain C is checked as C++.
fn is_cpp_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| !e.eq_ignore_ascii_case("c"))
}

fn map_severity(label: &str) -> Option<Severity> {
    match label.trim() {
        "error" => Some(Severity::High),
        "warning" => Some(Severity::Medium),
        "style" | "performance" | "portability" => Some(Severity::Low),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(fields: [&str; 6]) -> String {
        fields.join(DELIM)
    }

    #[test]
    fn test_parse_line_maps_severities() {
        let d = Cppcheck::parse_line(&line([
            "C:/proj/src/main.c",
            "10",
            "5",
            "error",
            "nullPointer",
            "Null pointer dereference: p",
        ]))
        .unwrap();
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.file, "C:/proj/src/main.c");
        assert_eq!((d.line, d.column), (10, 5));
        assert_eq!(d.id, "nullPointer");
        assert_eq!(d.category, "error");

        let w = Cppcheck::parse_line(&line(["a.c", "1", "1", "warning", "x", "m"])).unwrap();
        assert_eq!(w.severity, Severity::Medium);
        let s = Cppcheck::parse_line(&line(["a.c", "1", "1", "style", "x", "m"])).unwrap();
        assert_eq!(s.severity, Severity::Low);
    }

    #[test]
    fn test_parse_line_skips_information_and_noise() {
        assert!(Cppcheck::parse_line(&line(["", "0", "0", "information", "missingInclude", "m"])).is_none());
        assert!(Cppcheck::parse_line("Checking src/main.c ...").is_none());
    }

    #[test]
    fn test_build_args_respects_flag_overrides() {
        let tool = Cppcheck::new(PathBuf::from("/nonexistent/include"));
        let opts = ToolOptions {
            flags: vec!["--enable=warning".into(), "--std=c++17".into()],
            ..ToolOptions::default()
        };
        let args = tool.build_args(&opts, &[PathBuf::from("src/main.cpp")]);
        assert!(args[0].starts_with("--template={file}"));
        assert!(!args.contains(&"--enable=all".to_string()));
        assert!(args.contains(&"--language=c++".to_string()));
        assert!(!args.contains(&"-I".to_string()));
        assert_eq!(args.last().unwrap(), "src/main.cpp");
        assert!(args.contains(&"--std=c++17".to_string()));
    }

    #[test]
    fn test_language_only_forced_for_cpp_sources() {
        let tool = Cppcheck::new(PathBuf::from("/nonexistent/include"));
        let opts = ToolOptions::default();
        let lang = "--language=c++".to_string();

        let c_only = tool.build_args(&opts, &[PathBuf::from("src/a.c"), PathBuf::from("lib/b.c")]);
        assert!(!c_only.contains(&lang));
        assert!(c_only.contains(&"--enable=all".to_string()));

        let mixed = tool.build_args(&opts, &[PathBuf::from("src/a.c"), PathBuf::from("src/main.ino")]);
        assert!(mixed.contains(&lang));

        let explicit = ToolOptions {
            flags: vec!["--language=c".into()],
            ..ToolOptions::default()
        };
        let args = tool.build_args(&explicit, &[PathBuf::from("src/main.cpp")]);
        assert!(!args.contains(&lang));
    }
}
