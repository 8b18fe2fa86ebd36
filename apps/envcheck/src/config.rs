//! Project configuration discovery, loading, and option resolution.
//!
//! envcheck reads `envcheck.toml|yaml|yml` from the project directory (or the
//! closest ancestor when the given path is a file). Environments keep their
//! declaration order because run results are reported in that order.
//!
//! Defaults:
//! - `project.src_dir`: `src`
//! - `project.include_dir`: `include`
//! - `env.*.check_tool`: `["cppcheck"]`
//! - `env.*.check_filter`: `+<src/>`, `+<include/>` (base names of the dirs)
//!
//! Overrides precedence: CLI > environment section > defaults.

use crate::error::ConfigError;
use crate::models::Severity;
use crate::tools::{ToolOptions, DEFAULT_TOOL};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file names probed in order.
pub const CONFIG_FILES: [&str; 3] = ["envcheck.toml", "envcheck.yaml", "envcheck.yml"];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
/// A value that may be written as a single string or a list of strings.
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }

    fn joined(&self) -> String {
        self.to_vec().join(", ")
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Project-wide settings under `[project]`.
pub struct ProjectSection {
    #[serde(default)]
    pub default_envs: Option<OneOrMany>,
    pub src_dir: Option<String>,
    pub include_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Options declared for one environment under `[env.<name>]`.
pub struct EnvConfig {
    pub platform: Option<OneOrMany>,
    pub framework: Option<OneOrMany>,
    pub board: Option<OneOrMany>,
    pub check_tool: Option<OneOrMany>,
    pub check_filter: Option<OneOrMany>,
    pub check_flags: Option<OneOrMany>,
    pub check_severity: Option<OneOrMany>,
}

impl EnvConfig {
    /// Tools declared for the environment, or the built-in default.
    pub fn tools(&self) -> Vec<String> {
        match &self.check_tool {
            Some(t) => t.to_vec(),
            None => vec![DEFAULT_TOOL.to_string()],
        }
    }

    /// Parsed `check_severity`, if declared.
    pub fn severities(&self, env: &str) -> Result<Option<Vec<Severity>>, ConfigError> {
        let Some(raw) = &self.check_severity else {
            return Ok(None);
        };
        raw.to_vec()
            .iter()
            .map(|s| {
                Severity::from_label(s).ok_or_else(|| ConfigError::InvalidSeverity {
                    env: env.to_string(),
                    value: s.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// `key: value` pairs shown in the per-run header.
    pub fn dump(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (key, val) in [
            ("platform", &self.platform),
            ("framework", &self.framework),
            ("board", &self.board),
        ] {
            if let Some(v) = val {
                out.push(format!("{}: {}", key, v.joined()));
            }
        }
        out
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// External command declared under `[tool.<name>]`.
pub struct CommandToolCfg {
    pub command: Vec<String>,
}

#[derive(Debug, Default, Clone)]
/// Environments in declaration order.
pub struct Environments(pub Vec<(String, EnvConfig)>);

impl<'de> Deserialize<'de> for Environments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvVisitor;

        impl<'de> Visitor<'de> for EnvVisitor {
            type Value = Environments;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of environments")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Environments, A::Error> {
                let mut envs = Vec::new();
                while let Some((name, cfg)) = map.next_entry::<String, EnvConfig>()? {
                    envs.push((name, cfg));
                }
                Ok(Environments(envs))
            }
        }

        deserializer.deserialize_map(EnvVisitor)
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `envcheck.toml|yaml`.
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub env: Environments,
    #[serde(default)]
    pub tool: HashMap<String, CommandToolCfg>,
}

impl ProjectConfig {
    /// Environment names in declaration order.
    pub fn env_names(&self) -> Vec<&str> {
        self.env.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn environments(&self) -> impl Iterator<Item = (&str, &EnvConfig)> {
        self.env.0.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn get_env(&self, name: &str) -> Option<&EnvConfig> {
        self.env.0.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn default_envs(&self) -> Vec<String> {
        self.project
            .default_envs
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_default()
    }

    pub fn src_dir(&self) -> &str {
        self.project.src_dir.as_deref().unwrap_or("src")
    }

    pub fn include_dir(&self) -> &str {
        self.project.include_dir.as_deref().unwrap_or("include")
    }

    /// Filter used when neither the CLI nor the environment declares one.
    pub fn default_filter(&self) -> Vec<String> {
        [self.src_dir(), self.include_dir()]
            .iter()
            .map(|d| format!("+<{}/>", base_name(d)))
            .collect()
    }

    /// Check names and values that must hold before any tool runs.
    ///
    /// `requested` is the explicit `--environment` selection (may be empty).
    pub fn validate(&self, requested: &[String], source: &Path) -> Result<(), ConfigError> {
        if self.env.0.is_empty() {
            return Err(ConfigError::NoEnvironments(source.to_path_buf()));
        }
        let names = self.env_names();
        let unknown: Vec<String> = requested
            .iter()
            .filter(|r| !names.contains(&r.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownEnvironments(unknown));
        }
        let unknown_defaults: Vec<String> = self
            .default_envs()
            .into_iter()
            .filter(|d| !names.contains(&d.as_str()))
            .collect();
        if !unknown_defaults.is_empty() {
            return Err(ConfigError::UnknownDefaultEnvironments(unknown_defaults));
        }
        for (name, env) in self.environments() {
            env.severities(name)?;
        }
        if let Some((name, _)) = self.tool.iter().find(|(_, t)| t.command.is_empty()) {
            return Err(ConfigError::EmptyToolCommand(name.clone()));
        }
        Ok(())
    }
}

/// Invocation-level overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub filter: Vec<String>,
    pub flags: Vec<String>,
    pub severity: Vec<Severity>,
    pub silent: bool,
    pub verbose: bool,
}

/// Resolve the options handed to a tool for one environment.
///
/// Each list takes the first non-empty source of: CLI override, environment
/// option, built-in default. Silent mode pins severity to the highest level.
pub fn resolve_tool_options(
    config: &ProjectConfig,
    env_name: &str,
    env: &EnvConfig,
    overrides: &Overrides,
) -> Result<ToolOptions, ConfigError> {
    let filter = if !overrides.filter.is_empty() {
        overrides.filter.clone()
    } else {
        env.check_filter
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_else(|| config.default_filter())
    };
    let flags = if !overrides.flags.is_empty() {
        overrides.flags.clone()
    } else {
        env.check_flags.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    };
    let severity = if overrides.silent {
        vec![Severity::HIGHEST]
    } else if !overrides.severity.is_empty() {
        overrides.severity.clone()
    } else {
        env.severities(env_name)?.unwrap_or_default()
    };
    Ok(ToolOptions {
        verbose: overrides.verbose,
        silent: overrides.silent,
        filter,
        flags,
        severity,
    })
}

fn base_name(dir: &str) -> String {
    let trimmed = dir.trim_end_matches(['/', '\\']);
    Path::new(trimmed)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn has_config(dir: &Path) -> bool {
    CONFIG_FILES.iter().any(|f| dir.join(f).is_file())
}

/// Resolve the project directory from `--project-dir`.
///
/// A directory is used as-is. For a file, walk upward to the nearest
/// ancestor holding a config file; fall back to the file's parent.
pub fn detect_project_dir(start: &Path) -> PathBuf {
    if !start.is_file() {
        return start.to_path_buf();
    }
    let parent = start.parent().unwrap_or_else(|| Path::new("."));
    let mut cur = parent;
    loop {
        if has_config(cur) {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return parent.to_path_buf(),
        }
    }
}

/// Locate the config file: explicit `--project-conf`, else the first of
/// `CONFIG_FILES` present in `project_dir`.
pub fn find_config_file(project_dir: &Path, conf: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(c) = conf {
        return Ok(c.to_path_buf());
    }
    CONFIG_FILES
        .iter()
        .map(|f| project_dir.join(f))
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::NotFound(project_dir.to_path_buf()))
}

/// Load `ProjectConfig` from a TOML or YAML file (chosen by extension).
pub fn load_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let cfg: ProjectConfig = if is_yaml {
        serde_yaml::from_str(&s).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::from_str(&s).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?
    };
    debug!(
        path = %path.display(),
        envs = ?cfg.env_names(),
        "loaded project config"
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[project]
default_envs = ["uno"]

[env.uno]
platform = "atmelavr"
board = "uno"
framework = "arduino"
check_tool = ["cppcheck", "clang-tidy"]
check_severity = ["medium", "high"]

[env.native]
platform = "native"
check_filter = "+<lib/>"
check_flags = ["--std=c++17"]

[env.esp32]
check_tool = "pvs-studio"

[tool.clang-tidy]
command = ["tidy-wrapper", "--jsonl"]
"#;

    fn write_sample(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_load_toml_preserves_env_order() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path(), "envcheck.toml", SAMPLE);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.env_names(), vec!["uno", "native", "esp32"]);
        assert_eq!(cfg.default_envs(), vec!["uno".to_string()]);
        assert_eq!(
            cfg.get_env("uno").unwrap().tools(),
            vec!["cppcheck".to_string(), "clang-tidy".to_string()]
        );
        assert_eq!(cfg.get_env("esp32").unwrap().tools(), vec!["pvs-studio".to_string()]);
        assert_eq!(cfg.get_env("native").unwrap().tools(), vec!["cppcheck".to_string()]);
        assert_eq!(cfg.tool["clang-tidy"].command[0], "tidy-wrapper");
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let path = write_sample(
            dir.path(),
            "envcheck.yaml",
            r#"
env:
  zeta:
    platform: native
  alpha:
    check_tool: cppcheck
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.env_names(), vec!["zeta", "alpha"]);
        assert_eq!(cfg.src_dir(), "src");
        assert_eq!(cfg.default_filter(), vec!["+<src/>", "+<include/>"]);
        assert!(cfg.default_envs().is_empty());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path(), "envcheck.toml", "[env.a\nplatform=");
        assert!(matches!(load_config(&path), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn test_validate_rejects_unknown_names() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path(), "envcheck.toml", SAMPLE);
        let cfg = load_config(&path).unwrap();
        assert!(cfg.validate(&["uno".into()], &path).is_ok());
        let err = cfg.validate(&["nope".into()], &path).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironments(ref v) if v == &["nope".to_string()]));

        let bad = write_sample(
            dir.path(),
            "bad.toml",
            "[project]\ndefault_envs = \"ghost\"\n[env.a]\n",
        );
        let cfg = load_config(&bad).unwrap();
        assert!(matches!(
            cfg.validate(&[], &bad),
            Err(ConfigError::UnknownDefaultEnvironments(_))
        ));
    }

    #[test]
    fn test_validate_requires_environments_and_valid_severity() {
        let dir = tempdir().unwrap();
        let empty = write_sample(dir.path(), "empty.toml", "[project]\nsrc_dir = \"src\"\n");
        let cfg = load_config(&empty).unwrap();
        assert!(matches!(cfg.validate(&[], &empty), Err(ConfigError::NoEnvironments(_))));

        let sev = write_sample(dir.path(), "sev.toml", "[env.a]\ncheck_severity = \"fatal\"\n");
        let cfg = load_config(&sev).unwrap();
        assert!(matches!(cfg.validate(&[], &sev), Err(ConfigError::InvalidSeverity { .. })));
    }

    #[test]
    fn test_option_precedence_cli_then_env_then_default() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path(), "envcheck.toml", SAMPLE);
        let cfg = load_config(&path).unwrap();
        let native = cfg.get_env("native").unwrap();
        let esp32 = cfg.get_env("esp32").unwrap();

        // Environment-declared values win over defaults
        let opts = resolve_tool_options(&cfg, "native", native, &Overrides::default()).unwrap();
        assert_eq!(opts.filter, vec!["+<lib/>"]);
        assert_eq!(opts.flags, vec!["--std=c++17"]);
        assert!(opts.severity.is_empty());

        // Built-in defaults when nothing is declared
        let opts = resolve_tool_options(&cfg, "esp32", esp32, &Overrides::default()).unwrap();
        assert_eq!(opts.filter, vec!["+<src/>", "+<include/>"]);
        assert!(opts.flags.is_empty());

        // CLI overrides win over environment values
        let ov = Overrides {
            filter: vec!["+<test/>".into()],
            flags: vec!["--inconclusive".into()],
            severity: vec![Severity::Low],
            ..Overrides::default()
        };
        let opts = resolve_tool_options(&cfg, "native", native, &ov).unwrap();
        assert_eq!(opts.filter, vec!["+<test/>"]);
        assert_eq!(opts.flags, vec!["--inconclusive"]);
        assert_eq!(opts.severity, vec![Severity::Low]);
    }

    #[test]
    fn test_silent_forces_highest_severity_only() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path(), "envcheck.toml", SAMPLE);
        let cfg = load_config(&path).unwrap();
        let uno = cfg.get_env("uno").unwrap();
        let ov = Overrides {
            severity: vec![Severity::Low, Severity::Medium],
            silent: true,
            ..Overrides::default()
        };
        let opts = resolve_tool_options(&cfg, "uno", uno, &ov).unwrap();
        assert_eq!(opts.severity, vec![Severity::High]);
        assert!(opts.silent);

        let plain = resolve_tool_options(&cfg, "uno", uno, &Overrides::default()).unwrap();
        assert_eq!(plain.severity, vec![Severity::Medium, Severity::High]);
    }

    #[test]
    fn test_env_dump_lists_platform_framework_board() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path(), "envcheck.toml", SAMPLE);
        let cfg = load_config(&path).unwrap();
        assert_eq!(
            cfg.get_env("uno").unwrap().dump(),
            vec!["platform: atmelavr", "framework: arduino", "board: uno"]
        );
    }

    #[test]
    fn test_detect_project_dir_from_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_sample(root, "envcheck.toml", "[env.a]\n");
        fs::create_dir_all(root.join("src/drivers")).unwrap();
        let file = write_sample(&root.join("src/drivers"), "uart.c", "int x;");
        assert_eq!(detect_project_dir(&file), root.to_path_buf());
        assert_eq!(detect_project_dir(root), root.to_path_buf());
        assert_eq!(find_config_file(root, None).unwrap(), root.join("envcheck.toml"));
        assert!(matches!(
            find_config_file(&root.join("src"), None),
            Err(ConfigError::NotFound(_))
        ));
    }
}
