//! Source selection from `+<include>` / `-<exclude>` filter tokens.
//!
//! Tokens are globs relative to the project directory and are applied in
//! order: an include adds its matches, an exclude removes them. A pattern
//! ending in `/` selects the whole directory tree.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

static FILTER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])<([^>]+)>").expect("filter token regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToken {
    Include(String),
    Exclude(String),
}

/// Split filter strings into tokens; one string may hold several tokens.
pub fn parse_filter(filters: &[String]) -> Vec<FilterToken> {
    filters
        .iter()
        .flat_map(|f| FILTER_TOKEN.captures_iter(f))
        .map(|c| {
            let pat = c[2].trim().to_string();
            if &c[1] == "+" {
                FilterToken::Include(pat)
            } else {
                FilterToken::Exclude(pat)
            }
        })
        .collect()
}

/// `path` with glob metacharacters escaped, for use as a literal pattern prefix.
fn escaped(path: &Path) -> PathBuf {
    PathBuf::from(glob::Pattern::escape(&path.to_string_lossy()))
}

fn expand(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let pat = if pattern.ends_with('/') {
        format!("{}**/*", pattern)
    } else {
        pattern.to_string()
    };
    let full = escaped(root).join(&pat).to_string_lossy().to_string();
    let entries = match glob::glob(&full) {
        Ok(e) => e,
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "ignoring invalid filter pattern");
            return Vec::new();
        }
    };
    let mut out = Vec::new();
    for path in entries.flatten() {
        if path.is_dir() {
            let sub = escaped(&path).join("**/*").to_string_lossy().to_string();
            if let Ok(inner) = glob::glob(&sub) {
                out.extend(inner.flatten().filter(|p| p.is_file()));
            }
        } else {
            out.push(path);
        }
    }
    out
}

/// Files under `root` selected by `filters`, restricted to `extensions`
/// (case-insensitive; empty slice keeps every file). Sorted and de-duplicated.
pub fn match_src_files(root: &Path, filters: &[String], extensions: &[&str]) -> Vec<PathBuf> {
    let mut selected: BTreeSet<PathBuf> = BTreeSet::new();
    for token in parse_filter(filters) {
        match token {
            FilterToken::Include(p) => selected.extend(expand(root, &p)),
            FilterToken::Exclude(p) => {
                for path in expand(root, &p) {
                    selected.remove(&path);
                }
            }
        }
    }
    selected
        .into_iter()
        .filter(|p| {
            extensions.is_empty()
                || p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_filter_multiple_tokens_per_string() {
        let toks = parse_filter(&["+<src/> -<src/vendor/>".to_string(), "+<lib/*.c>".to_string()]);
        assert_eq!(
            toks,
            vec![
                FilterToken::Include("src/".into()),
                FilterToken::Exclude("src/vendor/".into()),
                FilterToken::Include("lib/*.c".into()),
            ]
        );
        assert!(parse_filter(&["src/".to_string()]).is_empty());
    }

    #[test]
    fn test_match_src_files_includes_then_excludes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for f in ["src/main.cpp", "src/util.c", "src/notes.txt", "src/vendor/x.c", "include/a.h"] {
            let p = root.join(f);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(&p, "").unwrap();
        }
        let files = match_src_files(
            root,
            &["+<src/> +<include/> -<src/vendor/>".to_string()],
            &["c", "cpp"],
        );
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["src/main.cpp", "src/util.c"]);

        let all = match_src_files(root, &["+<include/>".to_string()], &[]);
        assert_eq!(all.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_root_with_glob_metacharacters_is_literal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("board[1]*?");
        let src = root.join("src").join("drv[a]");
        fs::create_dir_all(&src).unwrap();
        fs::write(root.join("src/main.c"), "").unwrap();
        fs::write(src.join("uart.c"), "").unwrap();
        let files = match_src_files(&root, &["+<src/>".to_string()], &["c"]);
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["src/drv[a]/uart.c", "src/main.c"]);
    }
}
