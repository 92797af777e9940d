//! Find files, directories, and config sections

use std::path::{Path, PathBuf};

use glob::Pattern;
use serde_json::Value;

use crate::syntax::{GLOB_ALL, GLOB_EXCLUDE, KEY_DELIMITER};
use crate::ui;

/// Look up a dotted key like `tool.ds.scripts` in a parsed document.
pub fn get_key<'a>(src: &'a Value, name: &str) -> Option<&'a Value> {
    let path: Vec<&str> = name.split(KEY_DELIMITER).collect();
    get_key_path(src, &path)
}

/// Look up a key path one segment at a time.
pub fn get_key_path<'a>(src: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = src;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Return the `names` that match any of `patterns`, in their original order.
///
/// Prefixing a pattern with `!` removes its matches from the result.
pub fn glob_names<'a, I>(names: I, patterns: &[&str]) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result: Vec<(&str, bool)> = names.into_iter().map(|n| (n, false)).collect();
    for pattern in patterns {
        let (exclude, pattern) = match pattern.strip_prefix(GLOB_EXCLUDE) {
            Some(rest) => (true, rest),
            None => (false, *pattern),
        };
        for (name, include) in result.iter_mut() {
            if name_matches(name, pattern) {
                *include = !exclude;
            }
        }
    }
    result
        .into_iter()
        .filter(|(_, include)| *include)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Match a single name against a pattern, treating bad patterns as literals.
fn name_matches(name: &str, pattern: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(glob) => glob.matches(name),
        Err(_) => name == pattern,
    }
}

/// Paths mapped to whether they are included, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobMatches(Vec<(PathBuf, bool)>);

impl GlobMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked paths, included or not.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.iter().any(|(p, _)| p == path)
    }

    pub fn get(&self, path: &Path) -> Option<bool> {
        self.0
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, include)| *include)
    }

    /// Insert a path or update its flag, keeping its original position.
    pub fn set(&mut self, path: PathBuf, include: bool) {
        match self.0.iter_mut().find(|(p, _)| *p == path) {
            Some((_, flag)) => *flag = include,
            None => self.0.push((path, include)),
        }
    }

    /// Set every tracked path to `include`.
    pub fn set_all(&mut self, include: bool) {
        for (_, flag) in self.0.iter_mut() {
            *flag = include;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, bool)> {
        self.0.iter().map(|(p, include)| (p.as_path(), *include))
    }

    /// Paths whose flag is set.
    pub fn included(&self) -> impl Iterator<Item = &Path> {
        self.0
            .iter()
            .filter(|(_, include)| *include)
            .map(|(p, _)| p.as_path())
    }
}

impl FromIterator<(PathBuf, bool)> for GlobMatches {
    fn from_iter<T: IntoIterator<Item = (PathBuf, bool)>>(iter: T) -> Self {
        let mut matches = GlobMatches::new();
        for (path, include) in iter {
            matches.set(path, include);
        }
        matches
    }
}

/// How `glob_paths` treats special patterns and unseen paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobOptions {
    /// `*` toggles every previously seen path instead of globbing.
    pub allow_all: bool,
    /// A `!` prefix excludes the pattern's matches.
    pub allow_excludes: bool,
    /// Matches may add paths beyond those already seen.
    pub allow_new: bool,
}

/// Apply glob `patterns` relative to `path`.
pub fn glob_paths(
    path: &Path,
    patterns: &[&str],
    options: GlobOptions,
    previous: Option<GlobMatches>,
) -> GlobMatches {
    let mut result = previous.unwrap_or_default();
    for pattern in patterns {
        let mut exclude = false;
        let mut pattern = *pattern;
        if options.allow_excludes {
            if let Some(rest) = pattern.strip_prefix(GLOB_EXCLUDE) {
                exclude = true;
                pattern = rest;
            }
        }

        if options.allow_all && pattern == GLOB_ALL {
            result.set_all(!exclude);
            continue;
        }

        let hits = glob_in(path, pattern);
        if hits.is_empty() {
            ui::warn(&format!("No results for {} in {}", pattern, path.display()));
        }
        for hit in hits {
            if options.allow_new || result.contains(&hit) {
                result.set(hit, !exclude);
            }
        }
    }
    result
}

/// Glob `pattern` under `base`, sorted; bad patterns fall back to a
/// literal existence check.
fn glob_in(base: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = base.join(pattern);
    let mut hits: Vec<PathBuf> = match glob::glob(&full.to_string_lossy()) {
        Ok(paths) => paths.filter_map(std::result::Result::ok).collect(),
        Err(_) if full.exists() => vec![full],
        Err(_) => Vec::new(),
    };
    hits.sort();
    hits
}

/// Search `start` and each of its ancestors for the given patterns.
///
/// Returns `(key, match)` pairs in ancestor-major order. Patterns with
/// no glob characters are plain existence checks.
pub fn glob_parents(start: &Path, patterns: &[(&str, &str)]) -> Vec<(String, PathBuf)> {
    let root = start
        .canonicalize()
        .unwrap_or_else(|_| start.to_path_buf());
    let mut found = Vec::new();
    for dir in root.ancestors() {
        for (key, pattern) in patterns {
            ui::debug(&format!("check {}", dir.join(pattern).display()));
            if pattern.contains(|c| matches!(c, '*' | '?' | '[' | '/')) {
                for hit in glob_in(dir, pattern) {
                    found.push((key.to_string(), hit));
                }
            } else {
                let check = dir.join(pattern);
                if check.exists() {
                    found.push((key.to_string(), check));
                }
            }
        }
    }
    found
}
