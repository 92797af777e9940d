//! `pyproject.toml` parser for `poetry`
//!
//! Poetry has no workspace support of its own; two community plugins
//! with different layouts are recognized. Scripts are entry points of
//! the form `pkg.module:function`.

use crate::config::parsers::{string_list, stringify, table};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{Task, Tasks};
use crate::search::{glob_paths, GlobMatches, GlobOptions};
use crate::syntax::GLOB_EXCLUDE;
use crate::ui;

pub(crate) fn parse_workspace_at(config: &Config, key: &str) -> ConfigResult<GlobMatches> {
    let data = table(config, key)?;
    ui::warn("EXPERIMENTAL: parsing tool.poetry.workspace");
    let base = config.dir();

    let mut members = GlobMatches::new();
    if let Some(value) = data.get("include") {
        // Cargo-style plugin: include + exclude pattern lists
        let patterns = string_list(value);
        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        members = glob_paths(
            base,
            &patterns,
            GlobOptions {
                allow_all: false,
                allow_excludes: false,
                allow_new: true,
            },
            Some(members),
        );

        if let Some(value) = data.get("exclude") {
            let patterns: Vec<String> = string_list(value)
                .iter()
                .map(|pattern| format!("{GLOB_EXCLUDE}{pattern}"))
                .collect();
            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            members = glob_paths(
                base,
                &patterns,
                GlobOptions {
                    allow_all: false,
                    allow_excludes: true,
                    allow_new: false,
                },
                Some(members),
            );
        }
    } else {
        // plugin style: a table of names to member paths
        for value in data.values() {
            let check = base.join(stringify(value));
            ui::debug(&format!("checking {}", check.display()));
            if check.exists() {
                members.set(check, true);
            }
        }
    }
    Ok(members)
}

/// Tasks are in `tool.poetry.scripts`; only entry-point calls exist,
/// and arguments are not supported.
pub(crate) fn parse_tasks_at(config: &Config, key: &str) -> ConfigResult<Tasks> {
    let data = table(config, key)?;

    let mut tasks = Tasks::new();
    for (name, value) in data {
        let script = stringify(value);
        let Some((pkg, func)) = script.split_once(':') else {
            return Err(ConfigError::UnknownTaskShape {
                name: name.clone(),
                detail: format!("Unknown command: {script}"),
                path: config.path.clone(),
            });
        };
        tasks.insert(
            name.clone(),
            Task {
                origin: Some(config.path.clone()),
                origin_key: key.to_string(),
                name: name.clone(),
                cmd: format!("python -c 'import sys; import {pkg} as _1; sys.exit(_1.{func}())'"),
                ..Task::default()
            },
        );
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parsers::toml_loads;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_parse_tasks() {
        let config = Config {
            path: PathBuf::from("pyproject.toml"),
            data: toml_loads("[tool.poetry.scripts]\nserve = 'my_pkg.app:main'\n").unwrap(),
            ..Config::default()
        };
        let tasks = parse_tasks_at(&config, "tool.poetry.scripts").unwrap();

        assert_eq!(
            tasks.get("serve").unwrap().cmd,
            "python -c 'import sys; import my_pkg.app as _1; sys.exit(_1.main())'"
        );
    }

    #[test]
    fn test_parse_tasks_requires_entry_point() {
        let config = Config {
            path: PathBuf::from("pyproject.toml"),
            data: toml_loads("[tool.poetry.scripts]\nbad = 'no-colon'\n").unwrap(),
            ..Config::default()
        };
        let err = parse_tasks_at(&config, "tool.poetry.scripts").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown command: no-colon for 'bad' in pyproject.toml"
        );
    }

    #[test]
    fn test_parse_workspace_plugin_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();

        let config = Config {
            path: dir.path().join("pyproject.toml"),
            data: toml_loads("[tool.poetry.workspace]\napp = 'app'\ngone = 'missing'\n").unwrap(),
            ..Config::default()
        };
        let members = parse_workspace_at(&config, "tool.poetry.workspace").unwrap();

        assert_eq!(members.get(&dir.path().join("app")), Some(true));
        assert!(!members.contains(&dir.path().join("missing")));
    }
}
