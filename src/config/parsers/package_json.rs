//! `package.json` parser
//!
//! Scripts are plain strings. Conventions this runner adds on top, like
//! error suppression and argument placeholders, would not work under
//! `npm run`, so they are flagged with warnings rather than rejected.

use serde_json::Value;

use crate::config::parsers::{json_loads, kind, string_list, table, FormatParser};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::interpolate::has_arg_placeholder;
use crate::runner::{Task, Tasks};
use crate::search::{glob_names, glob_paths, GlobMatches, GlobOptions};
use crate::syntax::{GLOB_DELIMITER, TASK_DISABLED, TASK_KEEP_GOING};
use crate::ui;

pub struct PackageJson;

impl FormatParser for PackageJson {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        json_loads(text)
    }

    /// Globs in `workspaces`, with non-standard exclude support.
    fn parse_workspace(&self, config: &Config) -> ConfigResult<GlobMatches> {
        let Some(value) = config.data.get("workspaces") else {
            return Err(ConfigError::MissingKey {
                key: "workspaces".to_string(),
                path: config.path.clone(),
            });
        };
        let patterns = string_list(value);
        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        Ok(glob_paths(
            config.dir(),
            &patterns,
            GlobOptions {
                allow_all: false,
                allow_excludes: true,
                allow_new: true,
            },
            None,
        ))
    }

    /// Tasks are in `scripts`; `#name` entries hold descriptions.
    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks> {
        let scripts = table(config, "scripts")?;

        let mut tasks = Tasks::new();
        for (name, value) in scripts {
            if name.starts_with(TASK_DISABLED) {
                continue;
            }
            let Some(cmd) = value.as_str() else {
                return Err(ConfigError::UnknownTaskShape {
                    name: name.clone(),
                    detail: format!("Unknown type: {}", kind(value)),
                    path: config.path.clone(),
                });
            };

            if cmd.starts_with(TASK_KEEP_GOING) {
                ui::warn(&format!(
                    r#"package.json does not support error suppression. Did you mean "{name}": "ds {cmd}""#
                ));
            }
            if has_arg_placeholder(cmd) {
                ui::warn(
                    "package.json does not support argument interpolation. \
                     We'll allow it, but it may break other tools.",
                );
            }

            let help = scripts
                .get(&format!("{TASK_DISABLED}{name}"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            tasks.insert(
                name.clone(),
                Task {
                    origin: Some(config.path.clone()),
                    origin_key: "scripts".to_string(),
                    name: name.clone(),
                    cmd: cmd.to_string(),
                    help: help.to_string(),
                    ..Task::default()
                },
            );
        }

        // npm would hand a task name straight to the shell, not to us
        for (_, task) in tasks.iter() {
            let Ok(words) = shell_words::split(&task.cmd) else {
                continue;
            };
            let Some(first) = words.first() else {
                continue;
            };
            let patterns: Vec<&str> = first.split(GLOB_DELIMITER).collect();
            for other in glob_names(tasks.names(), &patterns) {
                if tasks.get(&other).map(|found| found != task).unwrap_or(false) {
                    ui::warn(&format!(
                        r#"package.json does not support tasks that reference other tasks. Did you mean: "{}": "ds {}""#,
                        task.name, task.cmd
                    ));
                }
            }
        }

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(text: &str) -> Config {
        Config {
            path: PathBuf::from("package.json"),
            data: json_loads(text).unwrap(),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_tasks_with_help() {
        let config = config(
            r##"{"scripts": {"#build": "compile the app", "build": "tsc -p .", "test": "jest"}}"##,
        );
        let tasks = PackageJson.parse_tasks(&config).unwrap();

        assert_eq!(tasks.len(), 2);
        let build = tasks.get("build").unwrap();
        assert_eq!(build.cmd, "tsc -p .");
        assert_eq!(build.help, "compile the app");
        assert_eq!(tasks.get("test").unwrap().help, "");
    }

    #[test]
    fn test_parse_tasks_missing_scripts() {
        let config = config(r#"{"name": "demo"}"#);
        let err = PackageJson.parse_tasks(&config).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'scripts' key in package.json");
    }

    #[test]
    fn test_parse_workspace() {
        let dir = TempDir::new().unwrap();
        for name in ["pkg-a", "pkg-b"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let config = Config {
            path: dir.path().join("package.json"),
            data: json_loads(r#"{"workspaces": ["pkg-*", "!pkg-b"]}"#).unwrap(),
            ..Config::default()
        };
        let members = PackageJson.parse_workspace(&config).unwrap();

        assert_eq!(members.get(&dir.path().join("pkg-a")), Some(true));
        assert_eq!(members.get(&dir.path().join("pkg-b")), Some(false));
    }
}
