//! `composer.json` parser

use regex::Regex;
use serde_json::Value;

use crate::config::parsers::{json_loads, kind, string_list, table, FormatParser};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::interpolate::has_arg_placeholder;
use crate::runner::{Task, Tasks};
use crate::search::{get_key, GlobMatches};
use crate::syntax::{TASK_COMPOSITE, TASK_DISABLED, TASK_KEEP_GOING};
use crate::ui;

/// Prefix that references another script.
const PHP_REFER: &str = "@";

pub struct Composer;

impl FormatParser for Composer {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        json_loads(text)
    }

    fn parse_workspace(&self, _config: &Config) -> ConfigResult<GlobMatches> {
        Err(ConfigError::Unsupported(
            "composer.json does not support workspaces.".to_string(),
        ))
    }

    /// Tasks are in `scripts`, with descriptions in
    /// `scripts-descriptions` and extra names in `scripts-aliases`.
    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks> {
        let data = table(config, "scripts")?;
        ui::warn("EXPERIMENTAL: Parsing `composer.json` format.");

        let mut tasks = Tasks::new();
        for (name, item) in data {
            if name.starts_with(TASK_DISABLED) {
                continue;
            }

            let mut task = Task {
                origin: Some(config.path.clone()),
                origin_key: "scripts".to_string(),
                name: name.clone(),
                help: description(config, name),
                ..Task::default()
            };
            match item {
                Value::String(cmd) => {
                    if cmd.starts_with(TASK_KEEP_GOING) {
                        ui::warn(&format!(
                            r#"composer.json does not support error suppression. Did you mean "{name}": "ds {cmd}""#
                        ));
                    }
                    if has_arg_placeholder(cmd) {
                        ui::warn(
                            "composer.json does not support argument interpolation. \
                             We'll allow it, but it may break other tools.",
                        );
                    }
                    parse_cmd(&mut task, cmd);
                }
                Value::Array(steps) => {
                    for step in steps {
                        let step = step.as_str().unwrap_or_default();
                        if let Some(pair) = step.strip_prefix("@putenv ") {
                            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                            task.env.insert(key.to_string(), value.to_string());
                        } else {
                            let mut sub = Task {
                                origin: Some(config.path.clone()),
                                origin_key: "scripts".to_string(),
                                name: TASK_COMPOSITE.to_string(),
                                ..Task::default()
                            };
                            parse_cmd(&mut sub, step);
                            task.depends.push(sub);
                        }
                    }
                }
                other => {
                    return Err(ConfigError::UnknownTaskShape {
                        name: name.clone(),
                        detail: format!("Unknown type: {}", kind(other)),
                        path: config.path.clone(),
                    })
                }
            }
            tasks.insert(name.clone(), task);
        }

        // aliases run their target as a single composite step
        if let Some(aliases) = get_key(&config.data, "scripts-aliases").and_then(Value::as_object) {
            for (target, names) in aliases {
                for name in string_list(names) {
                    let step = Task {
                        origin: Some(config.path.clone()),
                        origin_key: "scripts".to_string(),
                        name: TASK_COMPOSITE.to_string(),
                        cmd: target.clone(),
                        ..Task::default()
                    };
                    let task = Task {
                        origin: Some(config.path.clone()),
                        origin_key: "scripts-aliases".to_string(),
                        name: name.clone(),
                        depends: vec![step],
                        ..Task::default()
                    };
                    tasks.insert(name, task);
                }
            }
        }

        Ok(tasks)
    }
}

fn description(config: &Config, name: &str) -> String {
    get_key(&config.data, "scripts-descriptions")
        .and_then(|section| section.get(name))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Store a command, treating an `@` prefix as a script reference.
fn parse_cmd(task: &mut Task, cmd: &str) {
    if let Some(reference) = cmd.strip_prefix(PHP_REFER) {
        task.depends.push(Task {
            origin: task.origin.clone(),
            origin_key: task.origin_key.clone(),
            name: TASK_COMPOSITE.to_string(),
            cmd: reference.to_string(),
            ..Task::default()
        });
    } else {
        task.cmd = php_call(cmd);
    }
}

/// Wrap a static method or invokable class in an interpreter call.
fn php_call(cmd: &str) -> String {
    let re = Regex::new(r"^[A-Z][A-Za-z0-9_\\]+(::[A-Za-z0-9_]+)?$").unwrap();
    if !re.is_match(cmd) {
        return cmd.to_string();
    }
    format!(r#"php -r "require 'vendor/autoload.php'; {cmd}();""#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(text: &str) -> Config {
        Config {
            path: PathBuf::from("composer.json"),
            data: json_loads(text).unwrap(),
            ..Config::default()
        }
    }

    #[test]
    fn test_php_call() {
        assert_eq!(
            php_call(r"App\Build::run"),
            r#"php -r "require 'vendor/autoload.php'; App\Build::run();""#
        );
        assert_eq!(php_call("phpunit --filter smoke"), "phpunit --filter smoke");
    }

    #[test]
    fn test_parse_tasks() {
        let config = config(
            r#"{
  "scripts": {
    "test": "phpunit",
    "build": ["@putenv APP_ENV=prod", "@test", "ls dist"]
  },
  "scripts-descriptions": {"test": "run the suite"},
  "scripts-aliases": {"test": ["t"]}
}"#,
        );
        let tasks = Composer.parse_tasks(&config).unwrap();

        let test = tasks.get("test").unwrap();
        assert_eq!(test.cmd, "phpunit");
        assert_eq!(test.help, "run the suite");

        let build = tasks.get("build").unwrap();
        assert_eq!(build.env.get("APP_ENV").map(String::as_str), Some("prod"));
        assert_eq!(build.depends.len(), 2);
        // the reference step has no command of its own
        assert!(build.depends[0].cmd.is_empty());
        assert_eq!(build.depends[0].depends[0].cmd, "test");
        assert_eq!(build.depends[1].cmd, "ls dist");

        let alias = tasks.get("t").unwrap();
        assert_eq!(alias.origin_key, "scripts-aliases");
        assert_eq!(alias.depends[0].cmd, "test");
    }

    #[test]
    fn test_parse_workspace_unsupported() {
        let err = Composer.parse_workspace(&Config::default()).unwrap_err();
        assert_eq!(err.to_string(), "composer.json does not support workspaces.");
        assert!(err.is_missing());
    }
}
