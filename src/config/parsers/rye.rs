//! `pyproject.toml` parser for `rye`

use std::path::PathBuf;

use serde_json::Value;

use crate::config::parsers::{cmd_string, env_map, kind, string_list, stringify, table, truthy};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{Task, Tasks};
use crate::search::{get_key_path, glob_paths, GlobMatches, GlobOptions};
use crate::syntax::{KEY_DELIMITER, TASK_COMPOSITE, TASK_DISABLED};

/// Workspaces are in `tool.rye.workspace`.
///
/// The config's own directory is a member unless the workspace is
/// virtual. Without an explicit member list, every nested
/// `pyproject.toml` marks a member.
pub(crate) fn parse_workspace_at(config: &Config, key: &str) -> ConfigResult<GlobMatches> {
    let data = table(config, key)?;
    let base = config.dir();

    // the virtual flag lives next to the workspace table
    let mut parts: Vec<&str> = key.split(KEY_DELIMITER).collect();
    if let Some(last) = parts.last_mut() {
        *last = "virtual";
    }
    let is_virtual = get_key_path(&config.data, &parts)
        .map(truthy)
        .unwrap_or(false);

    let mut members = GlobMatches::new();
    if !is_virtual {
        let root = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
        members.set(root, true);
    }

    if let Some(value) = data.get("members") {
        let patterns = string_list(value);
        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        members = glob_paths(
            base,
            &patterns,
            GlobOptions {
                allow_all: false,
                allow_excludes: true, // excludes are allowed inside members
                allow_new: true,
            },
            Some(members),
        );
    } else if let Ok(paths) = glob::glob(&base.join("**/pyproject.toml").to_string_lossy()) {
        let mut found: Vec<PathBuf> = paths.filter_map(|path| path.ok()).collect();
        found.sort();
        for hit in found {
            if let Some(dir) = hit.parent() {
                members.set(dir.to_path_buf(), true);
            }
        }
    }
    Ok(members)
}

/// Tasks are in `tool.rye.scripts`.
pub(crate) fn parse_tasks_at(config: &Config, key: &str) -> ConfigResult<Tasks> {
    let data = table(config, key)?;

    let mut tasks = Tasks::new();
    for (name, item) in data {
        if name.starts_with(TASK_DISABLED) {
            continue;
        }

        let mut task = Task {
            origin: Some(config.path.clone()),
            origin_key: key.to_string(),
            name: name.clone(),
            ..Task::default()
        };
        match item {
            Value::String(cmd) => task.cmd = cmd.clone(),
            Value::Array(_) => task.cmd = cmd_string(item),
            Value::Object(spec) => {
                if let Some(help) = spec.get("help").filter(|v| truthy(v)) {
                    task.help = stringify(help);
                }

                if let Some(cmd) = spec.get("cmd").filter(|v| truthy(v)) {
                    task.cmd = cmd_string(cmd);
                } else if let Some(call) = spec.get("call").filter(|v| truthy(v)) {
                    task.cmd = python_call(&stringify(call));
                } else if let Some(steps) = spec
                    .get("chain")
                    .and_then(Value::as_array)
                    .filter(|steps| !steps.is_empty())
                {
                    for step in steps {
                        task.depends.push(Task {
                            origin: Some(config.path.clone()),
                            origin_key: key.to_string(),
                            name: TASK_COMPOSITE.to_string(),
                            cmd: stringify(step),
                            ..Task::default()
                        });
                    }
                } else {
                    return Err(ConfigError::UnknownTaskShape {
                        name: name.clone(),
                        detail: format!("Unknown command: {item}"),
                        path: config.path.clone(),
                    });
                }

                if let Some(env) = spec.get("env").filter(|v| truthy(v)) {
                    task.env = env_map(env);
                }

                // relative to the config file
                if let Some(env_file) = spec.get("env-file").filter(|v| truthy(v)) {
                    task.env_file = Some(config.dir().join(stringify(env_file)));
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

    Ok(tasks)
}

/// Format a `call` entry as a shell command.
///
/// A bare module runs with `-m`; a `pkg:fn` pair becomes an inline
/// interpreter call whose exit status is the function's return value.
pub(crate) fn python_call(call: &str) -> String {
    match call.split_once(':') {
        None => format!("python -m {call}"),
        Some((pkg, func)) => {
            let func = if func.ends_with(')') {
                func.to_string()
            } else {
                format!("{func}()")
            };
            format!("python -c 'import sys; import {pkg} as _1; sys.exit(_1.{func})'")
        }
    }
}
