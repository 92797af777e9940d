//! `ds.toml` parser
//!
//! This is the native format. The same task grammar is reused for
//! `pyproject.toml` tables, `Cargo.toml` metadata, and Makefile recipes,
//! which all delegate here with their own section keys.

use std::path::Path;

use serde_json::Value;

use crate::config::parsers::{
    cmd_string, env_map, file_name, kind, rye, string_list, stringify, table, toml_loads, truthy,
    FormatParser,
};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{Task, Tasks};
use crate::search::{glob_paths, GlobMatches, GlobOptions};
use crate::syntax::{GLOB_EXCLUDE, TASK_COMPOSITE, TASK_DISABLED, TASK_KEEP_GOING, TASK_SHARED};

/// Alternate names accepted for task properties.
const PROPERTY_ALIASES: &[(&str, &str)] = &[
    ("chain", "composite"),
    ("env-file", "env_file"),
    ("shell", "cmd"),
    ("working_dir", "cwd"),
];

pub struct DsToml;

impl FormatParser for DsToml {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        toml_loads(text)
    }

    fn parse_workspace(&self, config: &Config) -> ConfigResult<GlobMatches> {
        parse_workspace_at(config, "workspace")
    }

    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks> {
        parse_tasks_at(config, "scripts")
    }
}

/// Workspaces are in `workspace` (ds.toml) or `tool.ds.workspace`
/// (pyproject.toml).
pub(crate) fn parse_workspace_at(config: &Config, key: &str) -> ConfigResult<GlobMatches> {
    let key = if file_name(&config.path).starts_with("pyproject") && key == "workspace" {
        "tool.ds.workspace"
    } else {
        key
    };
    let data = table(config, key)?;
    let base = config.dir();

    let mut members = GlobMatches::new();
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
    }

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
    Ok(members)
}

/// Tasks are in `scripts` (ds.toml) or `tool.ds.scripts` (pyproject.toml).
pub(crate) fn parse_tasks_at(config: &Config, key: &str) -> ConfigResult<Tasks> {
    let key = if file_name(&config.path).starts_with("pyproject") && key == "scripts" {
        "tool.ds.scripts"
    } else {
        key
    };
    let data = table(config, key)?;

    let mut common: Option<Task> = None;
    let mut tasks = Tasks::new();
    for (name, item) in data {
        if name.starts_with(TASK_DISABLED) {
            continue;
        }

        let task = parse_task(item, name, &config.path, key)?;
        if name == TASK_SHARED {
            common = Some(task);
        } else {
            tasks.insert(name.clone(), task);
        }
    }

    if let Some(common) = common {
        merge_shared(&mut tasks, &common);
    }

    Ok(tasks)
}

/// Fold the shared `_` entry into every other task.
pub(crate) fn merge_shared(tasks: &mut Tasks, common: &Task) {
    for task in tasks.values_mut() {
        task.keep_going = task.keep_going || common.keep_going;
        let mut env = common.env.clone();
        env.append(&mut task.env);
        task.env = env;
        if task.env_file.is_none() {
            task.env_file = common.env_file.clone();
        }
        if task.cwd.is_none() {
            task.cwd = common.cwd.clone();
        }
    }
}

/// Turn a list of step specs into composite dependencies.
///
/// Steps copy the fields parsed so far; a `+` prefix suppresses errors
/// for that step only.
pub(crate) fn parse_composite(task: &mut Task, steps: &[Value]) {
    let mut depends = Vec::new();
    for step in steps {
        let step = stringify(step);
        let (keep_going, cmd) = strip_keep_going(&step);
        let mut dep = task.clone();
        dep.name = TASK_COMPOSITE.to_string();
        dep.cmd = cmd.to_string();
        dep.keep_going = keep_going;
        depends.push(dep);
    }
    task.depends = depends;
}

/// Parse a single task definition.
pub(crate) fn parse_task(item: &Value, name: &str, path: &Path, key: &str) -> ConfigResult<Task> {
    let mut task = Task {
        origin: Some(path.to_path_buf()),
        origin_key: key.to_string(),
        name: name.to_string(),
        ..Task::default()
    };

    match item {
        Value::String(cmd) => {
            let (keep_going, cmd) = strip_keep_going(cmd);
            task.keep_going = keep_going;
            task.cmd = cmd.to_string();
        }
        Value::Array(steps) => parse_composite(&mut task, steps),
        Value::Object(spec) => {
            for (alias, canonical) in PROPERTY_ALIASES {
                if spec.contains_key(*alias) && spec.contains_key(*canonical) {
                    return Err(ConfigError::AliasConflict {
                        name: name.to_string(),
                        key: canonical.to_string(),
                        alias: alias.to_string(),
                        path: path.to_path_buf(),
                    });
                }
            }
            let get = |key: &str, alias: &str| spec.get(key).or_else(|| spec.get(alias));

            if let Some(help) = spec.get("help").filter(|v| truthy(v)) {
                task.help = stringify(help);
            }

            // unlike pdm or rye, `composite` and `cmd` may both be present
            if let Some(steps) = get("composite", "chain")
                .and_then(Value::as_array)
                .filter(|steps| !steps.is_empty())
            {
                parse_composite(&mut task, steps);
            }

            if let Some(cmd) = get("cmd", "shell").filter(|v| truthy(v)) {
                let cmd = cmd_string(cmd);
                let (keep_going, cmd) = strip_keep_going(&cmd);
                task.keep_going = keep_going;
                task.cmd = cmd.to_string();
            } else if let Some(call) = spec.get("call").filter(|v| truthy(v)) {
                if !file_name(path).starts_with("pyproject") {
                    return Err(ConfigError::CallOutsidePyproject {
                        name: name.to_string(),
                        path: path.to_path_buf(),
                    });
                }
                task.cmd = rye::python_call(&stringify(call));
            }

            if spec.get("verbatim").map(truthy).unwrap_or(false) {
                task.verbatim = true;
            }

            // an explicit value wins over a `+` prefix on the command
            if let Some(value) = spec.get("keep_going") {
                task.keep_going = truthy(value);
            }

            if let Some(env) = spec.get("env").filter(|v| truthy(v)) {
                task.env = env_map(env);
            }

            let base = path.parent().unwrap_or_else(|| Path::new(""));
            if let Some(env_file) = get("env_file", "env-file").filter(|v| truthy(v)) {
                task.env_file = Some(base.join(stringify(env_file)));
            }
            if let Some(cwd) = get("cwd", "working_dir").filter(|v| truthy(v)) {
                task.cwd = Some(base.join(stringify(cwd)));
            }
        }
        other => {
            return Err(ConfigError::UnknownTaskShape {
                name: name.to_string(),
                detail: format!("Unknown type: {}", kind(other)),
                path: path.to_path_buf(),
            })
        }
    }

    Ok(task)
}

fn strip_keep_going(cmd: &str) -> (bool, &str) {
    match cmd.strip_prefix(TASK_KEEP_GOING) {
        Some(rest) => (true, rest),
        None => (false, cmd),
    }
}
