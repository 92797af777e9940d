//! `pyproject.toml` parser for `pdm`

use serde_json::Value;

use crate::config::parsers::{
    cmd_string, ds_toml, env_map, kind, rye, string_list, stringify, table, truthy,
};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{Task, Tasks};
use crate::search::{glob_paths, GlobMatches, GlobOptions};
use crate::syntax::{TASK_COMPOSITE, TASK_DISABLED, TASK_SHARED};
use crate::ui;

/// `pdm` does not officially support workspaces; `packages` under
/// `tool.pdm.workspace` is honored anyway.
pub(crate) fn parse_workspace_at(config: &Config, key: &str) -> ConfigResult<GlobMatches> {
    let data = table(config, key)?;
    ui::warn("EXPERIMENTAL: pdm does not officially support workspaces");

    let mut members = GlobMatches::new();
    if let Some(value) = data.get("packages") {
        let patterns = string_list(value);
        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        members = glob_paths(
            config.dir(),
            &patterns,
            GlobOptions {
                allow_all: false,
                allow_excludes: true,
                allow_new: true,
            },
            Some(members),
        );
    }
    Ok(members)
}

/// Tasks are in `tool.pdm.scripts`.
pub(crate) fn parse_tasks_at(config: &Config, key: &str) -> ConfigResult<Tasks> {
    let data = table(config, key)?;

    let mut common: Option<Task> = None;
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
            Value::Object(spec) => {
                if let Some(help) = spec.get("help").filter(|v| truthy(v)) {
                    task.help = stringify(help);
                }

                if let Some(cmd) = spec.get("cmd").filter(|v| truthy(v)) {
                    task.cmd = cmd_string(cmd);
                } else if let Some(cmd) = spec.get("shell").filter(|v| truthy(v)) {
                    task.cmd = cmd_string(cmd);
                } else if let Some(call) = spec.get("call").filter(|v| truthy(v)) {
                    task.cmd = rye::python_call(&stringify(call));
                } else if let Some(steps) = spec
                    .get("composite")
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
                } else if name == TASK_SHARED {
                    // shared options carry no command
                } else {
                    return Err(ConfigError::UnknownTaskShape {
                        name: name.clone(),
                        detail: format!("Unknown command: {item}"),
                        path: config.path.clone(),
                    });
                }

                if let Some(value) = spec.get("keep_going") {
                    task.keep_going = truthy(value);
                }

                if let Some(env) = spec.get("env").filter(|v| truthy(v)) {
                    task.env = env_map(env);
                }

                let base = config.dir();
                if let Some(env_file) = spec.get("env_file").filter(|v| truthy(v)) {
                    task.env_file = Some(base.join(stringify(env_file)));
                }
                if let Some(cwd) = spec.get("working_dir").filter(|v| truthy(v)) {
                    task.cwd = Some(base.join(stringify(cwd)));
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

        if name == TASK_SHARED {
            common = Some(task);
        } else {
            tasks.insert(name.clone(), task);
        }
    }

    if let Some(common) = common {
        ds_toml::merge_shared(&mut tasks, &common);
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parsers::toml_loads;
    use std::path::PathBuf;

    fn config(text: &str) -> Config {
        Config {
            path: PathBuf::from("pyproject.toml"),
            data: toml_loads(text).unwrap(),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_tasks() {
        let config = config(
            r#"
[tool.pdm.scripts]
_ = { env = { SHARED = "1" } }
plain = "pytest"
full = { cmd = ["pytest", "-x"], help = "fail fast", keep_going = true }
piped = { shell = "cat in | wc -l" }
steps = { composite = ["plain", "full"] }
"#,
        );
        let tasks = parse_tasks_at(&config, "tool.pdm.scripts").unwrap();

        assert_eq!(tasks.get("plain").unwrap().cmd, "pytest");
        let full = tasks.get("full").unwrap();
        assert_eq!(full.cmd, "pytest -x");
        assert_eq!(full.help, "fail fast");
        assert!(full.keep_going);
        assert_eq!(tasks.get("piped").unwrap().cmd, "cat in | wc -l");
        assert_eq!(tasks.get("steps").unwrap().depends.len(), 2);

        // shared options reach every task
        for task in tasks.values() {
            assert_eq!(task.env.get("SHARED").map(String::as_str), Some("1"));
        }
    }

    #[test]
    fn test_parse_tasks_paths_relative_to_config() {
        let config = Config {
            path: PathBuf::from("/proj/pyproject.toml"),
            data: toml_loads(
                "[tool.pdm.scripts.x]\ncmd = 'ls'\nenv_file = '.env'\nworking_dir = 'sub'\n",
            )
            .unwrap(),
            ..Config::default()
        };
        let tasks = parse_tasks_at(&config, "tool.pdm.scripts").unwrap();
        let task = tasks.get("x").unwrap();

        assert_eq!(task.env_file, Some(PathBuf::from("/proj/.env")));
        assert_eq!(task.cwd, Some(PathBuf::from("/proj/sub")));
    }

    #[test]
    fn test_parse_tasks_unknown_command() {
        let config = config("[tool.pdm.scripts]\nx = { nope = 1 }\n");
        let err = parse_tasks_at(&config, "tool.pdm.scripts").unwrap_err();
        assert!(err.to_string().starts_with("Unknown command:"));
    }
}
