//! `pyproject.toml` parser
//!
//! Sections are tool-specific, so each known tool's parser is tried in
//! order until one finds its section.

use serde_json::Value;

use crate::config::parsers::{ds_toml, pdm, poetry, rye, toml_loads, uv, FormatParser};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Tasks;
use crate::search::GlobMatches;
use crate::ui;

type WorkspaceParser = fn(&Config, &str) -> ConfigResult<GlobMatches>;
type TaskParser = fn(&Config, &str) -> ConfigResult<Tasks>;

/// Workspace locations, in search order.
const WORKSPACE_PARSERS: &[(&str, WorkspaceParser)] = &[
    ("tool.ds.workspace", ds_toml::parse_workspace_at),
    ("tool.uv.workspace", uv::parse_workspace_at),
    ("tool.rye.workspace", rye::parse_workspace_at),
    ("tool.pdm.workspace", pdm::parse_workspace_at), // experimental
    ("tool.poetry.workspace", poetry::parse_workspace_at), // experimental
];

/// Task locations, in search order.
const TASK_PARSERS: &[(&str, TaskParser)] = &[
    ("tool.ds.scripts", ds_toml::parse_tasks_at),
    ("tool.rye.scripts", rye::parse_tasks_at),
    ("tool.pdm.scripts", pdm::parse_tasks_at),
    ("tool.poetry.scripts", poetry::parse_tasks_at),
];

pub struct Pyproject;

impl FormatParser for Pyproject {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        toml_loads(text)
    }

    fn parse_workspace(&self, config: &Config) -> ConfigResult<GlobMatches> {
        for (key, parser) in WORKSPACE_PARSERS {
            ui::debug(&format!("Trying to find {key} in {}", config.path.display()));
            match parser(config, key) {
                Err(e) if e.is_missing() => continue,
                result => return result,
            }
        }
        Err(ConfigError::NoWorkspaceSection(config.path.clone()))
    }

    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks> {
        for (key, parser) in TASK_PARSERS {
            ui::debug(&format!("Trying to find {key} in {}", config.path.display()));
            match parser(config, key) {
                Err(e) if e.is_missing() => continue,
                result => return result,
            }
        }
        Err(ConfigError::NoTaskSection(config.path.clone()))
    }
}
