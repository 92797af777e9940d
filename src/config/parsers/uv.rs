//! `uv.toml` parser

use serde_json::Value;

use crate::config::parsers::{cargo, file_name, toml_loads, FormatParser};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Tasks;
use crate::search::GlobMatches;

pub struct Uv;

impl FormatParser for Uv {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        toml_loads(text)
    }

    fn parse_workspace(&self, config: &Config) -> ConfigResult<GlobMatches> {
        parse_workspace_at(config, "tool.uv.workspace")
    }

    fn parse_tasks(&self, _config: &Config) -> ConfigResult<Tasks> {
        Err(ConfigError::Unsupported(
            "`uv` does not support tasks.".to_string(),
        ))
    }
}

/// Workspaces are in `workspace` (uv.toml) or `tool.uv.workspace`
/// (pyproject.toml); the layout follows `Cargo.toml`.
pub(crate) fn parse_workspace_at(config: &Config, key: &str) -> ConfigResult<GlobMatches> {
    let key = if file_name(&config.path) == "uv.toml" && key == "tool.uv.workspace" {
        "workspace"
    } else {
        key
    };
    cargo::parse_workspace_at(config, key)
}
