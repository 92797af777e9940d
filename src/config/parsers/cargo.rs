//! `Cargo.toml` parser

use serde_json::Value;

use crate::config::parsers::{ds_toml, string_list, table, toml_loads, FormatParser};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Tasks;
use crate::search::{get_key, glob_paths, GlobMatches, GlobOptions};
use crate::syntax::GLOB_EXCLUDE;

pub struct Cargo;

impl FormatParser for Cargo {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        toml_loads(text)
    }

    fn parse_workspace(&self, config: &Config) -> ConfigResult<GlobMatches> {
        parse_workspace_at(config, "workspace")
    }

    /// Tasks are not official; `workspace.metadata.scripts` and
    /// `package.metadata.scripts` are checked in that order.
    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks> {
        let mut key = "workspace.metadata.scripts";
        if get_key(&config.data, key).is_none() {
            key = "package.metadata.scripts";
            if get_key(&config.data, key).is_none() {
                return Err(ConfigError::MissingKey {
                    key: key.to_string(),
                    path: config.path.clone(),
                });
            }
        }
        ds_toml::parse_tasks_at(config, key)
    }
}

/// `workspace.members` with `workspace.exclude` removals.
pub(crate) fn parse_workspace_at(config: &Config, key: &str) -> ConfigResult<GlobMatches> {
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
                allow_excludes: false,
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
