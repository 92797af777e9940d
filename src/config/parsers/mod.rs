//! Parsers for supported configuration formats
//!
//! Each format pairs a loader, which turns raw text into a uniform
//! document, with extractors for workspace members and task definitions.
//! File names are matched against the registry to pick a parser.

mod cargo;
mod composer;
mod ds_toml;
mod makefile;
mod package_json;
mod pdm;
mod poetry;
mod pyproject;
mod rye;
mod uv;

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Tasks;
use crate::search::{get_key, GlobMatches};

/// A configuration file format.
pub trait FormatParser {
    /// Parse raw text into a uniform document.
    fn loads(&self, text: &str) -> ConfigResult<Value>;

    /// Extract workspace members.
    fn parse_workspace(&self, config: &Config) -> ConfigResult<GlobMatches>;

    /// Extract task definitions.
    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks>;
}

/// File name patterns mapped to the parser that handles them.
pub static PARSERS: &[(&str, &(dyn FormatParser + Sync))] = &[
    ("ds.toml", &ds_toml::DsToml),
    (".ds.toml", &ds_toml::DsToml),
    ("pyproject.toml", &pyproject::Pyproject),
    ("uv.toml", &uv::Uv),
    ("package.json", &package_json::PackageJson),
    ("Cargo.toml", &cargo::Cargo),
    ("composer.json", &composer::Composer),
    ("[Mm]akefile", &makefile::Makefile),
];

/// Find the parser that handles `path`, by file name.
pub fn parser_for(path: &Path) -> ConfigResult<&'static (dyn FormatParser + Sync)> {
    let name = file_name(path);
    for (pattern, parser) in PARSERS {
        if glob::Pattern::new(pattern).unwrap().matches(&name) {
            return Ok(*parser);
        }
    }
    Err(ConfigError::UnknownFormat(path.to_path_buf()))
}

/// Parse TOML text into a uniform document.
pub(crate) fn toml_loads(text: &str) -> ConfigResult<Value> {
    let value: toml::Value = toml::from_str(text)?;
    Ok(serde_json::to_value(value)?)
}

/// Parse JSON text into a uniform document.
pub(crate) fn json_loads(text: &str) -> ConfigResult<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Final component of `path` as a string.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Look up a dotted `key` and require a table there.
pub(crate) fn table<'a>(config: &'a Config, key: &str) -> ConfigResult<&'a Map<String, Value>> {
    get_key(&config.data, key)
        .and_then(Value::as_object)
        .ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
            path: config.path.clone(),
        })
}

/// Whether an optional config value counts as set.
///
/// Empty strings, empty collections, zero, `false`, and `null` are all
/// treated as absent.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

/// Render a config value as plain text.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A command is either a string or a list of words to join.
pub(crate) fn cmd_string(value: &Value) -> String {
    match value {
        Value::Array(words) => words.iter().map(stringify).collect::<Vec<_>>().join(" "),
        other => stringify(other),
    }
}

/// Convert an `env` table into string pairs.
pub(crate) fn env_map(value: &Value) -> crate::runner::EnvMap {
    value
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .map(|(key, value)| (key.clone(), stringify(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// Interpret a config value as a list of strings.
pub(crate) fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().map(stringify).collect())
        .unwrap_or_default()
}

/// Describe a value's type for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
