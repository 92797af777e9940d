//! Config file discovery, loading, and parsing
//!
//! A `Config` is a path plus the document loaded from it. Format
//! parsers fill in `tasks` and `members`; which parser runs is decided
//! by the file name.

pub mod parsers;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::runner::Tasks;
use crate::search::{glob_parents, GlobMatches};
use crate::ui;

/// Search order for configuration file names.
pub const SEARCH_FILES: &[&str] = &[
    "ds.toml",
    "pyproject.toml", // python
    "package.json",   // node
    "Cargo.toml",     // rust
    "composer.json",  // php
    "[Mm]akefile",
    ".ds.toml",
];

/// A configuration file and everything parsed out of it.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Path to the configuration file.
    pub path: PathBuf,

    /// Loaded configuration data.
    pub data: Value,

    /// Task definitions.
    pub tasks: Tasks,

    /// Workspace members mapped to whether they are active.
    pub members: GlobMatches,
}

impl Config {
    /// Return the config file in `start` or its parents.
    pub fn find(start: &Path, require_workspace: bool) -> ConfigResult<Config> {
        ui::debug(&format!("require_workspace={require_workspace}"));
        let pairs: Vec<(&str, &str)> =
            SEARCH_FILES.iter().map(|name| (*name, *name)).collect();
        for (_, check) in glob_parents(start, &pairs) {
            match Config::load(&check).and_then(|config| config.parse(require_workspace)) {
                Err(e) if e.is_missing() => continue, // no valid sections
                result => return result,
            }
        }
        Err(ConfigError::NotFound)
    }

    /// Try to load a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Config> {
        let parser = parsers::parser_for(path)?;
        let text = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileMissing(path.to_path_buf()))?;
        Ok(Config {
            path: path.to_path_buf(),
            data: parser.loads(&text)?,
            ..Config::default()
        })
    }

    /// Parse the workspace and task sections.
    ///
    /// When `require_workspace` is set a config without a workspace
    /// section is rejected; otherwise a config without tasks is.
    pub fn parse(mut self, require_workspace: bool) -> ConfigResult<Config> {
        let parser = parsers::parser_for(&self.path)?;

        match parser.parse_workspace(&self) {
            Ok(members) => self.members = members,
            Err(e) if e.is_missing() && !require_workspace => {}
            Err(e) => return Err(e),
        }

        match parser.parse_tasks(&self) {
            Ok(tasks) => self.tasks = tasks,
            Err(e) if e.is_missing() && require_workspace => {}
            Err(e) => return Err(e),
        }

        Ok(self)
    }

    /// Directory that contains the config file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}
