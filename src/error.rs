//! Error types for ds

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ds operations
pub type Result<T> = std::result::Result<T, DsError>;

/// Main error type for ds
#[derive(Error, Debug)]
pub enum DsError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Argument interpolation errors
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Environment file errors
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),

    /// Command-line usage errors
    #[error("{0}")]
    Usage(String),
}

impl DsError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DsError::Execution(ExecutionError::CommandFailed(code)) => *code,
            DsError::Execution(ExecutionError::Interrupted) => 0,
            _ => 1,
        }
    }

    /// Whether the failure site already printed a diagnostic.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            DsError::Execution(ExecutionError::CommandFailed(_))
                | DsError::Execution(ExecutionError::Interrupted)
        )
    }
}

/// Configuration discovery and parsing errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No valid configuration file found.")]
    NotFound,

    #[error("Cannot find file: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("Cannot find directory: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("Not sure how to read file: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("Missing '{key}' key in {}", .path.display())]
    MissingKey { key: String, path: PathBuf },

    #[error("Missing tasks key in {}", .0.display())]
    NoTaskSection(PathBuf),

    #[error("Missing workspace key in {}", .0.display())]
    NoWorkspaceSection(PathBuf),

    #[error("{0}")]
    Unsupported(String),

    #[error("{detail} for '{name}' in {}", .path.display())]
    UnknownTaskShape {
        name: String,
        detail: String,
        path: PathBuf,
    },

    #[error("'{name}' uses `call` task outside of `pyproject.toml`: {}", .path.display())]
    CallOutsidePyproject { name: String, path: PathBuf },

    #[error("{name} cannot contain '{key}' and its alias '{alias}': {}", .path.display())]
    AliasConflict {
        name: String,
        key: String,
        alias: String,
        path: PathBuf,
    },

    #[error("Cannot find env-file: {}", .0.display())]
    MissingEnvFile(PathBuf),

    #[error("Task cycle detected: {}", .0.join(" => "))]
    Cycle(Vec<String>),

    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Whether this error means a parser found nothing to parse.
    ///
    /// Format parsers are tried in order; these errors move on to the
    /// next candidate instead of stopping the search.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            ConfigError::MissingKey { .. }
                | ConfigError::NoTaskSection(_)
                | ConfigError::NoWorkspaceSection(_)
                | ConfigError::Unsupported(_)
                | ConfigError::UnknownFormat(_)
        )
    }
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("return code = {0}")]
    CommandFailed(i32),

    /// A child died from a signal (usually CTRL+C); treated as soft cancel.
    #[error("interrupted")]
    Interrupted,
}

/// Argument interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Not enough arguments provided: ${0}")]
    MissingArgument(usize),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;
