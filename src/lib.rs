//! ds - Run dev scripts
//!
//! ds finds tasks in `ds.toml`, `pyproject.toml`, `package.json`,
//! `Cargo.toml`, `composer.json`, and `Makefile` files and runs them,
//! with argument interpolation, error suppression, and workspaces.

// Public modules
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod runner;
pub mod search;
pub mod syntax;
pub mod ui;

// Re-export commonly used types
pub use error::{DsError, Result};

/// Current version of ds
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
