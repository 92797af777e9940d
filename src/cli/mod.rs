//! Command-line interface
//!
//! Argument parsing and the main entry point.

pub mod app;
pub mod args;

pub use app::main;
pub use args::{Args, USAGE};
