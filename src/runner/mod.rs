//! Task execution engine
//!
//! This module resolves tasks against overrides, checks the dependency
//! graph, finds project environments, and runs commands in the shell.

pub mod graph;
pub mod interpolate;
pub mod project;
pub mod run;
pub mod shell;
pub mod task;

// Re-export main types
pub use graph::check_cycles;
pub use interpolate::interpolate_args;
pub use project::find_project;
pub use run::Runner;
pub use task::{print_tasks, EnvMap, Task, Tasks};
