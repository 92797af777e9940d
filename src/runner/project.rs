//! Project-specific environment detection
//!
//! Looks in parent directories for Python virtual environments and
//! Node module binaries so tasks run with the right tools available.

use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::runner::task::Task;
use crate::search;
use crate::ui;

/// Return the command for activating a virtual environment.
///
/// See: https://docs.python.org/3/library/venv.html#how-venvs-work
pub fn venv_activate_cmd(venv: &Path) -> String {
    let shell = env::var("SHELL").unwrap_or_default();
    let default = format!("source {};", venv.join("bin").join("activate").display());

    if shell.contains("bash") || shell.contains("zsh") {
        return default;
    }
    if shell.contains("fish") {
        return format!("source {};", venv.join("bin").join("activate.fish").display());
    }
    if shell.contains("csh") {
        return format!("source {};", venv.join("bin").join("activate.csh").display());
    }

    // Detecting PowerShell is not great.
    // See: https://stackoverflow.com/a/55598796/
    let is_powershell = env::var("PSModulePath")
        .map(|paths| paths.split(':').count() >= 3)
        .unwrap_or(false);
    if is_powershell {
        return format!("source {};", venv.join("bin").join("Activate.ps1").display());
    }
    default
}

/// Find project-specific dependencies starting from the current directory.
pub fn find_project(args: &Args, task: &Task) -> Task {
    find_project_in(args, task, Path::new("."))
}

/// Find project-specific dependencies starting from `start`.
pub fn find_project_in(args: &Args, task: &Task, start: &Path) -> Task {
    let mut result = task.clone();
    if args.no_project {
        ui::debug("Not searching for project dependencies. To enable: remove --no-project");
        return result;
    }
    ui::info("Searching for project dependencies. To disable: add --no-project");

    let mut to_find: Vec<(&str, &str)> = Vec::new();

    // Only the `VIRTUAL_ENV` variable counts as an active environment;
    // `uvx` and `pipx` keep us isolated but do not set it.
    match env::var("VIRTUAL_ENV") {
        Ok(venv) => ui::debug(&format!("[python] venv detected: {venv}")),
        Err(_) => {
            ui::debug("[python] No venv detected; searching for */pyvenv.cfg");
            to_find.push(("python_venv", "*/pyvenv.cfg"));
        }
    }

    ui::debug("[node] searching for node_modules/.bin");
    to_find.push(("node_modules", "node_modules/.bin"));

    let mut found: Vec<(String, PathBuf)> = Vec::new();
    for (key, item) in search::glob_parents(start, &to_find) {
        if !found.iter().any(|(k, _)| *k == key) {
            found.push((key, item));
        }
        if found.len() == to_find.len() {
            break;
        }
    }

    let lookup = |name: &str| {
        found
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, path)| path.clone())
    };

    if let Some(venv) = lookup("python_venv").as_deref().and_then(Path::parent) {
        ui::debug(&format!("[python] found: {}", venv.display()));
        result.cmd = format!("{}\n{}", venv_activate_cmd(venv), task.cmd);
    }

    if let Some(node_bin) = lookup("node_modules") {
        ui::debug(&format!("[node] found: {}", node_bin.display()));
        let prev = result
            .env
            .get("PATH")
            .cloned()
            .or_else(|| env::var("PATH").ok())
            .unwrap_or_default();
        let node_bin = node_bin.display().to_string();
        if !prev.contains(&node_bin) {
            let sep = if prev.is_empty() { "" } else { ":" };
            result
                .env_hidden
                .insert("PATH".to_string(), format!("{node_bin}{sep}{prev}"));
        }
    }

    result
}
