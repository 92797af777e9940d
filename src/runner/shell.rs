//! Shell process execution
//!
//! Spawns resolved task commands in the user's shell, sequentially or
//! in parallel, and cleans up stray children.

use std::collections::BTreeMap;
use std::env;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command};
use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ExecutionError, Result};
use crate::runner::task::Task;
use crate::ui;

/// Shell used when the environment does not name one.
const DEFAULT_SHELL: &str = "/bin/sh";

/// How long to wait after asking a child to terminate.
const CLEANUP_WAIT: Duration = Duration::from_secs(3);

static IGNORE_INTERRUPTS: Once = Once::new();

/// Ignore CTRL+C in this process so children handle it first.
fn ignore_interrupts() {
    IGNORE_INTERRUPTS.call_once(|| unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
    });
}

/// The full environment for a resolved task.
///
/// Starts from the process environment, then applies `env` and
/// `env_hidden`.
pub fn combined_env(resolved: &Task) -> BTreeMap<String, String> {
    let mut combined: BTreeMap<String, String> = env::vars().collect();
    combined.extend(resolved.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    combined.extend(
        resolved
            .env_hidden
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    combined
}

/// Build the shell invocation for a resolved task.
fn shell_command(resolved: &Task) -> Command {
    let combined = combined_env(resolved);
    let shell = combined
        .get("SHELL")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SHELL.to_string());

    let mut command = Command::new(shell);
    command.arg("-c").arg(&resolved.cmd);
    if let Some(cwd) = &resolved.cwd {
        command.current_dir(cwd);
    }
    command.env_clear();
    command.envs(&combined);

    // Children must not inherit the ignored CTRL+C disposition.
    unsafe {
        command.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            Ok(())
        });
    }
    command
}

/// Run a resolved task and wait for it to finish.
///
/// Records the exit code on the task. A non-zero code is an error
/// unless `keep_going` is set.
pub fn run_blocking(resolved: &mut Task) -> Result<()> {
    ignore_interrupts();
    let status = shell_command(resolved).status()?;
    match status.code() {
        Some(code) => {
            resolved.code = code;
            if code != 0 && !resolved.keep_going {
                ui::error(&format!("return code = {code}"));
                return Err(ExecutionError::CommandFailed(code).into());
            }
            Ok(())
        }
        // Killed by a signal, usually CTRL+C.
        None => Err(ExecutionError::Interrupted.into()),
    }
}

/// Start a resolved task without waiting for it.
pub fn spawn(resolved: &Task) -> Result<Child> {
    ignore_interrupts();
    let child = shell_command(resolved).spawn()?;
    Ok(child)
}

/// Wait for every spawned process to finish.
pub fn join(processes: &mut Vec<Child>) {
    for child in processes.iter_mut() {
        let _ = child.wait();
    }
    processes.clear();
}

/// Terminate children that are still running, forcefully if needed.
pub fn cleanup(processes: &mut Vec<Child>) {
    ui::debug("cleaning up child processes");
    for child in processes.iter_mut() {
        if matches!(child.try_wait(), Ok(Some(_))) {
            continue;
        }
        unsafe {
            libc::kill(child.id() as i32, libc::SIGTERM);
        }
        if !wait_timeout(child, CLEANUP_WAIT) {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
    processes.clear();
}

/// Wait for a child to exit, up to `timeout`.
fn wait_timeout(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(_) => return true,
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(100));
    }
}
