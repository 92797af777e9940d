//! Task resolution and dispatch
//!
//! The runner merges caller overrides into each task, runs hooks and
//! dependencies, dispatches composite steps by name, and falls back to
//! running the command in the shell.

use std::process::Child;

use crate::cli::Args;
use crate::env::read_env_file;
use crate::error::{ConfigError, Result};
use crate::runner::interpolate::interpolate_args;
use crate::runner::shell;
use crate::runner::task::{EnvMap, Task, Tasks};
use crate::search::glob_names;
use crate::syntax::GLOB_DELIMITER;
use crate::ui;

/// Runs tasks with overrides.
#[derive(Debug, Default)]
pub struct Runner {
    /// Command-line arguments.
    pub args: Args,

    /// Mapping of names to tasks.
    pub tasks: Tasks,

    /// Subprocesses started in parallel.
    pub processes: Vec<Child>,
}

impl Runner {
    pub fn new(args: Args, tasks: Tasks) -> Self {
        Runner {
            args,
            tasks,
            processes: Vec::new(),
        }
    }

    /// Run `task`, overriding parts of it with `overrides`.
    ///
    /// `overrides` carries the caller's replacement values: command-line
    /// flags for the root call, the parent's resolved state below that.
    pub fn run(&mut self, task: &Task, overrides: &Task) -> Result<i32> {
        let mut env_from_file = EnvMap::new();
        if let Some(env_file) = &task.env_file {
            if !env_file.exists() {
                return Err(ConfigError::MissingEnvFile(env_file.clone()).into());
            }
            ui::debug(&format!("Reading env-file: {}", env_file.display()));
            env_from_file = read_env_file(env_file)?;
        }

        let mut resolved = overrides.clone();
        resolved.args = [task.args.as_slice(), overrides.args.as_slice()].concat();
        resolved.cwd = overrides.cwd.clone().or_else(|| task.cwd.clone());

        resolved.env = overrides.env.clone();
        resolved.env.extend(task.env.clone());

        resolved.env_hidden = overrides.env_hidden.clone();
        resolved.env_hidden.extend(overrides.env.clone());
        resolved.env_hidden.extend(env_from_file);
        resolved.env_hidden.extend(task.env.clone());

        // Kept for display so the printed invocation matches the run.
        resolved.env_file = overrides.env_file.clone().or_else(|| task.env_file.clone());
        resolved.keep_going = overrides.keep_going || task.keep_going;
        resolved.parallel = overrides.parallel || task.parallel;

        self.run_pre_post(task, &resolved, "pre")?;

        for dep in &task.depends {
            // Dependency codes are not kept; they fail on their own.
            self.run(dep, &resolved)?;
        }

        if task.cmd.trim().is_empty() {
            return self.run_pre_post(task, &resolved, "post");
        }

        if let Some(code) = self.run_composite(task, &resolved)? {
            if code != 0 {
                return Ok(code);
            }
            return self.run_pre_post(task, &resolved, "post");
        }

        resolved.cmd = interpolate_args(
            &format!("{}{}", overrides.cmd, task.cmd),
            &resolved.args,
        )?;
        self.run_in_shell(task, &mut resolved)?;
        if resolved.code != 0 {
            return Ok(resolved.code);
        }
        self.run_pre_post(task, &resolved, "post")
    }

    /// Run a composite step by dispatching to the tasks it names.
    ///
    /// Returns `None` when nothing matched and the step should go to
    /// the shell instead.
    fn run_composite(&mut self, task: &Task, overrides: &Task) -> Result<Option<i32>> {
        if !task.is_composite() {
            return Ok(None);
        }

        let words = match shell_words::split(&task.cmd) {
            Ok(words) if !words.is_empty() => words,
            _ => return Ok(None),
        };
        let (cmd, rest) = (words[0].as_str(), &words[1..]);

        let patterns: Vec<&str> = cmd.split(GLOB_DELIMITER).collect();
        let names = glob_names(self.tasks.names(), &patterns);

        let mut matched = false;
        let mut code = 0;
        for name in names {
            let Some(other) = self.tasks.get(&name).cloned() else {
                continue;
            };
            // A task may shadow its own command name (`ls = "ls"`); it
            // must not dispatch to itself or back to its caller.
            if other == *task || other.depends.contains(task) {
                continue;
            }

            matched = true;
            let mut dispatch = overrides.clone();
            dispatch.args = rest
                .iter()
                .cloned()
                .chain(overrides.args.iter().cloned())
                .collect();
            code = self.run(&other, &dispatch)?;
        }

        if matched {
            Ok(Some(code))
        } else {
            Ok(None)
        }
    }

    /// Run a pre- or post- hook for `task` if one is defined.
    fn run_pre_post(&mut self, task: &Task, overrides: &Task, pre_post: &str) -> Result<i32> {
        let enabled = match pre_post {
            "pre" => self.args.pre,
            _ => self.args.post,
        };
        if task.name.is_empty() || task.is_composite() || !enabled {
            return Ok(0);
        }

        let name = &task.name;
        let checks = [
            format!("{pre_post}{name}"),
            format!("{pre_post}_{name}"),
            format!("{pre_post}-{name}"),
        ];
        for check in checks {
            ui::debug(&format!("check {check}"));
            if let Some(hook) = self.tasks.get(&check).cloned() {
                ui::debug(&format!("EXPERIMENTAL: Running --{pre_post} task {check}"));
                return self.run(&hook, overrides);
            }
        }
        Ok(0)
    }

    /// Run the resolved task in the shell.
    fn run_in_shell(&mut self, task: &Task, resolved: &mut Task) -> Result<()> {
        let dry_run = self.args.dry_run;
        task.pprint_resolved(resolved, dry_run);
        if dry_run {
            return Ok(());
        }

        if resolved.parallel {
            if self.processes.is_empty() {
                ui::warn("EXPERIMENTAL: running tasks in parallel");
            }
            let child = shell::spawn(resolved)?;
            self.processes.push(child);
        } else {
            shell::run_blocking(resolved)?;
        }
        Ok(())
    }

    /// Wait for every process started in parallel.
    pub fn join(&mut self) {
        shell::join(&mut self.processes);
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        shell::cleanup(&mut self.processes);
    }
}
