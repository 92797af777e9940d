//! Task model and pretty-printing
//!
//! Tasks come from config-file parsers or from the command line and are
//! resolved against caller overrides when run.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::syntax::{TASK_COMPOSITE, TASK_KEEP_GOING};
use crate::ui;

/// Environment variables for a task.
pub type EnvMap = BTreeMap<String, String>;

/// A thing to be done.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    /// File from which this task came.
    pub origin: Option<PathBuf>,

    /// Key under which this task was found.
    pub origin_key: String,

    /// Task name. Empty for anonymous tasks; composite steps use a
    /// reserved sentinel and are resolved by name at run time.
    pub name: String,

    /// Task description.
    pub help: String,

    /// Whether to print the command exactly as written.
    pub verbatim: bool,

    /// Tasks to run before this one.
    pub depends: Vec<Task>,

    /// Shell command to run after `depends`.
    pub cmd: String,

    /// Return code from running this task.
    pub code: i32,

    // args, cwd, env, env_file, keep_going, and parallel may be
    // overridden by the CLI or by a calling composite step.
    /// Additional arguments interpolated into `cmd`.
    pub args: Vec<String>,

    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables.
    pub env: EnvMap,

    /// Environment variables that are set but not displayed.
    pub env_hidden: EnvMap,

    /// File of environment variables, read when the task runs.
    pub env_file: Option<PathBuf>,

    /// Keep going even if this task returns a non-zero code.
    pub keep_going: bool,

    /// Run without waiting for the result.
    pub parallel: bool,
}

impl Task {
    /// Whether this is a composite step resolved by name at run time.
    pub fn is_composite(&self) -> bool {
        self.name == TASK_COMPOSITE
    }

    /// Parse a single command-line task spec like `+build`.
    pub fn from_spec(spec: &str) -> Task {
        let mut task = Task::default();
        match spec.strip_prefix(TASK_KEEP_GOING) {
            Some(cmd) => {
                task.keep_going = true;
                task.cmd = cmd.to_string();
            }
            None => task.cmd = spec.to_string(),
        }
        task
    }

    /// Build the anonymous root task for the command line.
    ///
    /// Each spec becomes a composite step so that names are resolved
    /// against the loaded tasks when run.
    pub fn from_cli(specs: &[String]) -> Task {
        let mut root = Task::default();
        for spec in specs {
            let mut step = Task::from_spec(spec);
            step.name = TASK_COMPOSITE.to_string();
            root.depends.push(step);
        }
        root
    }

    /// Return a shell representation of invoking this task.
    ///
    /// `resolved` supplies the overridable fields; pass the task itself
    /// when there is no resolved override.
    pub fn as_args(&self, resolved: &Task) -> String {
        let mut argv = vec!["ds".to_string()];

        if let Some(cwd) = resolved.cwd.as_ref().or(self.cwd.as_ref()) {
            argv.push("--cwd".to_string());
            argv.push(cwd.display().to_string());
        }
        if let Some(env_file) = resolved.env_file.as_ref().or(self.env_file.as_ref()) {
            argv.push("--env-file".to_string());
            argv.push(env_file.display().to_string());
        }

        let env = if resolved.env.is_empty() {
            &self.env
        } else {
            &resolved.env
        };
        for (key, value) in env {
            argv.push("-e".to_string());
            argv.push(format!("{key}={value}"));
        }

        let prefix = if resolved.keep_going || self.keep_going {
            TASK_KEEP_GOING
        } else {
            ""
        };
        if self.is_composite() {
            argv.push(format!("{prefix}{}", self.cmd));
        } else if !self.name.is_empty() {
            argv.push(format!("{prefix}{}", self.name));
        }

        shell_words::join(&argv)
    }

    /// Pretty-print this task for a listing.
    pub fn pprint(&self) {
        if !self.help.is_empty() {
            println!("# {}", self.help);
        }
        println!("> {}", ui::wrap_cmd(&self.as_args(self)));
        if !self.depends.is_empty() {
            let steps: Vec<String> = self
                .depends
                .iter()
                .map(|step| {
                    let prefix = if step.keep_going { TASK_KEEP_GOING } else { "" };
                    format!("{prefix}{}", step.cmd)
                })
                .collect();
            println!("{steps:?}");
        }
        if !self.cmd.is_empty() {
            if self.verbatim {
                println!("$ {}", self.cmd.trim().replace('\n', "\n$ "));
            } else {
                println!("$ {}", ui::wrap_cmd(&self.cmd));
            }
        }
        println!();
    }

    /// Print how this task is about to run.
    pub fn pprint_resolved(&self, resolved: &Task, dry_run: bool) {
        let dry_prefix = if dry_run { "[DRY RUN]\n" } else { "" };
        println!("\n{dry_prefix}> {}", ui::wrap_cmd(&self.as_args(resolved)));
        if self.verbatim {
            println!("$ {}", resolved.cmd.trim().replace('\n', "\n$ "));
        } else {
            println!("$ {}", ui::wrap_cmd(&resolved.cmd));
        }
    }
}

/// Mapping of names to tasks, in definition order.
///
/// Redefining a name replaces the task but keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct Tasks(Vec<(String, Task)>);

impl Tasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn insert(&mut self, name: String, task: Task) {
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = task,
            None => self.0.push((name, task)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Task> {
        self.0.iter().map(|(_, t)| t)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.0.iter_mut().map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t))
    }
}

impl FromIterator<(String, Task)> for Tasks {
    fn from_iter<T: IntoIterator<Item = (String, Task)>>(iter: T) -> Self {
        let mut tasks = Tasks::new();
        for (name, task) in iter {
            tasks.insert(name, task);
        }
        tasks
    }
}

/// Pretty-print all task names and commands.
pub fn print_tasks(path: &Path, tasks: &Tasks) {
    let count = tasks.len();
    let plural = if count != 1 { "s" } else { "" };

    let abs = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string();
    let rel = env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).map(|p| p.display().to_string()).ok())
        .unwrap_or_else(|| abs.clone());
    let location = if abs.len() < rel.len() { &abs } else { &rel };

    println!("# Found {count} task{plural} in {location}\n");
    for task in tasks.values() {
        task.pprint();
    }
}
