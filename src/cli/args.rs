//! Command-line argument parsing
//!
//! The leading options are parsed by `clap`; everything from the first
//! task name onward is grouped by hand into per-task argument lists
//! following the grammar in [`USAGE`].

use std::env;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use crate::env::read_env_file;
use crate::error::{ConfigError, DsError, Result};
use crate::runner::{EnvMap, Task};
use crate::syntax::{ARG_BEG, ARG_END, ARG_OPTION, TASK_KEEP_GOING};

/// Usage message in the style of `docopt`.
pub const USAGE: &str = r#"ds: Run dev scripts.

Usage: ds [--help | --version] [--debug]
          [--dry-run]
          [--list]
          [--no-config]
          [--no-project]
          [--parallel] [--pre] [--post]
          [--cwd PATH]
          [--file PATH]
          [--env-file PATH]
          [(--env NAME=VALUE)...]
          [--workspace GLOB]...
          [<task>[: <options>... --]...]

Options:
  -h, --help
    Show this message and exit.

  --version
    Show program version and exit.

  --debug
    Show debug messages.

  --cwd PATH
    Set the starting working directory (default: --file parent).
    PATH is resolved relative to the current working directory.

  --dry-run
    Show which tasks would be run, but don't actually run them.

  --env-file PATH
    File with environment variables. This file is read before --env
    values are applied.

  -e NAME=VALUE, --env NAME=VALUE
    Set one or more environment variables. Supersedes any values set in
    an `--env-file`.

  -f PATH, --file PATH
    File with task and workspace definitions (default: search in parents).

    Read more about the configuration file:
    https://github.com/metaist/ds

  -l, --list
    List available tasks and exit.

  --no-config
    Do not search for or load a configuration file. Only tasks defined
    on the command-line can be run.

  --no-project
    Do not search for project dependencies, e.g. `node_modules` or
    `.venv`, when running tasks.

  --parallel
    EXPERIMENTAL: Run the tasks given on the command-line in parallel.

  --pre, --post
    EXPERIMENTAL: Run tasks with `pre` and `post` prefixes, if they
    exist, before and after each task.

  -w GLOB, --workspace GLOB
    Patterns which indicate in which workspaces to run tasks.

    GLOB filters the list of workspaces defined in `--file`.
    The special pattern '*' matches all of the workspaces.

    Read more about configuring workspaces:
    https://github.com/metaist/ds#workspaces

  <task>[: <options>... --]
    One or more tasks to run with task-specific arguments.

    Use a colon (`:`) to indicate start of arguments and
    double-dash (`--`) to indicate the end.

    If the first <option> starts with a hyphen (`-`), you may omit the
    colon (`:`). If there are no more tasks after the last option, you
    may omit the double-dash (`--`).

    Tasks are executed in order across any relevant workspaces. If any
    task returns a non-zero code, task execution stops unless the
    <task> was prefixed with a (`+`) in which case execution continues.

    Read more about error suppression:
    https://github.com/metaist/ds#error-suppression

Examples:
List the available tasks:
$ ds

Run one or more tasks:
$ ds build
$ ds clean build

If a task fails, subsequent tasks are not run unless errors are suppressed:
$ ds +lint test

will run `test` even if `lint` fails.

Provide arguments to one or more tasks (the following are equivalent):
$ ds clean --all -- build test --no-gpu
$ ds clean --all && ds build && ds test --no-gpu
"#;

/// Options that take no value.
const FLAGS: &[&str] = &[
    "-h",
    "--help",
    "--version",
    "--debug",
    "--dry-run",
    "-l",
    "--list",
    "--no-config",
    "--no-project",
    "--parallel",
    "--pre",
    "--post",
];

/// Options that take a value.
const VALUE_FLAGS: &[&str] = &[
    "--cwd",
    "--env-file",
    "-e",
    "--env",
    "-f",
    "--file",
    "-w",
    "--workspace",
];

/// Parsed command-line arguments.
#[derive(Clone, Debug, Default)]
pub struct Args {
    /// Whether to show the usage.
    pub help: bool,

    /// Whether to show the version.
    pub version: bool,

    /// Whether to show debug messages.
    pub debug: bool,

    /// Whether to skip actually running tasks.
    pub dry_run: bool,

    /// Whether to show available tasks.
    pub list: bool,

    /// Whether to skip loading any config file.
    pub no_config: bool,

    /// Whether to skip searching for project dependencies.
    pub no_project: bool,

    /// Whether to run command-line tasks in parallel.
    pub parallel: bool,

    /// Whether to run `pre` tasks.
    pub pre: bool,

    /// Whether to run `post` tasks.
    pub post: bool,

    /// Path to run tasks in.
    pub cwd: Option<PathBuf>,

    /// Environment variable overrides.
    pub env: EnvMap,

    /// Path to environment variables.
    pub env_file: Option<PathBuf>,

    /// Path to task definitions.
    pub file: Option<PathBuf>,

    /// List of workspace patterns to run tasks in.
    pub workspace: Vec<String>,

    /// A composite task for the tasks given on the command-line.
    pub task: Task,
}

impl Args {
    /// Parse command-line arguments in a docopt-like way.
    pub fn parse(argv: &[String]) -> Result<Args> {
        let (ours, rest) = split_options(argv);
        let matches = command()
            .try_get_matches_from(ours)
            .map_err(usage_error)?;

        let mut args = Args {
            help: matches.get_flag("help"),
            version: matches.get_flag("version"),
            debug: matches.get_flag("debug"),
            dry_run: matches.get_flag("dry_run"),
            list: matches.get_flag("list"),
            no_config: matches.get_flag("no_config"),
            no_project: matches.get_flag("no_project"),
            parallel: matches.get_flag("parallel"),
            pre: matches.get_flag("pre"),
            post: matches.get_flag("post"),
            cwd: matches.get_one::<String>("cwd").map(|p| resolve(p)),
            env_file: matches.get_one::<String>("env_file").map(|p| resolve(p)),
            file: matches.get_one::<String>("file").map(|p| resolve(p)),
            workspace: matches
                .get_many::<String>("workspace")
                .unwrap_or_default()
                .cloned()
                .collect(),
            ..Args::default()
        };

        for pair in matches.get_many::<String>("env").unwrap_or_default() {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| DsError::Usage(format!("Expected NAME=VALUE for --env: {pair}")))?;
            args.env.insert(key.to_string(), value.to_string());
        }

        args.task = Task::from_cli(&group_tasks(rest));
        args.task.cwd = args.cwd.clone();
        args.task.parallel = args.parallel;

        let mut env = args.env.clone();
        if let Some(env_file) = &args.env_file {
            if !env_file.exists() {
                return Err(ConfigError::MissingEnvFile(env_file.clone()).into());
            }
            env = read_env_file(env_file)?;
            env.extend(args.env.clone());
        }
        args.task.env = env;

        if !args.help && !args.version && args.task.depends.is_empty() {
            // default action
            args.list = true;
        }
        Ok(args)
    }

    /// Reconstruct an equivalent argv, e.g. for running in a workspace member.
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = vec!["ds".to_string()];
        for (flag, on) in [
            ("--help", self.help),
            ("--version", self.version),
            ("--debug", self.debug),
            ("--dry-run", self.dry_run),
            ("--list", self.list),
            ("--no-config", self.no_config),
            ("--no-project", self.no_project),
            ("--parallel", self.parallel),
            ("--pre", self.pre),
            ("--post", self.post),
        ] {
            if on {
                argv.push(flag.to_string());
            }
        }
        if let Some(cwd) = &self.cwd {
            argv.push("--cwd".to_string());
            argv.push(cwd.display().to_string());
        }
        if let Some(env_file) = &self.env_file {
            argv.push("--env-file".to_string());
            argv.push(env_file.display().to_string());
        }
        if let Some(file) = &self.file {
            argv.push("--file".to_string());
            argv.push(file.display().to_string());
        }
        for pattern in &self.workspace {
            argv.push("--workspace".to_string());
            argv.push(pattern.clone());
        }
        for (key, value) in &self.env {
            argv.push("--env".to_string());
            argv.push(format!("{key}={value}"));
        }
        for step in &self.task.depends {
            let words =
                shell_words::split(&step.cmd).unwrap_or_else(|_| vec![step.cmd.clone()]);
            let Some((name, options)) = words.split_first() else {
                continue;
            };
            let prefix = if step.keep_going { TASK_KEEP_GOING } else { "" };
            argv.push(format!("{prefix}{name}"));
            argv.push(ARG_BEG.to_string());
            argv.extend(options.iter().cloned());
            argv.push(ARG_END.to_string());
        }
        argv
    }
}

/// Build the clap command for the leading options.
fn command() -> Command {
    Command::new("ds")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .help("Show this message and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Show program version and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Show debug messages")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .help("Show which tasks would be run without running them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no_config")
                .long("no-config")
                .help("Do not search for or load a config file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no_project")
                .long("no-project")
                .help("Do not search for project dependencies")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help("Run command-line tasks in parallel")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pre")
                .long("pre")
                .help("Run tasks with a pre prefix")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("post")
                .long("post")
                .help("Run tasks with a post prefix")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cwd")
                .long("cwd")
                .value_name("PATH")
                .help("Starting working directory"),
        )
        .arg(
            Arg::new("env_file")
                .long("env-file")
                .value_name("PATH")
                .help("File with environment variables"),
        )
        .arg(
            Arg::new("env")
                .short('e')
                .long("env")
                .value_name("NAME=VALUE")
                .help("Set one or more environment variables")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("PATH")
                .help("File with task and workspace definitions"),
        )
        .arg(
            Arg::new("workspace")
                .short('w')
                .long("workspace")
                .value_name("GLOB")
                .help("Workspace patterns to run tasks in")
                .action(ArgAction::Append),
        )
}

/// Split `argv` into the leading options and the task region.
fn split_options(argv: &[String]) -> (&[String], &[String]) {
    let mut end = 0;
    while end < argv.len() {
        let arg = argv[end].as_str();
        if FLAGS.contains(&arg) {
            end += 1;
        } else if VALUE_FLAGS.contains(&arg) {
            end = (end + 2).min(argv.len());
        } else if has_attached_value(arg) {
            end += 1;
        } else {
            break;
        }
    }
    argv.split_at(end)
}

/// Check for `--file=PATH` and `-w*` style options.
fn has_attached_value(arg: &str) -> bool {
    for flag in VALUE_FLAGS {
        if let Some(rest) = arg.strip_prefix(flag) {
            if flag.starts_with("--") {
                if rest.starts_with('=') {
                    return true;
                }
            } else if !rest.is_empty() {
                return true;
            }
        }
    }
    false
}

/// Group the task region into one string per task.
///
/// `clean --all -- build` groups `--all` under `clean`; a colon after a
/// task name starts its arguments explicitly and `--` ends them.
fn group_tasks(argv: &[String]) -> Vec<String> {
    let mut tasks: Vec<String> = Vec::new();
    let mut task = String::new();
    let mut in_args = false;
    for arg in argv {
        let mut arg = arg.as_str();

        if !task.is_empty() && arg == ARG_BEG {
            // explicit arg start
            in_args = true;
            continue;
        }
        if arg == ARG_END {
            // explicit arg end
            task.clear();
            in_args = false;
            continue;
        }
        if !task.is_empty() && arg.starts_with(ARG_OPTION) {
            // implicit arg start
            in_args = true;
        }
        if in_args {
            if let Some(last) = tasks.last_mut() {
                last.push(' ');
                last.push_str(arg);
            }
            continue;
        }
        if let Some(name) = arg.strip_suffix(ARG_BEG) {
            // task name + explicit arg start
            arg = name;
            in_args = true;
        }
        task = arg.to_string();
        tasks.push(task.clone());
    }
    tasks
}

/// Resolve a path relative to the current working directory.
fn resolve(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    path.canonicalize().unwrap_or_else(|_| match env::current_dir() {
        Ok(cwd) => cwd.join(&path),
        Err(_) => path.clone(),
    })
}

/// Convert a clap error into a one-line usage error.
fn usage_error(err: clap::Error) -> DsError {
    let text = err.to_string();
    let line = text.lines().next().unwrap_or("invalid arguments");
    DsError::Usage(line.strip_prefix("error: ").unwrap_or(line).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(line: &str) -> Args {
        let argv = shell_words::split(line).unwrap();
        Args::parse(&argv).unwrap()
    }

    fn specs(args: &Args) -> Vec<String> {
        args.task.depends.iter().map(|t| t.cmd.clone()).collect()
    }

    #[test]
    fn test_flags() {
        let args = parse("--debug --dry-run -l");
        assert!(args.debug);
        assert!(args.dry_run);
        assert!(args.list);
        assert!(!args.help);
    }

    #[test]
    fn test_default_action_is_list() {
        assert!(parse("").list);
        assert!(!parse("build").list);
        assert!(!parse("--help").list);
        assert!(!parse("--version").list);
    }

    #[test]
    fn test_task_grouping() {
        let args = parse("clean --all -- build test --no-gpu");
        assert_eq!(specs(&args), vec!["clean --all", "build", "test --no-gpu"]);
    }

    #[test]
    fn test_task_grouping_colon() {
        let args = parse("build : --fast -- lint");
        assert_eq!(specs(&args), vec!["build --fast", "lint"]);

        // attached colon works too
        let args = parse("build: --fast --release");
        assert_eq!(specs(&args), vec!["build --fast --release"]);
    }

    #[test]
    fn test_keep_going_prefix() {
        let args = parse("+lint test");
        assert!(args.task.depends[0].keep_going);
        assert_eq!(args.task.depends[0].cmd, "lint");
        assert!(!args.task.depends[1].keep_going);
    }

    #[test]
    fn test_unknown_option_becomes_task() {
        let args = parse("--nope");
        assert_eq!(specs(&args), vec!["--nope"]);
        assert!(!args.list);
    }

    #[test]
    fn test_env_pairs() {
        let args = parse("-e A=1 --env B=2=3 build");
        assert_eq!(args.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(args.env.get("B").map(String::as_str), Some("2=3"));
        assert_eq!(args.task.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_env_requires_equals() {
        let argv = vec!["-e".to_string(), "BROKEN".to_string()];
        assert!(Args::parse(&argv).is_err());
    }

    #[test]
    fn test_env_file_feeds_task_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "FROM_FILE=1\nSHARED=file\n").unwrap();

        let argv = vec![
            "--env-file".to_string(),
            path.display().to_string(),
            "-e".to_string(),
            "SHARED=cli".to_string(),
            "build".to_string(),
        ];
        let args = Args::parse(&argv).unwrap();
        assert_eq!(args.task.env.get("FROM_FILE").map(String::as_str), Some("1"));
        assert_eq!(args.task.env.get("SHARED").map(String::as_str), Some("cli"));
    }

    #[test]
    fn test_env_file_missing() {
        let argv = vec!["--env-file".to_string(), "no-such.env".to_string()];
        assert!(Args::parse(&argv).is_err());
    }

    #[test]
    fn test_workspace_patterns() {
        let args = parse("--workspace 'members/*' -w docs build");
        assert_eq!(args.workspace, vec!["members/*", "docs"]);

        // special shorthand
        let args = parse("-w* build");
        assert_eq!(args.workspace, vec!["*"]);
    }

    #[test]
    fn test_attached_values() {
        let args = parse("--file=ds.toml --env=A=1 build");
        assert!(args.file.as_ref().unwrap().ends_with("ds.toml"));
        assert_eq!(args.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_cwd_resolved() {
        let args = parse("--cwd . build");
        assert!(args.cwd.as_ref().unwrap().is_absolute());
        assert_eq!(args.task.cwd, args.cwd);
    }

    #[test]
    fn test_to_argv_round_trip() {
        let args = parse("--debug -e A=1 clean --all -- +build");
        let argv = args.to_argv();
        assert_eq!(
            argv,
            vec![
                "ds", "--debug", "--env", "A=1", "clean", ":", "--all", "--", "+build", ":", "--"
            ]
        );

        let again = Args::parse(&argv[1..]).unwrap();
        assert_eq!(specs(&again), vec!["clean --all", "build"]);
        assert!(again.task.depends[1].keep_going);
        assert_eq!(again.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_parallel_carries_to_task() {
        let args = parse("--parallel build test");
        assert!(args.task.parallel);
    }
}
