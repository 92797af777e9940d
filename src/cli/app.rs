//! Main entry point
//!
//! Wires arguments, config discovery, and the runner together, and
//! fans tasks out across workspace members.

use std::env;
use std::path::{Path, PathBuf};

use crate::cli::args::{Args, USAGE};
use crate::config::Config;
use crate::env::{pushd, TempEnv};
use crate::error::{ConfigError, DsError, ExecutionError, Result};
use crate::runner::{check_cycles, find_project, print_tasks, Runner, Tasks};
use crate::search::{glob_paths, GlobMatches, GlobOptions};
use crate::syntax::ENV_FILE_MARKER;
use crate::ui;
use crate::VERSION;

/// Main entry point.
///
/// `argv` includes the program name; workspace members re-enter here
/// with an argv rebuilt by [`Args::to_argv`].
pub fn main(argv: &[String]) -> Result<()> {
    let mut args = Args::parse(argv.get(1..).unwrap_or_default())?;

    if args.debug {
        ui::set_debug(true);
        ui::debug(&format!("{args:?}"));
    }

    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    if args.version {
        println!("{VERSION}");
        return Ok(());
    }

    let mut tasks = Tasks::default();
    if args.no_config {
        ui::debug("Not loading config. To enable: remove --no-config");
        if !args.workspace.is_empty() {
            return Err(DsError::Usage(
                "Cannot use --workspace together with --no-config.".to_string(),
            ));
        }
        if args.list {
            return Err(DsError::Usage(
                "Cannot use --list together with --no-config.".to_string(),
            ));
        }
    } else {
        ui::debug("Loading config. To disable: add --no-config");
        let config = load_config(&mut args)?;
        // --workspace comes first so that `ds -w*` is roughly equal to
        // `ds --workspace '*' 'ds --list'`
        if !args.workspace.is_empty() {
            return run_workspace(&args, &config);
        }
        if args.list {
            print_tasks(&config.path, &config.tasks);
            return Ok(());
        }
        tasks = config.tasks;
    }

    let task = args.task.clone();
    let mut runner = Runner::new(args, tasks);
    {
        let mut scope = TempEnv::new();
        match &runner.args.file {
            Some(file) => scope.set(ENV_FILE_MARKER, &file.display().to_string()),
            None => scope.remove(ENV_FILE_MARKER),
        }
        let _dir = pushd(runner.args.cwd.as_deref().unwrap_or(Path::new(".")))?;
        let overrides = find_project(&runner.args, &task);
        runner.run(&task, &overrides)?;
    }
    runner.join();
    Ok(())
}

/// Load the configuration file and fill in `args.file` and `args.cwd`.
fn load_config(args: &mut Args) -> Result<Config> {
    if args.file.is_none() {
        if let Ok(path) = env::var(ENV_FILE_MARKER) {
            if !path.is_empty() {
                ui::debug(&format!("Setting --file to ${ENV_FILE_MARKER} = {path}"));
                args.file = Some(PathBuf::from(path));
            }
        }
    }

    let require_workspace = !args.workspace.is_empty();
    let config = match &args.file {
        Some(file) => {
            if !file.exists() {
                return Err(ConfigError::FileMissing(file.clone()).into());
            }
            Config::load(file)?.parse(require_workspace)?
        }
        None => {
            let config = Config::find(&env::current_dir()?, require_workspace)?;
            args.file = Some(config.path.clone());
            config
        }
    };

    check_cycles(&config.tasks)?;

    if args.cwd.is_none() {
        args.cwd = config.path.parent().map(Path::to_path_buf);
    }
    if let Some(cwd) = &args.cwd {
        if !cwd.exists() {
            return Err(ConfigError::DirectoryMissing(cwd.clone()).into());
        }
    }
    Ok(config)
}

/// Run the command-line tasks in each matching workspace member.
fn run_workspace(args: &Args, config: &Config) -> Result<()> {
    // reset the config's selection, then apply the --workspace patterns
    let previous: GlobMatches = config
        .members
        .included()
        .map(|path| (path.to_path_buf(), false))
        .collect();
    let patterns: Vec<&str> = args.workspace.iter().map(String::as_str).collect();
    let options = GlobOptions {
        allow_all: true,
        allow_excludes: true,
        allow_new: false,
    };
    let members = glob_paths(config.dir(), &patterns, options, Some(previous));

    let file_name = config
        .path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    for member in members.included() {
        let mut member_args = args.clone();
        member_args.cwd = None;
        member_args.workspace.clear();

        // try a config with the same name in the member
        let member_config = member.join(&file_name);
        member_args.file = member_config.exists().then_some(member_config);

        let mut scope = TempEnv::new();
        scope.remove(ENV_FILE_MARKER);
        let _dir = pushd(member)?;

        let argv = member_args.to_argv();
        println!("$ pushd {}", member.display());
        println!("$ {}", shell_words::join(&argv));
        match main(&argv) {
            Err(err @ DsError::Execution(ExecutionError::Interrupted)) => return Err(err),
            Err(err) => {
                if !err.is_reported() {
                    ui::error(&err.to_string());
                }
            }
            Ok(()) => println!(),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn argv(line: &str) -> Vec<String> {
        shell_words::split(line).unwrap()
    }

    #[test]
    fn test_help_and_version() {
        assert!(main(&argv("ds --help")).is_ok());
        assert!(main(&argv("ds --version")).is_ok());
    }

    #[test]
    fn test_no_config_guards() {
        let err = main(&argv("ds --no-config --list")).unwrap_err();
        assert!(err.to_string().contains("--list"));

        let err = main(&argv("ds --no-config -w '*' build")).unwrap_err();
        assert!(err.to_string().contains("--workspace"));
    }

    #[test]
    fn test_load_config_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ds.toml");
        fs::write(&path, "[scripts]\nbuild = 'cargo build'\n").unwrap();

        let mut args = Args {
            file: Some(path.clone()),
            ..Args::default()
        };
        let config = load_config(&mut args).unwrap();
        assert!(config.tasks.contains("build"));
        assert_eq!(args.cwd.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_config_missing_file() {
        let mut args = Args {
            file: Some(PathBuf::from("no-such-config.toml")),
            ..Args::default()
        };
        let err = load_config(&mut args).unwrap_err();
        assert!(err.to_string().contains("Cannot find file:"));
    }

    #[test]
    fn test_load_config_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ds.toml");
        fs::write(&path, "[scripts]\nbuild = 'cargo build'\n").unwrap();

        let mut args = Args {
            file: Some(path),
            cwd: Some(dir.path().join("no-such-dir")),
            ..Args::default()
        };
        let err = load_config(&mut args).unwrap_err();
        assert!(err.to_string().contains("Cannot find directory:"));
    }

    #[test]
    fn test_load_config_detects_cycles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ds.toml");
        fs::write(&path, "[scripts]\na = ['b']\nb = ['a']\n").unwrap();

        let mut args = Args {
            file: Some(path),
            ..Args::default()
        };
        let err = load_config(&mut args).unwrap_err();
        assert!(err.to_string().contains("Task cycle detected"));
    }

    #[test]
    fn test_load_config_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ds.toml");
        fs::write(&path, "[scripts]\nbuild = 'cargo build'\n").unwrap();

        let mut scope = TempEnv::new();
        scope.set(ENV_FILE_MARKER, &path.display().to_string());

        let mut args = Args::default();
        let config = load_config(&mut args).unwrap();
        assert_eq!(args.file.as_ref(), Some(&path));
        assert!(config.tasks.contains("build"));
    }
}
