//! End-to-end task runs through the binary

mod common;

use std::fs;

use common::{ds, write_config};
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn test_default_action_lists_tasks() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts]
build = "echo building"
test = "echo testing"
"#,
    );

    ds(&dir)
        .assert()
        .success()
        .stdout(contains("Found 2 tasks"))
        .stdout(contains("ds.toml"))
        .stdout(contains("> ds build"))
        .stdout(contains("> ds test"));
}

#[test]
fn test_run_task() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nhello = 'echo hello world'\n");

    ds(&dir)
        .arg("hello")
        .assert()
        .success()
        .stdout(contains("> ds hello"))
        .stdout(contains("hello world"));
}

#[test]
fn test_exit_code_propagates() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nfail = 'exit 4'\n");

    ds(&dir)
        .arg("fail")
        .assert()
        .failure()
        .code(4)
        .stderr(contains("return code = 4"));
}

#[test]
fn test_failure_stops_later_tasks() {
    let (dir, _) = write_config(
        "ds.toml",
        "[scripts]\nfail = 'exit 1'\nok = 'echo SHOULD-NOT-RUN'\n",
    );

    ds(&dir)
        .args(["fail", "ok"])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("SHOULD-NOT-RUN").not());
}

#[test]
fn test_keep_going_suppresses_failure() {
    let (dir, _) = write_config(
        "ds.toml",
        "[scripts]\nfail = 'exit 1'\nok = 'echo STILL-RAN'\n",
    );

    ds(&dir)
        .args(["+fail", "ok"])
        .assert()
        .success()
        .stdout(contains("STILL-RAN"))
        .stderr(contains("return code").not());
}

#[test]
fn test_dry_run_skips_execution() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nmark = 'touch ran.txt'\n");

    ds(&dir)
        .args(["--dry-run", "mark"])
        .assert()
        .success()
        .stdout(contains("[DRY RUN]"))
        .stdout(contains("touch ran.txt"));
    assert!(!dir.path().join("ran.txt").exists());

    ds(&dir).arg("mark").assert().success();
    assert!(dir.path().join("ran.txt").exists());
}

#[test]
fn test_unknown_task_falls_back_to_shell() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nbuild = 'echo building'\n");

    ds(&dir)
        .arg("definitely-not-a-command-xyz")
        .assert()
        .failure()
        .code(127)
        .stderr(contains("return code = 127"));
}

#[test]
fn test_argument_interpolation() {
    let (dir, _) = write_config("ds.toml", "[scripts]\ngreet = 'echo hi $1'\n");

    ds(&dir)
        .args(["greet", ":", "world"])
        .assert()
        .success()
        .stdout(contains("hi world"));
}

#[test]
fn test_missing_argument_fails() {
    let (dir, _) = write_config("ds.toml", "[scripts]\ngreet = 'echo hi $1'\n");

    ds(&dir)
        .arg("greet")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Not enough arguments provided: $1"));
}

#[test]
fn test_extra_arguments_appended() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nsay = 'echo'\n");

    ds(&dir)
        .args(["say", ":", "appended-words"])
        .assert()
        .success()
        .stdout(contains("appended-words"));
}

#[test]
fn test_composite_task() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts]
clean = "echo cleaning"
build = "echo building"
all = ["clean", "build"]
"#,
    );

    ds(&dir)
        .arg("all")
        .assert()
        .success()
        .stdout(contains("cleaning"))
        .stdout(contains("building"));
}

#[test]
fn test_env_option() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nshow = 'echo VALUE=$MY_VAR'\n");

    ds(&dir)
        .args(["-e", "MY_VAR=42", "show"])
        .assert()
        .success()
        .stdout(contains("VALUE=42"));
}

#[test]
fn test_env_in_config() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts.show]
shell = "echo GREETING=$GREETING"
env = { GREETING = "hola" }
"#,
    );

    ds(&dir)
        .arg("show")
        .assert()
        .success()
        .stdout(contains("GREETING=hola"));
}

#[test]
fn test_env_file_in_config() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts.show]
shell = "echo TOKEN=$TOKEN"
env-file = ".env"
"#,
    );
    fs::write(dir.path().join(".env"), "TOKEN=sekret\n").unwrap();

    ds(&dir)
        .arg("show")
        .assert()
        .success()
        .stdout(contains("TOKEN=sekret"));
}

#[test]
fn test_env_file_option_wins_over_file_values() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nshow = 'echo TOKEN=$TOKEN'\n");
    fs::write(dir.path().join(".env"), "TOKEN=from-file\n").unwrap();

    ds(&dir)
        .args(["--env-file", ".env", "-e", "TOKEN=from-cli", "show"])
        .assert()
        .success()
        .stdout(contains("TOKEN=from-cli"));
}

#[test]
fn test_cwd_in_config() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts.here]
shell = "basename \"$PWD\""
cwd = "sub"
"#,
    );
    fs::create_dir(dir.path().join("sub")).unwrap();

    ds(&dir).arg("here").assert().success().stdout(contains("sub"));
}

#[test]
fn test_cwd_option() {
    let (dir, _) = write_config("ds.toml", "[scripts]\nhere = 'basename \"$PWD\"'\n");
    fs::create_dir(dir.path().join("elsewhere")).unwrap();

    ds(&dir)
        .args(["--cwd", "elsewhere", "here"])
        .assert()
        .success()
        .stdout(contains("elsewhere"));
}

#[test]
fn test_cwd_option_wins_over_config() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts.here]
shell = "basename \"$PWD\""
cwd = "sub"
"#,
    );
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::create_dir(dir.path().join("elsewhere")).unwrap();

    ds(&dir)
        .args(["--cwd", "elsewhere", "here"])
        .assert()
        .success()
        .stdout(contains("elsewhere"));
}

#[test]
fn test_pre_post_hooks() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts]
prebuild = "echo BEFORE"
build = "echo DURING"
postbuild = "echo AFTER"
"#,
    );

    ds(&dir)
        .args(["--pre", "--post", "build"])
        .assert()
        .success()
        .stdout(contains("BEFORE"))
        .stdout(contains("DURING"))
        .stdout(contains("AFTER"));

    ds(&dir)
        .arg("build")
        .assert()
        .success()
        .stdout(contains("DURING"))
        .stdout(contains("BEFORE").not());
}

#[test]
fn test_parallel_runs_all_tasks() {
    let (dir, _) = write_config(
        "ds.toml",
        "[scripts]\nslow = 'sleep 0.2 && echo SLOW-DONE'\nquick = 'echo QUICK-DONE'\n",
    );

    ds(&dir)
        .args(["--parallel", "slow", "quick"])
        .assert()
        .success()
        .stdout(contains("SLOW-DONE"))
        .stdout(contains("QUICK-DONE"));
}

#[test]
fn test_no_config_runs_shell_commands() {
    let dir = tempfile::TempDir::new().unwrap();

    ds(&dir)
        .args(["--no-config", "echo no-config-ran"])
        .assert()
        .success()
        .stdout(contains("no-config-ran"));
}

#[test]
fn test_no_config_rejects_list_and_workspace() {
    let dir = tempfile::TempDir::new().unwrap();

    ds(&dir)
        .args(["--no-config", "--list"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Cannot use --list together with --no-config."));

    ds(&dir)
        .args(["--no-config", "-w", "*", "build"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Cannot use --workspace together with --no-config."));
}

#[test]
fn test_no_config_found() {
    let dir = tempfile::TempDir::new().unwrap();

    ds(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("No valid configuration file found."));
}

#[test]
fn test_missing_file_option() {
    let dir = tempfile::TempDir::new().unwrap();

    ds(&dir)
        .args(["-f", "no-such.toml", "build"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Cannot find file:"));
}

#[test]
fn test_task_cycle_detected() {
    let (dir, _) = write_config("ds.toml", "[scripts]\na = ['b']\nb = ['a']\n");

    ds(&dir)
        .arg("a")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Task cycle detected"));
}

#[test]
fn test_help_and_version() {
    let dir = tempfile::TempDir::new().unwrap();

    ds(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("ds: Run dev scripts."))
        .stdout(contains("--workspace"));

    ds(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_verbatim_task() {
    let (dir, _) = write_config(
        "ds.toml",
        r#"
[scripts.steps]
verbatim = true
shell = """
echo one
echo two
"""
"#,
    );

    ds(&dir)
        .arg("steps")
        .assert()
        .success()
        .stdout(contains("one"))
        .stdout(contains("two"));
}
