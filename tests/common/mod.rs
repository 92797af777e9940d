//! Common test utilities

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Create a temporary directory holding a single config file.
pub fn write_config(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    (dir, path)
}

/// Build a `ds` command rooted in `dir`.
pub fn ds(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ds").unwrap();
    cmd.current_dir(dir.path()).env_remove("DS_INTERNAL_FILE");
    cmd
}
