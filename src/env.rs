//! Scoped changes to the process environment

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ui;

/// Temporary environment variables, restored on drop.
///
/// The first change to a key records its prior value (or absence) so
/// nested changes unwind correctly.
#[derive(Debug, Default)]
pub struct TempEnv {
    saved: Vec<(String, Option<String>)>,
}

impl TempEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable for the lifetime of this scope.
    pub fn set(&mut self, key: &str, value: &str) {
        self.save(key);
        env::set_var(key, value);
    }

    /// Remove a variable for the lifetime of this scope.
    pub fn remove(&mut self, key: &str) {
        self.save(key);
        env::remove_var(key);
    }

    fn save(&mut self, key: &str) {
        if !self.saved.iter().any(|(k, _)| k == key) {
            self.saved.push((key.to_string(), env::var(key).ok()));
        }
    }
}

impl Drop for TempEnv {
    fn drop(&mut self) {
        for (key, old) in self.saved.drain(..).rev() {
            match old {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

/// Temporary working directory, restored on drop.
#[derive(Debug)]
pub struct Pushd {
    prev: Option<PathBuf>,
}

/// Change the current working directory until the guard is dropped.
pub fn pushd(dest: &Path) -> Result<Pushd> {
    let cwd = env::current_dir()?;
    let dest = dest.canonicalize().unwrap_or_else(|_| dest.to_path_buf());
    if dest == cwd {
        ui::debug(&format!("staying in: {}", dest.display()));
        return Ok(Pushd { prev: None });
    }

    ui::debug(&format!("going to: {}", dest.display()));
    env::set_current_dir(&dest)?;
    Ok(Pushd { prev: Some(cwd) })
}

impl Drop for Pushd {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            ui::debug(&format!("coming back: {}", prev.display()));
            let _ = env::set_current_dir(prev);
        }
    }
}

/// Read a dotenv file into a map.
///
/// Supports comments, `export` prefixes, quoting, and `$VAR` substitution.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        vars.insert(key, value);
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_temp_env_restores_value() {
        env::set_var("DS_TEST_RESTORE", "original");
        {
            let mut scope = TempEnv::new();
            scope.set("DS_TEST_RESTORE", "changed");
            assert_eq!(env::var("DS_TEST_RESTORE").unwrap(), "changed");
        }
        assert_eq!(env::var("DS_TEST_RESTORE").unwrap(), "original");
        env::remove_var("DS_TEST_RESTORE");
    }

    #[test]
    fn test_temp_env_restores_absence() {
        env::remove_var("DS_TEST_ABSENT");
        {
            let mut scope = TempEnv::new();
            scope.set("DS_TEST_ABSENT", "present");
            assert_eq!(env::var("DS_TEST_ABSENT").unwrap(), "present");
        }
        assert!(env::var("DS_TEST_ABSENT").is_err());
    }

    #[test]
    fn test_temp_env_remove() {
        env::set_var("DS_TEST_REMOVE", "original");
        {
            let mut scope = TempEnv::new();
            scope.remove("DS_TEST_REMOVE");
            assert!(env::var("DS_TEST_REMOVE").is_err());
        }
        assert_eq!(env::var("DS_TEST_REMOVE").unwrap(), "original");
        env::remove_var("DS_TEST_REMOVE");
    }

    #[test]
    fn test_pushd_changes_and_restores() {
        let dir = TempDir::new().unwrap();
        let before = env::current_dir().unwrap();
        {
            let _guard = pushd(dir.path()).unwrap();
            let inside = env::current_dir().unwrap();
            assert_eq!(inside, dir.path().canonicalize().unwrap());
        }
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_read_env_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# comment\nA=1\nexport B=\"two words\"\n").unwrap();

        let vars = read_env_file(&path).unwrap();
        assert_eq!(vars.get("A").map(String::as_str), Some("1"));
        assert_eq!(vars.get("B").map(String::as_str), Some("two words"));
    }
}
