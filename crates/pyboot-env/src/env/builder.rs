//! Create the virtual environment and resolve its interpreter.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use pyboot_core::progress;

use crate::error::LaunchError;
use crate::interpreter::Interpreter;
use crate::process::{run_step, StepFailure};

/// Paths of an existing environment, threaded into every subprocess that
/// must run "inside" it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedEnv {
    /// Environment directory (`VIRTUAL_ENV`)
    pub root: PathBuf,
    /// `bin/` (unix) or `Scripts/` (windows)
    pub bin_dir: PathBuf,
    /// Environment interpreter
    pub python: PathBuf,
}

impl ActivatedEnv {
    /// Locate the interpreter inside `env_dir`. `None` if the directory is
    /// missing or was never fully created.
    pub fn locate(env_dir: &Path) -> Option<Self> {
        let candidates = [
            env_dir.join("bin").join("python"),
            env_dir.join("Scripts").join("python.exe"),
        ];
        candidates.into_iter().find(|p| p.is_file()).and_then(|python| {
            let bin_dir = python.parent()?.to_path_buf();
            Some(Self {
                root: env_dir.to_path_buf(),
                bin_dir,
                python,
            })
        })
    }

    /// `inherited` with the environment's `bin_dir` in front.
    pub fn search_path(&self, inherited: Option<OsString>) -> Option<OsString> {
        let mut dirs = vec![self.bin_dir.clone()];
        if let Some(path) = inherited {
            dirs.extend(std::env::split_paths(&path));
        }
        std::env::join_paths(dirs).ok()
    }

    /// A command running the environment interpreter with the environment
    /// activated for it alone.
    pub fn python_command(&self) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.env("VIRTUAL_ENV", &self.root).env_remove("PYTHONHOME");
        if let Some(path) = self.search_path(std::env::var_os("PATH")) {
            cmd.env("PATH", path);
        }
        cmd
    }
}

/// What `ensure_environment` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStatus {
    /// Interpreter already present; nothing done.
    Reused,
    Created,
    /// Directory existed without an interpreter (interrupted earlier run).
    Recreated,
}

/// Create the environment at `env_dir` with `interpreter` unless it already
/// has an interpreter. A leftover directory without one is cleared and
/// rebuilt.
pub fn ensure_environment(
    env_dir: &Path,
    interpreter: &Interpreter,
    timeout: Option<Duration>,
) -> Result<EnvStatus, LaunchError> {
    if ActivatedEnv::locate(env_dir).is_some() {
        tracing::debug!(path = %env_dir.display(), "reusing environment");
        return Ok(EnvStatus::Reused);
    }

    let recreate = env_dir.exists();
    if recreate {
        progress!(
            "Rebuilding incomplete virtual environment in {}",
            env_dir.display()
        );
    } else {
        progress!(
            "Creating virtual environment in {} (Python {})",
            env_dir.display(),
            interpreter.version
        );
    }

    let mut cmd = Command::new(&interpreter.path);
    cmd.arg("-m").arg("venv");
    if recreate {
        cmd.arg("--clear");
    }
    cmd.arg(env_dir);
    if let Some(parent) = env_dir.parent().filter(|p| p.is_dir()) {
        cmd.current_dir(parent);
    }
    run_step(&mut cmd, true, timeout).map_err(|failure| LaunchError::EnvironmentCreation {
        path: env_dir.to_path_buf(),
        failure,
    })?;

    Ok(if recreate {
        EnvStatus::Recreated
    } else {
        EnvStatus::Created
    })
}

/// Activate the environment at `env_dir`.
pub fn activate(env_dir: &Path) -> Result<ActivatedEnv, LaunchError> {
    ActivatedEnv::locate(env_dir).ok_or_else(|| LaunchError::EnvironmentCreation {
        path: env_dir.to_path_buf(),
        failure: StepFailure::Failed("no Python interpreter inside the environment".to_string()),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::interpreter::select_interpreter_in;
    use crate::testing::FakeRuntime;
    use std::fs;

    fn base_python(rt: &FakeRuntime) -> Interpreter {
        rt.add_python("python3", "3.11.4");
        select_interpreter_in(&["python3".to_string()], Some(rt.search_path())).unwrap()
    }

    #[test]
    fn test_creates_once_then_reuses() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = FakeRuntime::new(tmp.path());
        let python = base_python(&rt);
        let env_dir = tmp.path().join(".venv");

        assert_eq!(ensure_environment(&env_dir, &python, None).unwrap(), EnvStatus::Created);
        assert_eq!(ensure_environment(&env_dir, &python, None).unwrap(), EnvStatus::Reused);
        assert_eq!(rt.count("base -m venv"), 1);

        let env = activate(&env_dir).unwrap();
        assert_eq!(env.python, env_dir.join("bin").join("python"));
        assert_eq!(env.bin_dir, env_dir.join("bin"));
    }

    #[test]
    fn test_incomplete_directory_is_rebuilt_with_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = FakeRuntime::new(tmp.path());
        let python = base_python(&rt);
        let env_dir = tmp.path().join(".venv");
        fs::create_dir_all(env_dir.join("lib")).unwrap();

        assert_eq!(
            ensure_environment(&env_dir, &python, None).unwrap(),
            EnvStatus::Recreated
        );
        assert!(rt.log_lines().iter().any(|l| l.starts_with("base -m venv --clear")));
        assert!(activate(&env_dir).is_ok());
    }

    #[test]
    fn test_creation_failure_reports_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = FakeRuntime::new(tmp.path());
        let python = base_python(&rt);
        rt.set("venv_fail", "");
        let err = ensure_environment(&tmp.path().join(".venv"), &python, None).unwrap_err();
        assert!(matches!(err, LaunchError::EnvironmentCreation { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("ensurepip failed"));
    }

    #[test]
    fn test_activate_missing_env() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(activate(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn test_search_path_prepends_bin_dir() {
        let env = ActivatedEnv {
            root: PathBuf::from("/app/.venv"),
            bin_dir: PathBuf::from("/app/.venv/bin"),
            python: PathBuf::from("/app/.venv/bin/python"),
        };
        let path = env
            .search_path(Some(OsString::from("/usr/bin:/bin")))
            .unwrap();
        let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/app/.venv/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin")
            ]
        );
    }
}
