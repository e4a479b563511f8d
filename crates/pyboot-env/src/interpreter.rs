//! Python interpreter selection.
//!
//! Candidates are tried in preference order. A candidate must be on the
//! search path and report Python 3 or newer from `--version`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::LaunchError;

/// Oldest supported major version.
pub const MIN_MAJOR: u32 = 3;

/// A checked, compatible base interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpreter {
    pub name: String,
    pub path: PathBuf,
    /// As reported by `--version`, e.g. `3.11.4`
    pub version: String,
}

/// Select the first compatible interpreter from `candidates`, looked up on
/// `search_path` (the process `PATH` when `None`).
pub fn select_interpreter_in(
    candidates: &[String],
    search_path: Option<OsString>,
) -> Result<Interpreter, LaunchError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    for name in candidates {
        let path = match which::which_in(name, search_path.as_deref(), &cwd) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(candidate = %name, "not found: {}", e);
                continue;
            }
        };
        match query_version(&path) {
            Some((major, version)) if major >= MIN_MAJOR => {
                tracing::debug!(candidate = %name, path = %path.display(), %version, "selected interpreter");
                return Ok(Interpreter {
                    name: name.clone(),
                    path,
                    version,
                });
            }
            Some((_, version)) => {
                tracing::debug!(candidate = %name, %version, "skipping incompatible interpreter");
            }
            None => {
                tracing::debug!(candidate = %name, path = %path.display(), "version check failed");
            }
        }
    }
    Err(LaunchError::RuntimeNotFound {
        tried: candidates.join(", "),
    })
}

/// Run `<path> --version`; returns (major, full version).
fn query_version(path: &Path) -> Option<(u32, String)> {
    let out = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    // Python 2 prints its version to stderr
    parse_version(&String::from_utf8_lossy(&out.stdout))
        .or_else(|| parse_version(&String::from_utf8_lossy(&out.stderr)))
}

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn parse_version(text: &str) -> Option<(u32, String)> {
    let re = VERSION_RE.get_or_init(|| {
        Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?\S*").expect("version regex")
    });
    let caps = re.captures(text)?;
    let major: u32 = caps.get(1)?.as_str().parse().ok()?;
    let version = caps.get(0)?.as_str().trim_start_matches("Python").trim().to_string();
    Some((major, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("Python 3.11.4\n"), Some((3, "3.11.4".to_string())));
        assert_eq!(parse_version("Python 3.13.0rc1"), Some((3, "3.13.0rc1".to_string())));
        assert_eq!(parse_version("Python 2.7.18"), Some((2, "2.7.18".to_string())));
        assert_eq!(parse_version("command not found"), None);
    }

    #[cfg(unix)]
    mod selection {
        use super::super::*;
        use crate::testing::FakeRuntime;

        fn candidates() -> Vec<String> {
            vec!["python3".to_string(), "python".to_string()]
        }

        #[test]
        fn test_primary_preferred_when_both_present() {
            let tmp = tempfile::tempdir().unwrap();
            let rt = FakeRuntime::new(tmp.path());
            rt.add_python("python3", "3.12.1");
            rt.add_python("python", "3.9.0");
            let chosen = select_interpreter_in(&candidates(), Some(rt.search_path())).unwrap();
            assert_eq!(chosen.name, "python3");
            assert_eq!(chosen.version, "3.12.1");
            assert!(chosen.path.is_absolute());
        }

        #[test]
        fn test_fallback_used_when_primary_missing() {
            let tmp = tempfile::tempdir().unwrap();
            let rt = FakeRuntime::new(tmp.path());
            rt.add_python("python", "3.10.2");
            let chosen = select_interpreter_in(&candidates(), Some(rt.search_path())).unwrap();
            assert_eq!(chosen.name, "python");
        }

        #[test]
        fn test_python2_is_skipped() {
            let tmp = tempfile::tempdir().unwrap();
            let rt = FakeRuntime::new(tmp.path());
            rt.add_python("python", "2.7.18");
            let err = select_interpreter_in(&candidates(), Some(rt.search_path())).unwrap_err();
            assert!(matches!(err, LaunchError::RuntimeNotFound { .. }));
        }

        #[test]
        fn test_none_present() {
            let tmp = tempfile::tempdir().unwrap();
            let rt = FakeRuntime::new(tmp.path());
            let err = select_interpreter_in(&candidates(), Some(rt.search_path())).unwrap_err();
            assert_eq!(err.exit_code(), 1);
            assert!(err.to_string().contains("python3, python"));
        }
    }
}
