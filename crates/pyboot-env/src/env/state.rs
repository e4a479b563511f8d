//! Completion sentinel stored inside the environment.
//!
//! Written only after dependencies installed successfully and removed before
//! each install starts, so its presence means the last provisioning run
//! finished.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LaunchError;
use crate::interpreter::Interpreter;
use crate::manifest::Manifest;

pub const STATE_FILE: &str = ".pyboot-state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvState {
    pub launcher_version: String,
    /// Base interpreter the environment was provisioned with
    pub interpreter: PathBuf,
    pub python_version: String,
    /// Digest of the manifest that was installed; `None` if there was none
    pub manifest_digest: Option<String>,
    pub requirement_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl EnvState {
    pub fn new(interpreter: &Interpreter, manifest: Option<&Manifest>) -> Self {
        Self {
            launcher_version: env!("CARGO_PKG_VERSION").to_string(),
            interpreter: interpreter.path.clone(),
            python_version: interpreter.version.clone(),
            manifest_digest: manifest.map(|m| m.digest.clone()),
            requirement_count: manifest.map(Manifest::package_count).unwrap_or(0),
            completed_at: Utc::now(),
        }
    }

    pub fn path(env_dir: &Path) -> PathBuf {
        env_dir.join(STATE_FILE)
    }

    /// Read the sentinel. Missing or unparsable files yield `None`.
    pub fn load(env_dir: &Path) -> Option<Self> {
        let path = Self::path(env_dir);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("ignoring corrupt {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether this state recorded the manifest with `digest`.
    pub fn matches(&self, digest: Option<&str>) -> bool {
        self.manifest_digest.as_deref() == digest
    }

    /// Write atomically (temp file + rename).
    pub fn save(&self, env_dir: &Path) -> Result<(), LaunchError> {
        let path = Self::path(env_dir);
        let state_err = |reason: String| LaunchError::State {
            path: path.clone(),
            reason,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| state_err(e.to_string()))?;
        let tmp = env_dir.join(format!("{}.tmp", STATE_FILE));
        std::fs::write(&tmp, json).map_err(|e| state_err(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| state_err(e.to_string()))?;
        Ok(())
    }

    /// Remove the sentinel before provisioning starts.
    pub fn clear(env_dir: &Path) -> Result<(), LaunchError> {
        let path = Self::path(env_dir);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LaunchError::State {
                path,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> Interpreter {
        Interpreter {
            name: "python3".to_string(),
            path: PathBuf::from("/usr/bin/python3"),
            version: "3.11.4".to_string(),
        }
    }

    #[test]
    fn test_save_load_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = Manifest::parse(Path::new("requirements.txt"), "requests==2.31.0\n");
        let state = EnvState::new(&interpreter(), Some(&manifest));
        state.save(tmp.path()).unwrap();

        let loaded = EnvState::load(tmp.path()).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.requirement_count, 1);
        assert!(loaded.matches(Some(&manifest.digest)));
        assert!(!loaded.matches(None));
        assert!(!tmp.path().join(".pyboot-state.json.tmp").exists());

        EnvState::clear(tmp.path()).unwrap();
        assert_eq!(EnvState::load(tmp.path()), None);
        EnvState::clear(tmp.path()).unwrap();
    }

    #[test]
    fn test_corrupt_state_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(EnvState::path(tmp.path()), "{not json").unwrap();
        assert_eq!(EnvState::load(tmp.path()), None);
    }
}
