//! Install root resolution and the file layout underneath it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pyboot_core::config::LauncherConfig;

use crate::error::LaunchError;

/// Resolve the install root: the absolute, symlink-resolved directory that
/// contains the launcher executable. `override_root` (from `PYBOOT_ROOT`)
/// replaces the executable's directory but is canonicalized the same way.
///
/// Never consults the caller's working directory, except to anchor a
/// relative `override_root`.
pub fn resolve_install_root(override_root: Option<&Path>) -> Result<PathBuf, LaunchError> {
    if let Some(root) = override_root {
        let resolved = root
            .canonicalize()
            .map_err(|e| LaunchError::PathResolution {
                reason: format!("{}: {}", root.display(), e),
            })?;
        if !resolved.is_dir() {
            return Err(LaunchError::PathResolution {
                reason: format!("{} is not a directory", resolved.display()),
            });
        }
        return Ok(resolved);
    }

    let exe = std::env::current_exe().map_err(|e| LaunchError::PathResolution {
        reason: format!("cannot locate launcher executable: {}", e),
    })?;
    install_root_of(&exe)
}

/// Install root for a launcher at `launcher`, which may be relative or a
/// symlink chain.
pub fn install_root_of(launcher: &Path) -> Result<PathBuf, LaunchError> {
    let resolved = launcher
        .canonicalize()
        .map_err(|e| LaunchError::PathResolution {
            reason: format!("{}: {}", launcher.display(), e),
        })?;
    resolved
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| LaunchError::PathResolution {
            reason: format!("{} has no parent directory", resolved.display()),
        })
}

/// Absolute paths of everything the launcher touches under the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub manifest: PathBuf,
    pub target: PathBuf,
    /// Advisory lock file, a sibling of the environment directory.
    pub lock_file: PathBuf,
}

impl InstallLayout {
    pub fn new(root: &Path, config: &LauncherConfig) -> Self {
        let env_dir = root.join(&config.env_dir);
        let mut lock_name = env_dir
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(".venv"));
        lock_name.push(".lock");
        let lock_file = env_dir.with_file_name(lock_name);

        Self {
            root: root.to_path_buf(),
            env_dir,
            manifest: root.join(&config.manifest),
            target: root.join(&config.target),
            lock_file,
        }
    }
}
