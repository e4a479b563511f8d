//! pip steps run inside the activated environment.

use std::time::Duration;

use pyboot_core::progress;

use crate::env::ActivatedEnv;
use crate::error::LaunchError;
use crate::manifest::Manifest;
use crate::process::run_step;

/// Packaging toolchain upgraded before every install.
pub const TOOLCHAIN: &[&str] = &["pip", "setuptools", "wheel"];

/// `python -m pip install --quiet --upgrade pip setuptools wheel`, output
/// captured and only shown if it fails.
pub fn upgrade_toolchain(env: &ActivatedEnv, timeout: Option<Duration>) -> Result<(), LaunchError> {
    progress!("Upgrading {}", TOOLCHAIN.join(", "));
    let mut cmd = env.python_command();
    cmd.args(["-m", "pip", "install", "--quiet", "--disable-pip-version-check", "--upgrade"])
        .args(TOOLCHAIN);
    run_step(&mut cmd, true, timeout).map_err(|failure| LaunchError::DependencyInstall {
        step: "toolchain upgrade",
        failure,
    })?;
    Ok(())
}

/// `python -m pip install -r <manifest>`, output inherited so the user sees
/// pip's progress. Runs from the manifest's directory so relative includes
/// inside it resolve.
pub fn install_manifest(
    env: &ActivatedEnv,
    manifest: &Manifest,
    timeout: Option<Duration>,
) -> Result<(), LaunchError> {
    let file_name = manifest
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| manifest.path.display().to_string());
    progress!(
        "Installing dependencies from {} ({} packages)",
        file_name,
        manifest.package_count()
    );
    let mut cmd = env.python_command();
    cmd.args(["-m", "pip", "install", "--disable-pip-version-check", "-r"])
        .arg(&manifest.path);
    if let Some(dir) = manifest.path.parent().filter(|d| d.is_dir()) {
        cmd.current_dir(dir);
    }
    run_step(&mut cmd, false, timeout).map_err(|failure| LaunchError::DependencyInstall {
        step: "dependency install",
        failure,
    })?;
    Ok(())
}
