//! The launch procedure: interpreter → environment → dependencies → handoff.
//!
//! Each step is a precondition for the next. Nothing on disk is touched
//! until an interpreter has been selected. The environment lock covers
//! creation and install and is released before handoff.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pyboot_core::config::LauncherConfig;
use pyboot_core::{progress, warn_user};
use serde::Serialize;

use crate::env::{self, ActivatedEnv, EnvState, EnvStatus};
use crate::error::LaunchError;
use crate::handoff::{self, HandoffOutcome};
use crate::installer;
use crate::interpreter::{select_interpreter_in, Interpreter};
use crate::layout::InstallLayout;
use crate::lock::EnvLock;
use crate::manifest::{Manifest, Requirement};
use crate::process::StepFailure;

/// Result of the provisioning steps, ready for handoff.
#[derive(Debug, Clone)]
pub struct PreparedLaunch {
    pub interpreter: Interpreter,
    pub env: ActivatedEnv,
    pub env_status: EnvStatus,
    pub manifest: Option<Manifest>,
}

pub struct Launcher {
    layout: InstallLayout,
    config: LauncherConfig,
    /// Interpreter search path; `None` uses the process `PATH`.
    search_path: Option<OsString>,
}

impl Launcher {
    pub fn new(root: &Path, config: LauncherConfig) -> Self {
        Self {
            layout: InstallLayout::new(root, &config),
            config,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Search interpreters on `search_path` instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: OsString) -> Self {
        self.search_path = Some(search_path);
        self
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Provision and run the target.
    pub fn launch(&self) -> Result<HandoffOutcome, LaunchError> {
        let prepared = self.prepare()?;
        handoff::handoff(&prepared.env, &self.layout, self.config.handoff)
    }

    /// Select the interpreter, ensure and activate the environment, install
    /// dependencies.
    pub fn prepare(&self) -> Result<PreparedLaunch, LaunchError> {
        let interpreter = self.select_interpreter()?;
        let timeout = self.config.step_timeout;
        let env_dir = &self.layout.env_dir;

        let _lock = if self.config.lock {
            Some(EnvLock::acquire(&self.layout.lock_file)?)
        } else {
            None
        };

        let previous = EnvState::load(env_dir);
        let env_status = env::ensure_environment(env_dir, &interpreter, timeout)?;
        let activated = env::activate(env_dir)?;
        if env_status == EnvStatus::Reused && previous.is_none() {
            warn_user!(
                "environment at {} was not fully set up by a previous run; reinstalling dependencies",
                env_dir.display()
            );
        }

        let manifest = self.load_manifest()?;

        EnvState::clear(env_dir)?;
        match &manifest {
            Some(manifest) => {
                if let Some(previous) = &previous {
                    if !previous.matches(Some(&manifest.digest)) {
                        progress!("Requirements changed since the last run");
                    }
                }
                installer::upgrade_toolchain(&activated, timeout)?;
                installer::install_manifest(&activated, manifest, timeout)?;
            }
            None => {
                warn_user!(
                    "{} not found; launching without installing dependencies",
                    self.layout.manifest.display()
                );
            }
        }
        EnvState::new(&interpreter, manifest.as_ref()).save(env_dir)?;

        Ok(PreparedLaunch {
            interpreter,
            env: activated,
            env_status,
            manifest,
        })
    }

    fn select_interpreter(&self) -> Result<Interpreter, LaunchError> {
        select_interpreter_in(&self.config.interpreters, self.search_path.clone())
    }

    fn load_manifest(&self) -> Result<Option<Manifest>, LaunchError> {
        let path = &self.layout.manifest;
        Manifest::load(path).map_err(|e| LaunchError::DependencyInstall {
            step: "reading requirements",
            failure: StepFailure::Failed(format!("{}: {}", path.display(), e)),
        })
    }

    /// Read-only snapshot of the install for `pyboot status`.
    pub fn inspect(&self) -> Result<EnvReport, LaunchError> {
        let manifest = self.load_manifest()?;
        let state = EnvState::load(&self.layout.env_dir);
        let env_python = ActivatedEnv::locate(&self.layout.env_dir).map(|e| e.python);
        let manifest_digest = manifest.as_ref().map(|m| m.digest.clone());
        let up_to_date = env_python.is_some()
            && state
                .as_ref()
                .is_some_and(|s| s.matches(manifest_digest.as_deref()));

        Ok(EnvReport {
            install_root: self.layout.root.clone(),
            interpreter: self.select_interpreter().ok(),
            env_dir: self.layout.env_dir.clone(),
            env_present: self.layout.env_dir.is_dir(),
            env_python,
            manifest: self.layout.manifest.clone(),
            manifest_present: manifest.is_some(),
            manifest_digest,
            requirements: manifest.map(|m| m.requirements).unwrap_or_default(),
            state,
            up_to_date,
            target: self.layout.target.clone(),
            target_present: self.layout.target.is_file(),
        })
    }
}

/// What `pyboot status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub install_root: PathBuf,
    /// `None` when no compatible interpreter is available
    pub interpreter: Option<Interpreter>,
    pub env_dir: PathBuf,
    pub env_present: bool,
    pub env_python: Option<PathBuf>,
    pub manifest: PathBuf,
    pub manifest_present: bool,
    pub manifest_digest: Option<String>,
    pub requirements: Vec<Requirement>,
    pub state: Option<EnvState>,
    /// Environment complete and provisioned from the current manifest
    pub up_to_date: bool,
    pub target: PathBuf,
    pub target_present: bool,
}
