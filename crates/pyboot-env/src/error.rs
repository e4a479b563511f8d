//! Launcher error taxonomy and exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::process::StepFailure;

/// Generic failure.
pub const EXIT_FAILURE: i32 = 1;
/// A subprocess step exceeded `PYBOOT_STEP_TIMEOUT_SECS`.
pub const EXIT_TIMEOUT: i32 = 124;
/// The target exists but could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// The target (or its interpreter) could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Errors returned by the launch procedure.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("cannot determine the launcher's install root: {reason}")]
    PathResolution { reason: String },

    #[error(
        "no compatible Python interpreter found (tried: {tried}). \
         Install Python 3 (https://www.python.org/downloads/) and make sure it is on PATH"
    )]
    RuntimeNotFound { tried: String },

    #[error("failed to create virtual environment at {}: {failure}", path.display())]
    EnvironmentCreation { path: PathBuf, failure: StepFailure },

    #[error("{step} failed: {failure}")]
    DependencyInstall {
        step: &'static str,
        failure: StepFailure,
    },

    #[error("cannot launch {}: {reason}", target.display())]
    Handoff {
        target: PathBuf,
        reason: String,
        code: i32,
    },

    #[error("cannot lock environment ({}): {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot record environment state ({}): {reason}", path.display())]
    State { path: PathBuf, reason: String },
}

impl LaunchError {
    /// Process exit code the launcher should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EnvironmentCreation { failure, .. } | Self::DependencyInstall { failure, .. } => {
                failure.exit_code()
            }
            Self::Handoff { code, .. } => *code,
            Self::PathResolution { .. }
            | Self::RuntimeNotFound { .. }
            | Self::Lock { .. }
            | Self::State { .. } => EXIT_FAILURE,
        }
    }
}
