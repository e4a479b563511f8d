//! The pyboot launcher.
//!
//! Resolves the install root, selects a Python interpreter, provisions the
//! virtual environment next to the launcher, installs the requirements file
//! and hands control to the target application.

pub mod env;
pub mod error;
pub mod handoff;
pub mod installer;
pub mod interpreter;
pub mod launcher;
pub mod layout;
pub mod lock;
pub mod manifest;
pub mod process;

pub use error::LaunchError;
pub use handoff::HandoffOutcome;
pub use launcher::{EnvReport, Launcher, PreparedLaunch};
pub use layout::{resolve_install_root, InstallLayout};

#[cfg(all(test, unix))]
mod testing;
