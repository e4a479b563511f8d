//! Advisory lock serializing launchers that share an install root.
//!
//! Held from environment creation through dependency install and released
//! before handoff. Unix only: elsewhere the lock file is created but not
//! locked.

use std::fs::{File, OpenOptions};
use std::path::Path;

use pyboot_core::progress;

use crate::error::LaunchError;

/// Exclusive lock; released on drop.
pub struct EnvLock {
    #[cfg(unix)]
    _flock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl EnvLock {
    /// Take the lock, waiting for any other holder.
    pub fn acquire(path: &Path) -> Result<Self, LaunchError> {
        match Self::try_acquire(path)? {
            Some(lock) => Ok(lock),
            None => {
                progress!("Waiting for another launcher to finish setting up the environment");
                Self::lock(path, true)?.ok_or_else(|| LaunchError::Lock {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::WouldBlock,
                        "lock still held after waiting",
                    ),
                })
            }
        }
    }

    /// Take the lock if it is free; `Ok(None)` if someone else holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LaunchError> {
        Self::lock(path, false)
    }

    fn open(path: &Path) -> Result<File, LaunchError> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|source| LaunchError::Lock {
                path: path.to_path_buf(),
                source,
            })
    }

    #[cfg(unix)]
    fn lock(path: &Path, wait: bool) -> Result<Option<Self>, LaunchError> {
        use nix::errno::Errno;
        use nix::fcntl::{Flock, FlockArg};

        let file = Self::open(path)?;
        let arg = if wait {
            FlockArg::LockExclusive
        } else {
            FlockArg::LockExclusiveNonblock
        };
        match Flock::lock(file, arg) {
            Ok(flock) => {
                tracing::debug!(path = %path.display(), "environment lock acquired");
                Ok(Some(Self { _flock: flock }))
            }
            Err((_, Errno::EWOULDBLOCK)) if !wait => Ok(None),
            Err((_, errno)) => Err(LaunchError::Lock {
                path: path.to_path_buf(),
                source: std::io::Error::from(errno),
            }),
        }
    }

    #[cfg(not(unix))]
    fn lock(path: &Path, _wait: bool) -> Result<Option<Self>, LaunchError> {
        let file = Self::open(path)?;
        Ok(Some(Self { _file: file }))
    }
}
