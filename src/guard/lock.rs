//! Exclusive GPIO lock on a well-known file.
//!
//! Uses `flock(2)`, the same primitive the C tools and the `justLock`
//! helper use, so every cooperating process on the Pi excludes the others
//! whatever language it is written in. The kernel drops the lock when the
//! holding process dies.

use crate::error::{GpioError, Result};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lock file shared by all GPIO programs on the Pi.
pub const DEFAULT_LOCK_PATH: &str = "/home/pi/bin/.lockPiGpio";

/// How to treat the lock file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOptions {
    /// Create the lock file if it does not exist
    pub create: bool,
}

impl LockOptions {
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }
}

/// Ownership of the GPIO lock. Released by [`release`](Self::release) or
/// on drop.
pub struct LockHandle {
    path: PathBuf,
    lock: Option<Flock<File>>,
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("path", &self.path)
            .field("held", &self.lock.is_some())
            .finish()
    }
}

/// Take the lock at `path` without waiting.
pub fn acquire(path: impl AsRef<Path>, options: LockOptions) -> Result<LockHandle> {
    let path = path.as_ref().to_path_buf();

    let file = OpenOptions::new()
        .read(true)
        .write(options.create)
        .create(options.create)
        .open(&path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => GpioError::NoLockFile {
                path: path.clone(),
                source,
            },
            _ => GpioError::LockFailed {
                path: path.clone(),
                source,
            },
        })?;

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => {
            info!("Locked {}", path.display());
            Ok(LockHandle {
                path,
                lock: Some(lock),
            })
        }
        Err((_, Errno::EWOULDBLOCK)) => {
            debug!("{} is locked by another process", path.display());
            Err(GpioError::AlreadyLocked { path })
        }
        Err((_, errno)) => Err(GpioError::LockFailed {
            path,
            source: io::Error::from(errno),
        }),
    }
}

impl LockHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle still owns the lock.
    pub fn is_held(&self) -> bool {
        self.lock.is_some()
    }

    /// Unlock and close the file. Calling it again does nothing.
    pub fn release(&mut self) -> Result<()> {
        let Some(lock) = self.lock.take() else {
            return Ok(());
        };
        match lock.unlock() {
            Ok(_file) => {
                info!("Unlocked {}", self.path.display());
                Ok(())
            }
            // The lock goes away with the descriptor when `_lock` drops.
            Err((_lock, errno)) => Err(GpioError::LockFailed {
                path: self.path.clone(),
                source: io::Error::from(errno),
            }),
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}
