//! Process level coordination: the exclusive GPIO lock, the hardware
//! watchdog and loop pacing.

pub mod cycle;
pub mod lock;
pub mod watchdog;

// Re-export commonly used items
pub use cycle::CycleTimer;
pub use lock::{acquire, LockHandle, LockOptions, DEFAULT_LOCK_PATH};
pub use watchdog::{DisarmStatus, Watchdog, DEFAULT_WATCHDOG_PATH};

use crate::error::{GpioError, Result};
use std::path::Path;
use tracing::warn;

/// Owns the GPIO lock and, optionally, the watchdog.
///
/// The watchdog can only be opened while the lock is held. Dropping the
/// guard closes the watchdog first and then releases the lock.
#[derive(Debug)]
pub struct ProcessGuard {
    lock: LockHandle,
    watchdog: Option<Watchdog>,
}

impl ProcessGuard {
    /// Take the lock at `path`.
    pub fn acquire(path: impl AsRef<Path>, options: LockOptions) -> Result<Self> {
        Ok(Self {
            lock: lock::acquire(path, options)?,
            watchdog: None,
        })
    }

    /// The lock this guard holds.
    pub fn lock(&self) -> &LockHandle {
        &self.lock
    }

    pub fn has_watchdog(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Open and arm the watchdog at `path`.
    pub fn open_watchdog(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.install_watchdog(|| Watchdog::open(path))
    }

    /// Arm an already configured watchdog opener; used when the sysfs
    /// location differs from the default.
    pub fn install_watchdog(&mut self, open: impl FnOnce() -> Result<Watchdog>) -> Result<()> {
        if !self.lock.is_held() {
            return Err(GpioError::config_error(
                "watchdog requested without holding the GPIO lock",
            ));
        }
        if self.watchdog.is_some() {
            return Err(GpioError::config_error("watchdog already open"));
        }
        self.watchdog = Some(open()?);
        Ok(())
    }

    /// Re-arm the watchdog if one is open.
    pub fn trigger_watchdog(&mut self) -> Result<()> {
        match self.watchdog.as_mut() {
            Some(watchdog) => watchdog.trigger(),
            None => Ok(()),
        }
    }

    /// Disarm and close the watchdog; `None` if none was open.
    pub fn close_watchdog(&mut self) -> Result<Option<DisarmStatus>> {
        self.watchdog.take().map(Watchdog::close).transpose()
    }

    /// Close the watchdog, then release the lock. Calling it again does
    /// nothing.
    ///
    /// The lock is released even when closing the watchdog fails.
    pub fn release(&mut self) -> Result<Option<DisarmStatus>> {
        let closed = self.close_watchdog();
        let unlocked = self.lock.release();
        settle_release(closed, unlocked)
    }
}

/// The lock failure wins; a watchdog failure next to it is logged.
fn settle_release(
    closed: Result<Option<DisarmStatus>>,
    unlocked: Result<()>,
) -> Result<Option<DisarmStatus>> {
    match (closed, unlocked) {
        (closed, Ok(())) => closed,
        (Err(watchdog), Err(lock)) => {
            warn!("{}", watchdog);
            Err(lock)
        }
        (Ok(_), Err(lock)) => Err(lock),
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}
