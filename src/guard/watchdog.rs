//! Hardware watchdog supervision through the Linux watchdog device.
//!
//! Opening the device arms the timer. Each write re-arms it. Writing the
//! magic character `V` just before closing disarms it, unless the driver
//! was built or loaded with `nowayout`, in which case the board resets once
//! the timeout elapses after close.

use crate::error::{GpioError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default watchdog device.
pub const DEFAULT_WATCHDOG_PATH: &str = "/dev/watchdog";

/// Where the kernel publishes watchdog driver attributes.
pub const SYSFS_WATCHDOG_DIR: &str = "/sys/class/watchdog";

const TRIGGER: &[u8] = b"X";
const MAGIC_CLOSE: &[u8] = b"V";

/// What closing the watchdog achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisarmStatus {
    /// The driver accepts the magic close; the timer is stopped
    Disarmed,
    /// The driver runs with `nowayout`; a reset will follow
    NoWayOut,
    /// The driver's `nowayout` setting could not be read
    Unverified,
}

impl DisarmStatus {
    /// Whether the board will keep running after close.
    pub fn is_safe(self) -> bool {
        self == DisarmStatus::Disarmed
    }
}

/// An open, armed watchdog.
#[derive(Debug)]
pub struct Watchdog {
    path: PathBuf,
    sysfs_dir: PathBuf,
    file: Option<File>,
    triggers: u64,
}

impl Watchdog {
    /// Open and arm the watchdog device at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_sysfs(path, SYSFS_WATCHDOG_DIR)
    }

    /// As [`open`](Self::open), reading driver attributes below `sysfs_dir`.
    pub fn open_with_sysfs(path: impl AsRef<Path>, sysfs_dir: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| GpioError::Watchdog {
                path: path.clone(),
                operation: "open",
                source,
            })?;

        info!("Watchdog {} armed", path.display());
        Ok(Self {
            path,
            sysfs_dir: sysfs_dir.as_ref().to_path_buf(),
            file: Some(file),
            triggers: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful triggers since open.
    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    /// Re-arm the timer.
    pub fn trigger(&mut self) -> Result<()> {
        self.write(TRIGGER, "trigger")?;
        self.triggers += 1;
        Ok(())
    }

    /// Disarm and close the device.
    ///
    /// The result tells whether the disarm can be relied on.
    pub fn close(mut self) -> Result<DisarmStatus> {
        self.disarm()
    }

    fn disarm(&mut self) -> Result<DisarmStatus> {
        if self.file.is_none() {
            return Ok(DisarmStatus::Disarmed);
        }
        let written = self.write(MAGIC_CLOSE, "close");
        // Closing the descriptor completes the magic close sequence.
        self.file = None;
        written?;

        let status = self.read_nowayout();
        match status {
            DisarmStatus::Disarmed => info!("Watchdog {} disarmed", self.path.display()),
            DisarmStatus::NoWayOut => warn!(
                "Watchdog {} cannot be stopped (nowayout); the board will reset",
                self.path.display()
            ),
            DisarmStatus::Unverified => warn!(
                "Watchdog {} closed; disarm not verifiable",
                self.path.display()
            ),
        }
        Ok(status)
    }

    fn write(&mut self, bytes: &[u8], operation: &'static str) -> Result<()> {
        let path = &self.path;
        let file = self.file.as_mut().ok_or_else(|| GpioError::Watchdog {
            path: path.clone(),
            operation,
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "watchdog closed"),
        })?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|source| GpioError::Watchdog {
                path: path.clone(),
                operation,
                source,
            })
    }

    /// `/dev/watchdog` is an alias of `watchdog0`.
    fn sysfs_name(&self) -> Option<String> {
        let name = self.path.file_name()?.to_str()?;
        Some(if name == "watchdog" {
            "watchdog0".to_string()
        } else {
            name.to_string()
        })
    }

    fn read_nowayout(&self) -> DisarmStatus {
        let Some(name) = self.sysfs_name() else {
            return DisarmStatus::Unverified;
        };
        let attribute = self.sysfs_dir.join(name).join("nowayout");
        match fs::read_to_string(&attribute) {
            Ok(value) if value.trim() == "0" => DisarmStatus::Disarmed,
            Ok(value) if value.trim() == "1" => DisarmStatus::NoWayOut,
            Ok(value) => {
                debug!("Unexpected {}: {:?}", attribute.display(), value);
                DisarmStatus::Unverified
            }
            Err(e) => {
                debug!("Can't read {}: {}", attribute.display(), e);
                DisarmStatus::Unverified
            }
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Err(e) = self.disarm() {
            warn!("{}", e);
        }
    }
}
