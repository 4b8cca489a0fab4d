//! Runtime configuration.
//!
//! Values come from defaults, optionally a TOML file, and finally command
//! line overrides applied through the `with_*` builders.

use crate::board::{BoardDescriptor, BoardType, HostEnvironment, DEFAULT_PORT, DEFAULT_TIMEOUT_MS};
use crate::error::{GpioError, Result};
use crate::guard::{LockOptions, DEFAULT_LOCK_PATH, DEFAULT_WATCHDOG_PATH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for one GPIO program instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// Board type code 0..=4; anything else means Pi 3
    pub board_type: i64,
    /// pigpiod host; the platform default if absent
    pub host: Option<String>,
    /// pigpiod port
    pub port: u32,
    /// Connect and read timeout in milliseconds
    pub timeout_ms: u32,
    /// Take the GPIO lock before touching the hardware
    pub use_lock: bool,
    /// Lock file path
    pub lock_path: PathBuf,
    /// Create the lock file if missing
    pub create_lock_file: bool,
    /// Arm the hardware watchdog
    pub use_watchdog: bool,
    /// Watchdog device
    pub watchdog_path: PathBuf,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            board_type: i64::from(BoardType::default().code()),
            host: None,
            port: u32::from(DEFAULT_PORT),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            use_lock: true,
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
            create_lock_file: false,
            use_watchdog: false,
            watchdog_path: PathBuf::from(DEFAULT_WATCHDOG_PATH),
        }
    }
}

impl GpioConfig {
    /// Read a TOML file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            GpioError::config_error(format!("can't read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)
            .map_err(|e| GpioError::config_error(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GpioError::config_error(e.to_string()))
    }

    /// Set the board type code.
    pub fn with_board_type(mut self, code: i64) -> Self {
        self.board_type = code;
        self
    }

    /// Set the daemon host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the daemon port.
    pub fn with_port(mut self, port: u32) -> Self {
        self.port = port;
        self
    }

    /// Set the timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable locking.
    pub fn with_lock(mut self, use_lock: bool) -> Self {
        self.use_lock = use_lock;
        self
    }

    /// Set the lock file path.
    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    /// Allow creating a missing lock file.
    pub fn with_create_lock_file(mut self, create: bool) -> Self {
        self.create_lock_file = create;
        self
    }

    /// Enable or disable the watchdog.
    pub fn with_watchdog(mut self, use_watchdog: bool) -> Self {
        self.use_watchdog = use_watchdog;
        self
    }

    /// Set the watchdog device.
    pub fn with_watchdog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.watchdog_path = path.into();
        self
    }

    pub fn board(&self) -> BoardType {
        BoardType::from_code(self.board_type)
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            create: self.create_lock_file,
        }
    }

    /// The board descriptor, with invalid values replaced by defaults.
    pub fn descriptor(&self, env: &HostEnvironment) -> BoardDescriptor {
        BoardDescriptor::describe(
            self.board(),
            self.host.as_deref(),
            self.port,
            self.timeout_ms,
            env,
        )
    }
}
