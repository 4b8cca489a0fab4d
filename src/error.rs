//! Error handling for the pi_gpio_link crate.

use crate::board::PinFunction;
use std::fmt;
use std::path::PathBuf;

/// A specialized `Result` type for pi_gpio_link operations.
pub type Result<T> = std::result::Result<T, GpioError>;

/// The main error type for GPIO control operations.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// A connector pin does not lead to a GPIO on this board
    #[error("pin {pin} for {label} is {function}")]
    InvalidPin {
        label: String,
        pin: u32,
        function: PinFunction,
    },

    /// The GPIO exists but may not be driven through the daemon
    #[error("GPIO{gpio} for {label} is not usable (allowed 0..={max})")]
    GpioNotUsable { label: String, gpio: u32, max: u32 },

    /// Connecting to the daemon failed
    #[error("can't connect pigpiod at {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Connect, write or read exceeded the configured timeout
    #[error("pigpiod at {endpoint} timed out: {source}")]
    Timeout {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The socket failed in the middle of a command exchange
    #[error("socket exchange with pigpiod at {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The daemon (or local validation) rejected a command
    #[error("command {command}({p1}, {p2}) rejected: {status} {}", crate::protocol::describe_status(.status))]
    Protocol {
        command: &'static str,
        p1: u32,
        p2: u32,
        status: i32,
    },

    /// Lock file missing and not creatable
    #[error("no lock file {}: {source}", .path.display())]
    NoLockFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the lock
    #[error("lock file {} is held by another process", .path.display())]
    AlreadyLocked { path: PathBuf },

    /// I/O failure while taking the lock
    #[error("locking {} failed: {source}", .path.display())]
    LockFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Watchdog device could not be opened, triggered or closed
    #[error("watchdog {} {operation} failed: {source}", .path.display())]
    Watchdog {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GpioError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a protocol error from a command status
    pub fn protocol_error(command: &'static str, p1: u32, p2: u32, status: i32) -> Self {
        Self::Protocol {
            command,
            p1,
            p2,
            status,
        }
    }

    /// The stable error code for this error, used as process exit value.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPin { .. } | Self::GpioNotUsable { .. } => ErrorCode::AssignPin,
            Self::Connection { .. } | Self::Timeout { .. } | Self::Transport { .. } => {
                ErrorCode::PigpiodConnection
            }
            Self::Protocol { .. } => ErrorCode::PigpiodCommand,
            Self::NoLockFile { .. } => ErrorCode::NoLockFile,
            Self::AlreadyLocked { .. } => ErrorCode::NotLocked,
            Self::LockFailed { .. } => ErrorCode::LockFailed,
            Self::Watchdog { operation, .. } => {
                if *operation == "close" {
                    ErrorCode::CloseWatchdog
                } else {
                    ErrorCode::OpenWatchdog
                }
            }
            Self::Config(_) | Self::Io(_) => ErrorCode::Config,
        }
    }

    /// Whether this error stems from a timeout on the daemon socket.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Stable error codes shared with the C and Java tools on the same Pi.
///
/// The numeric values are used as process exit codes; 97 and 98 are the
/// exit values of the `justLock` helper and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Configuration or usage problem
    Config = 1,
    /// Daemon connection failed
    PigpiodConnection = 85,
    /// Pin assignment invalid for the board
    AssignPin = 86,
    /// Daemon rejected a command that was essential
    PigpiodCommand = 87,
    /// Locking failed for another reason than contention
    LockFailed = 96,
    /// Lock file missing
    NoLockFile = 97,
    /// Lock held by another process
    NotLocked = 98,
    /// Watchdog device could not be opened
    OpenWatchdog = 100,
    /// Watchdog device could not be closed
    CloseWatchdog = 101,
}

impl ErrorCode {
    /// All defined codes.
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::Config,
        ErrorCode::PigpiodConnection,
        ErrorCode::AssignPin,
        ErrorCode::PigpiodCommand,
        ErrorCode::LockFailed,
        ErrorCode::NoLockFile,
        ErrorCode::NotLocked,
        ErrorCode::OpenWatchdog,
        ErrorCode::CloseWatchdog,
    ];

    /// Numeric value, suitable for `std::process::exit`.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Look up a code by its numeric value.
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_i32() == value)
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Config => "configuration error",
            ErrorCode::PigpiodConnection => "can't connect pigpioD",
            ErrorCode::AssignPin => "no IO pin",
            ErrorCode::PigpiodCommand => "pigpioD command failed",
            ErrorCode::LockFailed => "lock attempt failed",
            ErrorCode::NoLockFile => "no lock file",
            ErrorCode::NotLocked => "can't lock the lock file",
            ErrorCode::OpenWatchdog => "can't open watchdog",
            ErrorCode::CloseWatchdog => "can't close watchdog",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

/// Error text for any numeric code; `""` for 0.
pub fn error_text(code: i32) -> String {
    if code == 0 {
        return String::new();
    }
    match ErrorCode::from_i32(code) {
        Some(known) => known.description().to_string(),
        None => format!("error {}", code),
    }
}
