//! # pi_gpio_link - Raspberry Pi GPIO control through pigpiod
//!
//! Drives the GPIOs of a Raspberry Pi through the socket interface of the
//! pigpio daemon, either on the Pi itself or from a workstation on the same
//! network.
//!
//! ## Features
//!
//! - **Pin maps**: connector pin to GPIO tables for the 26 and 40 pin boards
//! - **Board descriptor**: board type plus daemon host, port and timeout
//! - **Protocol client**: synchronous pigpiod commands with output bookkeeping
//! - **Process guard**: an exclusive `flock` lock shared with non-Rust tools,
//!   and hardware watchdog supervision
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_gpio_link::{
//!     BoardDescriptor, BoardType, GpioControl, HostEnvironment, Level, LockOptions, Mode,
//!     ProcessGuard, ProtocolConnection, DEFAULT_LOCK_PATH,
//! };
//!
//! fn main() -> pi_gpio_link::Result<()> {
//!     let env = HostEnvironment::detect();
//!     let board = BoardDescriptor::with_defaults(BoardType::Pi3, &env);
//!     let _guard = ProcessGuard::acquire(DEFAULT_LOCK_PATH, LockOptions::default())?;
//!
//!     let mut pi = ProtocolConnection::connect(&board)?;
//!     let led = pi.gpio_for_pin("red LED", 11)?;
//!     pi.set_mode(led, Mode::Output)?.into_result()?;
//!     pi.set_output(led, Level::High)?.into_result()?;
//!     pi.release_outputs()?;
//!     pi.disconnect();
//!     Ok(())
//! }
//! ```

pub mod blink;
pub mod board;
pub mod config;
pub mod error;
pub mod guard;
pub mod protocol;

// Re-export public API
pub use blink::{BlinkSummary, Blinker, LedGpios, LedLayout};
pub use board::{
    gpio_for, pin_for, BoardDescriptor, BoardFamily, BoardType, HostEnvironment, PinFunction,
    PinMap, DEFAULT_PORT, DEFAULT_TIMEOUT_MS,
};
pub use config::GpioConfig;
pub use error::{error_text, ErrorCode, GpioError, Result};
pub use guard::{
    CycleTimer, DisarmStatus, LockHandle, LockOptions, ProcessGuard, Watchdog, DEFAULT_LOCK_PATH,
    DEFAULT_WATCHDOG_PATH,
};
pub use protocol::{Command, GpioControl, Level, Mode, ProtocolConnection, Pull, Reply};
