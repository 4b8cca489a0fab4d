//! Client side of the pigpiod socket interface.
//!
//! A [`ProtocolConnection`] serializes command/response exchanges on one TCP
//! stream and remembers which GPIOs it drove as outputs so they can be
//! returned to input mode on shutdown.

pub mod client;
pub mod frame;

// Re-export commonly used items
pub use client::{log_command, log_if_bad, GpioControl, ProtocolConnection, Reply, MAX_GPIO, MAX_USER_GPIO};
pub use frame::{describe_status, status, status_text, Command, Level, Mode, Pull};
