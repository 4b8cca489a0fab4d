//! Board variants, their connector pin tables and the daemon connection
//! parameters of one target board.
//!
//! The pin tables are static and read-only, so they can be shared freely
//! between threads and connections.

pub mod descriptor;
pub mod host;
pub mod pin_map;

// Re-export commonly used items
pub use descriptor::{
    gpio_for, pin_for, BoardDescriptor, BoardFamily, BoardType, DEFAULT_PORT, DEFAULT_TIMEOUT_MS,
};
pub use host::HostEnvironment;
pub use pin_map::{PinFunction, PinMap};
