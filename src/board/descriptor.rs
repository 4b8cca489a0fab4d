//! Board variants and the descriptor of one connected board.

use crate::board::host::HostEnvironment;
use crate::board::pin_map::{PinFunction, PinMap, HEADER_26_REV1, HEADER_26_REV2, HEADER_40};
use crate::error::{GpioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Default pigpiod port.
pub const DEFAULT_PORT: u16 = 8888;

/// Default connect and read timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

/// Accepted port range; anything else falls back to [`DEFAULT_PORT`].
pub const PORT_RANGE: std::ops::RangeInclusive<u32> = 20..=65535;

/// Accepted timeout range; anything else falls back to [`DEFAULT_TIMEOUT_MS`].
pub const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u32> = 300..=50_000;

/// Hardware revision family sharing one pin layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum BoardType {
    /// Pi Zero (40 pin)
    Zero,
    /// Pi 1 first revision (26 pin)
    Pi1,
    /// Pi 1 second revision (26 pin + P5)
    Pi2,
    /// Pi 3 and most others (40 pin)
    #[default]
    Pi3,
    /// Pi 4 (40 pin)
    Pi4,
}

impl BoardType {
    /// Map the numeric type code; unknown codes become [`BoardType::Pi3`].
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => BoardType::Zero,
            1 => BoardType::Pi1,
            2 => BoardType::Pi2,
            4 => BoardType::Pi4,
            _ => BoardType::Pi3,
        }
    }

    /// Numeric type code.
    pub fn code(self) -> u8 {
        match self {
            BoardType::Zero => 0,
            BoardType::Pi1 => 1,
            BoardType::Pi2 => 2,
            BoardType::Pi3 => 3,
            BoardType::Pi4 => 4,
        }
    }

    /// The layout record for this type.
    pub fn family(self) -> &'static BoardFamily {
        match self {
            BoardType::Pi1 => &FAMILIES[0],
            BoardType::Pi2 => &FAMILIES[1],
            BoardType::Zero | BoardType::Pi3 | BoardType::Pi4 => &FAMILIES[2],
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pi{}", self.code())
    }
}

/// One pin layout shared by a group of board types.
#[derive(Debug)]
pub struct BoardFamily {
    /// Display name
    pub name: &'static str,
    /// Pin tables
    pub pins: &'static PinMap,
}

/// Adding a board layout means adding one entry here.
static FAMILIES: [BoardFamily; 3] = [
    BoardFamily {
        name: "26 pin connector, revision 1",
        pins: &HEADER_26_REV1,
    },
    BoardFamily {
        name: "26 pin connector + P5, revision 2",
        pins: &HEADER_26_REV2,
    },
    BoardFamily {
        name: "40 pin connector",
        pins: &HEADER_40,
    },
];

impl BoardFamily {
    /// All connector pins with their function, for listings.
    pub fn connector(&self) -> Vec<(u32, PinFunction)> {
        self.pins.pins().collect()
    }
}

/// Connector pin for `gpio` on `board`; 0 if there is none.
pub fn pin_for(board: BoardType, gpio: u32) -> u32 {
    board.family().pins.pin_for(gpio)
}

/// Function of connector `pin` on `board`.
pub fn gpio_for(board: BoardType, pin: u32) -> PinFunction {
    board.family().pins.gpio_for(pin)
}

/// One target board and how to reach its pigpiod.
///
/// Two descriptors are equal when their board type is equal, whatever their
/// connection endpoint. Always connect with the descriptor actually
/// configured for the target. Only [`describe`](Self::describe) builds one,
/// so it is serialized but never deserialized.
#[derive(Debug, Clone, Serialize)]
pub struct BoardDescriptor {
    board_type: BoardType,
    host: String,
    port: u16,
    timeout_ms: u32,
}

impl BoardDescriptor {
    /// Build a descriptor, replacing invalid connection values by defaults.
    ///
    /// Hosts shorter than 3 characters are treated as absent.
    pub fn describe(
        board_type: BoardType,
        host: Option<&str>,
        port: u32,
        timeout_ms: u32,
        env: &HostEnvironment,
    ) -> Self {
        let host = match host.map(str::trim) {
            Some(h) if h.len() >= 3 => h.to_string(),
            _ => env.default_daemon_host(),
        };
        let port = if PORT_RANGE.contains(&port) {
            port as u16
        } else {
            DEFAULT_PORT
        };
        let timeout_ms = if TIMEOUT_RANGE_MS.contains(&timeout_ms) {
            timeout_ms
        } else {
            DEFAULT_TIMEOUT_MS
        };

        Self {
            board_type,
            host,
            port,
            timeout_ms,
        }
    }

    /// Descriptor with default connection values.
    pub fn with_defaults(board_type: BoardType, env: &HostEnvironment) -> Self {
        Self::describe(board_type, None, 0, 0, env)
    }

    pub fn board_type(&self) -> BoardType {
        self.board_type
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// `host:port` of the daemon.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connector pin for a GPIO on this board; 0 if none.
    pub fn pin_for(&self, gpio: u32) -> u32 {
        pin_for(self.board_type, gpio)
    }

    /// GPIO on connector `pin`, or an error naming the signal `label`.
    pub fn gpio_for_pin(&self, label: &str, pin: u32) -> Result<u32> {
        let function = gpio_for(self.board_type, pin);
        function.gpio().ok_or_else(|| GpioError::InvalidPin {
            label: label.to_string(),
            pin,
            function,
        })
    }

    /// As [`gpio_for_pin`](Self::gpio_for_pin), also requiring the GPIO to be
    /// at most `max_gpio`.
    pub fn gpio_for_pin_checked(&self, label: &str, pin: u32, max_gpio: u32) -> Result<u32> {
        let gpio = self.gpio_for_pin(label, pin)?;
        if gpio > max_gpio {
            return Err(GpioError::GpioNotUsable {
                label: label.to_string(),
                gpio,
                max: max_gpio,
            });
        }
        Ok(gpio)
    }
}

impl PartialEq for BoardDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.board_type == other.board_type
    }
}

impl Eq for BoardDescriptor {}

impl Hash for BoardDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.board_type.hash(state);
    }
}

impl fmt::Display for BoardDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pigpiod: {}:{} {}", self.host, self.port, self.board_type)
    }
}
