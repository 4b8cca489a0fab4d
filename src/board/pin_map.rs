//! Static connector pin to GPIO tables, one per board layout.
//!
//! Physical pins are numbered as printed on the connector (1..=40). The
//! 8 pin P5 connector of the second revision Pi 1 is mapped onto the
//! otherwise unused numbers 31..=38. Pin 0 never exists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a physical connector pin carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PinFunction {
    /// A GPIO line with this BCM number
    Gpio(u8),
    /// Ground, 0V
    Ground,
    /// 3.3V supply rail
    Power3V3,
    /// 5V supply rail
    Power5V,
    /// HAT ID EEPROM interface, reserved
    IdEeprom,
    /// No such pin on this connector
    NotPresent,
}

impl PinFunction {
    /// The GPIO number, if this pin is a usable GPIO line.
    pub fn gpio(self) -> Option<u32> {
        match self {
            PinFunction::Gpio(gpio) => Some(gpio as u32),
            _ => None,
        }
    }

    /// Whether this is one of the reserved (non GPIO) codes.
    pub fn is_sentinel(self) -> bool {
        self.gpio().is_none()
    }
}

impl fmt::Display for PinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinFunction::Gpio(gpio) => write!(f, "GPIO{:02}", gpio),
            PinFunction::Ground => f.write_str("gnd"),
            PinFunction::Power3V3 => f.write_str("3V3"),
            PinFunction::Power5V => f.write_str("5V0"),
            PinFunction::IdEeprom => f.write_str("ID"),
            PinFunction::NotPresent => f.write_str("none"),
        }
    }
}

/// Both lookup directions for one connector layout.
///
/// `pin_to_gpio` is indexed by pin number (index 0 unused), `gpio_to_pin`
/// by GPIO number with 0 meaning "not on the connector".
#[derive(Debug)]
pub struct PinMap {
    pin_to_gpio: &'static [PinFunction],
    gpio_to_pin: &'static [u8],
}

impl PinMap {
    /// Highest connector pin number in this layout.
    pub fn max_pin(&self) -> u32 {
        (self.pin_to_gpio.len() - 1) as u32
    }

    /// Highest GPIO number the table knows about.
    pub fn max_gpio(&self) -> u32 {
        (self.gpio_to_pin.len() - 1) as u32
    }

    /// Connector pin for a GPIO; 0 if the GPIO is not on the connector.
    pub fn pin_for(&self, gpio: u32) -> u32 {
        self.gpio_to_pin
            .get(gpio as usize)
            .map(|&pin| pin as u32)
            .unwrap_or(0)
    }

    /// Function of a connector pin; `NotPresent` when out of range.
    pub fn gpio_for(&self, pin: u32) -> PinFunction {
        if pin == 0 {
            return PinFunction::NotPresent;
        }
        self.pin_to_gpio
            .get(pin as usize)
            .copied()
            .unwrap_or(PinFunction::NotPresent)
    }

    /// All pins `1..=max_pin` with their function.
    pub fn pins(&self) -> impl Iterator<Item = (u32, PinFunction)> + '_ {
        self.pin_to_gpio
            .iter()
            .enumerate()
            .skip(1)
            .map(|(pin, function)| (pin as u32, *function))
    }
}

use PinFunction::{Gpio, Ground as GND, IdEeprom as ID, NotPresent as NP, Power3V3 as P3, Power5V as P5};

/// 40 pin connector: Pi Zero, Pi 3, Pi 4.
pub static HEADER_40: PinMap = PinMap {
    pin_to_gpio: &[
        NP, // 0
        P3, P5, Gpio(2), P5, Gpio(3), GND, Gpio(4), Gpio(14), GND, Gpio(15), // 1..10
        Gpio(17), Gpio(18), Gpio(27), GND, Gpio(22), Gpio(23), P3, Gpio(24), Gpio(10), GND, // 11..20
        Gpio(9), Gpio(25), Gpio(11), Gpio(8), GND, Gpio(7), ID, ID, Gpio(5), GND, // 21..30
        Gpio(6), Gpio(12), Gpio(13), GND, Gpio(19), Gpio(16), Gpio(26), Gpio(20), GND, Gpio(21), // 31..40
    ],
    gpio_to_pin: &[
        27, 28, 3, 5, 7, 29, 31, 26, 24, 21, // 0..9
        19, 23, 32, 33, 8, 10, 36, 11, 12, 35, // 10..19
        38, 40, 15, 16, 18, 22, 37, 13, 0, 0, // 20..29
        0, 0, // 30..31
    ],
};

/// 26 pin connector of the first revision Pi 1.
pub static HEADER_26_REV1: PinMap = PinMap {
    pin_to_gpio: &[
        NP, // 0
        P3, P5, Gpio(0), P5, Gpio(1), GND, Gpio(4), Gpio(14), GND, Gpio(15), // 1..10
        Gpio(17), Gpio(18), Gpio(21), GND, Gpio(22), Gpio(23), P3, Gpio(24), Gpio(10), GND, // 11..20
        Gpio(9), Gpio(25), Gpio(11), Gpio(8), GND, Gpio(7), // 21..26
    ],
    gpio_to_pin: &[
        3, 5, 0, 0, 7, 0, 0, 26, 24, 21, // 0..9
        19, 23, 0, 0, 8, 10, 0, 11, 12, 0, // 10..19
        0, 13, 15, 16, 18, 22, // 20..25
    ],
};

/// 26 pin connector plus P5 (as pins 31..38) of the second revision Pi 1.
pub static HEADER_26_REV2: PinMap = PinMap {
    pin_to_gpio: &[
        NP, // 0
        P3, P5, Gpio(2), P5, Gpio(3), GND, Gpio(4), Gpio(14), GND, Gpio(15), // 1..10
        Gpio(17), Gpio(18), Gpio(21), GND, Gpio(22), Gpio(23), P3, Gpio(24), Gpio(10), GND, // 11..20
        Gpio(9), Gpio(25), Gpio(11), Gpio(8), GND, Gpio(7), NP, NP, NP, NP, // 21..30
        P5, P3, Gpio(28), Gpio(29), Gpio(30), Gpio(31), GND, GND, // 31..38 (P5)
    ],
    gpio_to_pin: &[
        0, 0, 3, 5, 7, 0, 0, 26, 24, 21, // 0..9
        19, 23, 0, 0, 8, 10, 0, 11, 12, 0, // 10..19
        0, 13, 15, 16, 18, 22, 0, 0, 33, 34, // 20..29
        35, 36, // 30..31
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn all_maps() -> [&'static PinMap; 3] {
        [&HEADER_40, &HEADER_26_REV1, &HEADER_26_REV2]
    }

    #[test]
    fn test_tables_are_mutual_inverses() {
        for map in all_maps() {
            for (pin, function) in map.pins() {
                if let Some(gpio) = function.gpio() {
                    assert_eq!(map.pin_for(gpio), pin, "pin {} / {}", pin, function);
                }
            }
            for gpio in 0..=map.max_gpio() {
                let pin = map.pin_for(gpio);
                if pin != 0 {
                    let back = map.gpio_for(pin);
                    assert!(
                        back == PinFunction::Gpio(gpio as u8) || back == PinFunction::IdEeprom,
                        "GPIO{} -> pin {} -> {}",
                        gpio,
                        pin,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_connector_sizes() {
        assert_eq!(HEADER_40.max_pin(), 40);
        assert_eq!(HEADER_26_REV1.max_pin(), 26);
        assert_eq!(HEADER_26_REV2.max_pin(), 38);
        assert_eq!(HEADER_40.max_gpio(), 31);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(HEADER_40.gpio_for(0), PinFunction::NotPresent);
        assert_eq!(HEADER_40.gpio_for(41), PinFunction::NotPresent);
        assert_eq!(HEADER_26_REV1.gpio_for(27), PinFunction::NotPresent);
        assert_eq!(HEADER_26_REV2.gpio_for(29), PinFunction::NotPresent);
        assert_eq!(HEADER_40.pin_for(53), 0);
        assert_eq!(HEADER_26_REV1.pin_for(27), 0);
    }

    #[test]
    fn test_function_display() {
        assert_eq!(PinFunction::Gpio(7).to_string(), "GPIO07");
        assert_eq!(PinFunction::Ground.to_string(), "gnd");
        assert_eq!(PinFunction::Power5V.to_string(), "5V0");
        assert!(PinFunction::IdEeprom.is_sentinel());
        assert!(!PinFunction::Gpio(0).is_sentinel());
    }
}
