//! pigpiod socket interface frames, command codes and status codes.
//!
//! Every request is 16 bytes: command, p1, p2 and p3 as little endian
//! 32 bit words, p3 being the length of extension data (always 0 here).
//! Every response is 16 bytes as well, echoing command, p1 and p2 and
//! carrying the result in the last word.

/// Request and response frame size in bytes.
pub const FRAME_LEN: usize = 16;

/// Daemon command codes (the subset this crate issues).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    /// Set GPIO mode
    Modes = 0,
    /// Get GPIO mode
    Modeg = 1,
    /// Set pull up/down resistor
    Pud = 2,
    /// Read GPIO level
    Read = 3,
    /// Write GPIO level
    Write = 4,
    /// Set PWM duty cycle
    Pwm = 5,
    /// Set servo pulse width
    Servo = 8,
    /// Read GPIO bank 0..31
    Br1 = 10,
    /// Read GPIO bank 32..53
    Br2 = 11,
    /// Clear GPIOs in bank 0..31
    Bc1 = 12,
    /// Set GPIOs in bank 0..31
    Bs1 = 14,
    /// Current tick in microseconds
    Tick = 16,
    /// Hardware revision
    Hwver = 17,
    /// Daemon version
    Pigpv = 26,
    /// Get PWM duty cycle
    Gdc = 83,
    /// Get servo pulse width
    Gpw = 84,
    /// Set pad drive strength
    Pads = 102,
    /// Get pad drive strength
    Padg = 103,
}

impl Command {
    /// Wire value.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Mnemonic as used in the pigpio documentation.
    pub fn name(self) -> &'static str {
        match self {
            Command::Modes => "MODES",
            Command::Modeg => "MODEG",
            Command::Pud => "PUD",
            Command::Read => "READ",
            Command::Write => "WRITE",
            Command::Pwm => "PWM",
            Command::Servo => "SERVO",
            Command::Br1 => "BR1",
            Command::Br2 => "BR2",
            Command::Bc1 => "BC1",
            Command::Bs1 => "BS1",
            Command::Tick => "TICK",
            Command::Hwver => "HWVER",
            Command::Pigpv => "PIGPV",
            Command::Gdc => "GDC",
            Command::Gpw => "GPW",
            Command::Pads => "PADS",
            Command::Padg => "PADG",
        }
    }

    /// Commands whose result is an unsigned 32 bit value, never an error.
    pub fn returns_unsigned(self) -> bool {
        matches!(
            self,
            Command::Br1 | Command::Br2 | Command::Tick | Command::Hwver | Command::Pigpv
        )
    }
}

/// GPIO modes for [`Command::Modes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Input = 0,
    Output = 1,
    Alt5 = 2,
    Alt4 = 3,
    Alt0 = 4,
    Alt1 = 5,
    Alt2 = 6,
    Alt3 = 7,
}

impl Mode {
    /// Mode for a raw MODEG result.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Mode::Input,
            1 => Mode::Output,
            2 => Mode::Alt5,
            3 => Mode::Alt4,
            4 => Mode::Alt0,
            5 => Mode::Alt1,
            6 => Mode::Alt2,
            7 => Mode::Alt3,
            _ => return None,
        })
    }
}

/// Pull resistor settings for [`Command::Pud`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pull {
    Off = 0,
    Down = 1,
    Up = 2,
}

/// Output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Daemon status codes this crate checks or produces locally.
pub mod status {
    pub const OK: i32 = 0;
    pub const BAD_USER_GPIO: i32 = -2;
    pub const BAD_GPIO: i32 = -3;
    pub const BAD_MODE: i32 = -4;
    pub const BAD_LEVEL: i32 = -5;
    pub const BAD_PUD: i32 = -6;
    pub const BAD_PULSEWIDTH: i32 = -7;
    pub const BAD_DUTYCYCLE: i32 = -8;
    pub const NOT_PERMITTED: i32 = -41;
    pub const SOCK_READ_FAILED: i32 = -59;
    pub const SOCK_WRIT_FAILED: i32 = -60;
    pub const UNKNOWN_COMMAND: i32 = -88;
    pub const NOT_PWM_GPIO: i32 = -92;
    pub const NOT_SERVO_GPIO: i32 = -93;
    pub const BAD_PAD: i32 = -126;
    pub const BAD_STRENGTH: i32 = -127;
    pub const SOCK_READ_LEN: i32 = -3059;
}

/// Description of the daemon status codes -1..=-143 in numeric order.
static STATUS_TEXT: [&str; 143] = [
    "pigpio initialisation failed",
    "GPIO not 0..31",
    "GPIO not 0..53",
    "mode not 0..7",
    "level not 0 or 1",
    "pud not 0..2",
    "pulsewidth not 0 or 500..2500",
    "dutycycle not in range (default 0..255)",
    "timer not 0..9",
    "ms not 10..60000",
    "timetype not 0 or 1",
    "seconds < 0",
    "micros not 0..999999",
    "gpioSetTimerFunc failed",
    "timeout not 0..60000",
    "deprecated",
    "clock peripheral not 0 or 1",
    "deprecated",
    "clock micros not 1, 2, 4, 5, 8 or 10",
    "buf millis not 100..10000",
    "dutycycle range not 25..40000",
    "signum not 0..63",
    "can't open pathname",
    "no handle available",
    "unknown handle",
    "ifFlags > 3",
    "DMA channel not 0..14",
    "socket port not 1024..30000",
    "unknown fifo command",
    "DMA secondary channel not 0..14",
    "function called before gpioInitialise",
    "function called after gpioInitialise",
    "waveform mode not 0..3",
    "bad parameter in gpioCfgInternals call",
    "baud rate not 50-250000(RX)/1000000(TX)",
    "waveform has too many pulses",
    "waveform has too many chars",
    "no bit bang serial read in progress on GPIO",
    "bad (null) serial structure parameter",
    "bad (null) serial buf parameter",
    "GPIO operation not permitted",
    "one or more GPIO not permitted",
    "bad WVSC subcommand",
    "bad WVSM subcommand",
    "bad WVSP subcommand",
    "trigger pulse length not 1..100",
    "invalid script",
    "unknown script id",
    "add serial data offset > 30 min",
    "GPIO already in use",
    "must read at least a byte at a time",
    "script parameter id not 0..9",
    "script has duplicate tag",
    "script has too many tags",
    "illegal script command",
    "script variable id not 0..149",
    "no more room for scripts",
    "can't allocate temporary memory",
    "socket read failed",
    "socket write failed",
    "too many script parameters (> 10)",
    "script initialising",
    "script has unresolved tag",
    "bad MICS delay (too large)",
    "bad MILS delay (too large)",
    "non existent wave id",
    "No more CBs for waveform",
    "No more OOL for waveform",
    "attempt to create an empty waveform",
    "No more waveform ids",
    "can't open I2C device",
    "can't open serial device",
    "can't open SPI device",
    "bad I2C bus",
    "bad I2C address",
    "bad SPI channel",
    "bad i2c/spi/ser open flags",
    "bad SPI speed",
    "bad serial device name",
    "bad serial baud rate",
    "bad i2c/spi/ser parameter",
    "i2c write failed",
    "i2c read failed",
    "bad SPI count",
    "ser write failed",
    "ser read failed",
    "ser read no data available",
    "unknown command",
    "spi xfer/read/write failed",
    "bad (NULL) pointer",
    "no auxiliary SPI on Pi A or B",
    "GPIO is not in use for PWM",
    "GPIO is not in use for servo pulses",
    "GPIO has no hardware clock",
    "GPIO has no hardware PWM",
    "hardware PWM frequency not 1-125M",
    "hardware PWM dutycycle not 0-1M",
    "hardware clock frequency not 4689-250M",
    "need password to use hardware clock 1",
    "illegal, PWM in use for main clock",
    "serial data bits not 1-32",
    "serial (half) stop bits not 2-8",
    "socket/pipe message too big",
    "bad memory allocation mode",
    "too many I2C transaction segments",
    "an I2C transaction segment failed",
    "SMBus command not supported by driver",
    "no bit bang I2C in progress on GPIO",
    "bad I2C write length",
    "bad I2C read length",
    "bad I2C command",
    "bad I2C baud rate, not 50-500k",
    "bad chain loop count",
    "empty chain loop",
    "too many chain counters",
    "bad chain command",
    "bad chain delay micros",
    "chain counters nested too deeply",
    "chain is too long",
    "deprecated function removed",
    "bit bang serial invert not 0 or 1",
    "bad ISR edge value, not 0-2",
    "bad ISR initialisation",
    "loop forever must be last command",
    "bad filter parameter",
    "bad pad number",
    "bad pad drive strength",
    "file open failed",
    "bad file mode",
    "bad file flag",
    "bad file read",
    "bad file write",
    "file not open for read",
    "file not open for write",
    "bad file seek",
    "no files match pattern",
    "no permission to access file",
    "file is a directory",
    "bad shell return status",
    "bad script name",
    "bad SPI baud rate, not 50-500k",
    "no bit bang SPI in progress on GPIO",
    "bad event id",
];

/// Stable text for a status; non-negative statuses are "OK".
pub fn status_text(status: i32) -> &'static str {
    if status >= 0 {
        return "OK";
    }
    if status == status::SOCK_READ_LEN {
        return "socket read wrong length";
    }
    STATUS_TEXT
        .get((-(status as i64) - 1) as usize)
        .copied()
        .unwrap_or("unknown error")
}

/// [`status_text`] for a borrowed status.
pub fn describe_status(status: &i32) -> &'static str {
    status_text(*status)
}

/// Encode a request frame.
pub fn encode_command(command: u32, p1: u32, p2: u32, p3: u32) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0..4].copy_from_slice(&command.to_le_bytes());
    frame[4..8].copy_from_slice(&p1.to_le_bytes());
    frame[8..12].copy_from_slice(&p2.to_le_bytes());
    frame[12..16].copy_from_slice(&p3.to_le_bytes());
    frame
}

/// A decoded frame: four little endian words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub command: u32,
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
}

impl Frame {
    /// Decode 16 bytes.
    pub fn decode(bytes: &[u8; FRAME_LEN]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            command: word(0),
            p1: word(4),
            p2: word(8),
            p3: word(12),
        }
    }

    /// Encode to 16 bytes.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        encode_command(self.command, self.p1, self.p2, self.p3)
    }

    /// The result word of a response, as signed status.
    pub fn status(&self) -> i32 {
        self.p3 as i32
    }
}
