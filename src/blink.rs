//! Red, yellow and green LED blinker, the smoke test for a wired Pi.
//!
//! One cycle lasts 600 ms: red for 200 ms, red and green for 100 ms, green
//! for 100 ms, then 200 ms dark. Yellow toggles once per cycle.

use crate::board::BoardDescriptor;
use crate::error::{GpioError, Result};
use crate::guard::{CycleTimer, ProcessGuard};
use crate::protocol::{log_if_bad, GpioControl, Level, Mode, Pull, MAX_USER_GPIO};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Time slice the cycle is built from.
pub const STEP: Duration = Duration::from_millis(100);

/// Steps per cycle.
pub const STEPS_PER_CYCLE: u32 = 6;

/// Drive strength for pad group 0 while blinking, in mA.
const LED_DRIVE_MA: u32 = 14;

/// Where the three LEDs are wired, by connector pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LedLayout {
    #[default]
    Default,
    /// piTraffic south
    South,
    /// piTraffic north
    North,
    /// piTraffic east
    East,
    /// piTraffic west
    West,
}

impl LedLayout {
    /// Connector pins of the red, yellow and green LED.
    pub fn pins(self) -> [u32; 3] {
        match self {
            LedLayout::Default => [11, 22, 13],
            LedLayout::South => [11, 13, 15],
            LedLayout::North => [29, 31, 33],
            LedLayout::East => [36, 38, 40],
            LedLayout::West => [16, 18, 22],
        }
    }

    /// GPIOs of the LEDs on `board`.
    pub fn resolve(self, board: &BoardDescriptor) -> Result<LedGpios> {
        let [red, yellow, green] = self.pins();
        Ok(LedGpios {
            red: board.gpio_for_pin_checked("red LED", red, MAX_USER_GPIO)?,
            yellow: board.gpio_for_pin_checked("yellow LED", yellow, MAX_USER_GPIO)?,
            green: board.gpio_for_pin_checked("green LED", green, MAX_USER_GPIO)?,
        })
    }
}

impl fmt::Display for LedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedLayout::Default => "default",
            LedLayout::South => "south",
            LedLayout::North => "north",
            LedLayout::East => "east",
            LedLayout::West => "west",
        };
        f.write_str(name)
    }
}

impl FromStr for LedLayout {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(LedLayout::Default),
            "south" => Ok(LedLayout::South),
            "north" => Ok(LedLayout::North),
            "east" => Ok(LedLayout::East),
            "west" => Ok(LedLayout::West),
            other => Err(GpioError::config_error(format!("unknown LED layout: {}", other))),
        }
    }
}

/// GPIO numbers of the three LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedGpios {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
}

/// Current LED states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedState {
    pub red: bool,
    pub yellow: bool,
    pub green: bool,
}

/// What a finished run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkSummary {
    /// When the loop started
    pub started_at: DateTime<Utc>,
    /// When the loop stopped
    pub stopped_at: DateTime<Utc>,
    /// Completed 600 ms cycles
    pub cycles: u64,
    /// Steps that ended late
    pub overruns: u64,
    /// Commands the daemon rejected
    pub failed_commands: u64,
    /// Outputs returned to input mode at the end
    pub released: Vec<u32>,
}

/// Drives the LEDs through one [`GpioControl`].
#[derive(Debug)]
pub struct Blinker<C: GpioControl> {
    control: C,
    leds: LedGpios,
    state: LedState,
    step: u32,
    failed_commands: u64,
}

impl<C: GpioControl> Blinker<C> {
    /// Make the LED GPIOs outputs. A rejected setup command is an error.
    pub fn new(mut control: C, leds: LedGpios) -> Result<Self> {
        for gpio in [leds.red, leds.green, leds.yellow] {
            control.set_mode(gpio, Mode::Output)?.into_result()?;
        }
        // Pull up and drive strength are cosmetic; report but carry on.
        log_if_bad(&control.set_pull_resistor(leds.green, Pull::Up)?);
        log_if_bad(&control.set_drive_strength(0, LED_DRIVE_MA)?);

        info!(
            "LEDs red GPIO{} yellow GPIO{} green GPIO{}",
            leds.red, leds.yellow, leds.green
        );
        Ok(Self {
            control,
            leds,
            state: LedState::default(),
            step: 0,
            failed_commands: 0,
        })
    }

    pub fn state(&self) -> LedState {
        self.state
    }

    /// Completed cycles so far.
    pub fn cycles(&self) -> u64 {
        u64::from(self.step / STEPS_PER_CYCLE)
    }

    pub fn failed_commands(&self) -> u64 {
        self.failed_commands
    }

    fn drive(&mut self, gpio: u32, on: bool) -> Result<()> {
        let reply = self.control.set_output(gpio, Level::from(on))?;
        if log_if_bad(&reply) {
            self.failed_commands += 1;
        }
        Ok(())
    }

    /// Perform the actions due at the start of the current step and
    /// advance by one step.
    pub fn step(&mut self) -> Result<()> {
        match self.step % STEPS_PER_CYCLE {
            0 => {
                self.state.red = true;
                self.drive(self.leds.red, true)?;
            }
            2 => {
                self.state.yellow = !self.state.yellow;
                self.drive(self.leds.yellow, self.state.yellow)?;
                self.state.green = true;
                self.drive(self.leds.green, true)?;
            }
            3 => {
                self.state.red = false;
                self.drive(self.leds.red, false)?;
            }
            4 => {
                self.state.green = false;
                self.drive(self.leds.green, false)?;
            }
            _ => {}
        }
        self.step += 1;
        Ok(())
    }

    /// Switch all LEDs off and release the outputs, giving back the control.
    pub fn finish(mut self) -> Result<(C, Vec<u32>)> {
        for gpio in [self.leds.red, self.leds.yellow, self.leds.green] {
            if let Err(e) = self.drive(gpio, false) {
                warn!("Switching GPIO{} off failed: {}", gpio, e);
            }
        }
        self.state = LedState::default();
        let released = self.control.release_outputs()?;
        Ok((self.control, released))
    }

    /// Blink until `stop` is set or `max_cycles` cycles are done, triggering
    /// the guard's watchdog once per cycle. Outputs are released on every
    /// exit path.
    pub fn run(
        mut self,
        stop: &AtomicBool,
        mut guard: Option<&mut ProcessGuard>,
        max_cycles: Option<u64>,
    ) -> Result<(C, BlinkSummary)> {
        let started_at = Utc::now();
        let mut timer = CycleTimer::new(STEP);

        let outcome = loop {
            if stop.load(Ordering::SeqCst) || max_cycles.is_some_and(|max| self.cycles() >= max) {
                break Ok(());
            }
            if self.step % STEPS_PER_CYCLE == 0 {
                if let Some(guard) = guard.as_deref_mut() {
                    if let Err(e) = guard.trigger_watchdog() {
                        break Err(e);
                    }
                }
            }
            if let Err(e) = self.step() {
                break Err(e);
            }
            timer.wait();
        };

        let cycles = self.cycles();
        let failed_commands = self.failed_commands;
        let finished = self.finish();
        outcome?;
        let (control, released) = finished?;

        let summary = BlinkSummary {
            started_at,
            stopped_at: Utc::now(),
            cycles,
            overruns: timer.overruns(),
            failed_commands,
            released,
        };
        info!(
            "Blinked {} cycles, {} overruns, {} failed commands",
            summary.cycles, summary.overruns, summary.failed_commands
        );
        Ok((control, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardType, HostEnvironment};
    use crate::protocol::{status, Command, Reply};

    /// Records every call and answers with status 0.
    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<(Command, u32, u32)>,
        claimed: Vec<u32>,
        reject_writes: bool,
    }

    impl Recorder {
        fn reply(&mut self, command: Command, p1: u32, p2: u32, status: i32) -> Result<Reply> {
            self.calls.push((command, p1, p2));
            Ok(Reply {
                command,
                p1,
                p2,
                status,
                local: false,
            })
        }
    }

    impl GpioControl for Recorder {
        fn set_mode(&mut self, gpio: u32, mode: Mode) -> Result<Reply> {
            if mode == Mode::Output {
                self.claimed.push(gpio);
            }
            self.reply(Command::Modes, gpio, mode as u32, 0)
        }

        fn set_output(&mut self, gpio: u32, level: Level) -> Result<Reply> {
            let status = if self.reject_writes { status::NOT_PERMITTED } else { 0 };
            self.reply(Command::Write, gpio, level as u32, status)
        }

        fn set_pull_resistor(&mut self, gpio: u32, pull: Pull) -> Result<Reply> {
            self.reply(Command::Pud, gpio, pull as u32, 0)
        }

        fn set_drive_strength(&mut self, pad: u32, milliamps: u32) -> Result<Reply> {
            self.reply(Command::Pads, pad, milliamps, 0)
        }

        fn release_outputs(&mut self) -> Result<Vec<u32>> {
            Ok(std::mem::take(&mut self.claimed))
        }
    }

    const LEDS: LedGpios = LedGpios {
        red: 17,
        yellow: 25,
        green: 27,
    };

    fn writes(recorder: &Recorder) -> Vec<(u32, u32)> {
        recorder
            .calls
            .iter()
            .filter(|(command, _, _)| *command == Command::Write)
            .map(|&(_, gpio, level)| (gpio, level))
            .collect()
    }

    #[test]
    fn test_layout_resolves_on_40_pin_board() {
        let board = BoardDescriptor::with_defaults(BoardType::Pi3, &HostEnvironment::on_pi());
        assert_eq!(LedLayout::Default.resolve(&board).unwrap(), LEDS);
        let west = LedLayout::West.resolve(&board).unwrap();
        assert_eq!((west.red, west.yellow, west.green), (23, 24, 25));
    }

    #[test]
    fn test_layout_fails_on_26_pin_board() {
        let board = BoardDescriptor::with_defaults(BoardType::Pi1, &HostEnvironment::on_pi());
        let err = LedLayout::North.resolve(&board).unwrap_err();
        assert!(matches!(err, GpioError::InvalidPin { pin: 29, .. }));
        assert!(err.to_string().contains("red LED"));
    }

    #[test]
    fn test_layout_names() {
        assert_eq!("East".parse::<LedLayout>().unwrap(), LedLayout::East);
        assert_eq!(LedLayout::South.to_string(), "south");
        assert!("up".parse::<LedLayout>().is_err());
    }

    #[test]
    fn test_one_cycle_sequence() {
        let mut blinker = Blinker::new(Recorder::default(), LEDS).unwrap();
        for _ in 0..STEPS_PER_CYCLE {
            blinker.step().unwrap();
        }
        assert_eq!(blinker.cycles(), 1);
        assert_eq!(
            writes(&blinker.control),
            vec![(17, 1), (25, 1), (27, 1), (17, 0), (27, 0)]
        );
        assert_eq!(
            blinker.state(),
            LedState {
                red: false,
                yellow: true,
                green: false
            }
        );
    }

    #[test]
    fn test_run_stops_and_releases() {
        let blinker = Blinker::new(Recorder::default(), LEDS).unwrap();
        let stop = AtomicBool::new(false);
        let (recorder, summary) = blinker.run(&stop, None, Some(2)).unwrap();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.released, vec![17, 27, 25]);
        assert!(recorder.claimed.is_empty());
        assert_eq!(writes(&recorder).len(), 2 * 5 + 3);
    }

    #[test]
    fn test_run_honours_stop_flag() {
        let blinker = Blinker::new(Recorder::default(), LEDS).unwrap();
        let stop = AtomicBool::new(true);
        let (_, summary) = blinker.run(&stop, None, None).unwrap();
        assert_eq!(summary.cycles, 0);
        assert_eq!(summary.released.len(), 3);
    }

    #[test]
    fn test_rejected_writes_are_counted_not_fatal() {
        let recorder = Recorder {
            reject_writes: true,
            ..Default::default()
        };
        let mut blinker = Blinker::new(recorder, LEDS).unwrap();
        blinker.step().unwrap();
        blinker.step().unwrap();
        blinker.step().unwrap();
        assert_eq!(blinker.failed_commands(), 3);
    }
}
