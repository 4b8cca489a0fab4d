//! Synchronous pigpiod client.

use crate::board::BoardDescriptor;
use crate::error::{GpioError, Result};
use crate::protocol::frame::{encode_command, status, status_text, Command, Frame, Level, Mode, Pull, FRAME_LEN};
use std::collections::BTreeSet;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Highest GPIO number the daemon accepts for mode and pull commands.
pub const MAX_GPIO: u32 = 53;

/// Highest GPIO number that may be driven (WRITE, PWM, SERVO).
pub const MAX_USER_GPIO: u32 = 31;

/// Highest pad number for PADS/PADG.
const MAX_PAD: u32 = 2;

/// Pad drive strength range in mA.
const STRENGTH_RANGE_MA: std::ops::RangeInclusive<u32> = 1..=16;

/// Highest PWM duty cycle accepted before sending.
const MAX_DUTY: u32 = 40_000;

/// Servo pulse width range in microseconds (0 switches pulses off).
const SERVO_RANGE_US: std::ops::RangeInclusive<u32> = 500..=2500;

/// Outcome of one command: the echoed request plus the daemon's result word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Command sent
    pub command: Command,
    /// First parameter
    pub p1: u32,
    /// Second parameter
    pub p2: u32,
    /// Result word, negative for errors unless the command returns unsigned data
    pub status: i32,
    /// Rejected before sending; the daemon never saw this command
    pub local: bool,
}

impl Reply {
    fn rejected(command: Command, p1: u32, p2: u32, status: i32) -> Self {
        Self {
            command,
            p1,
            p2,
            status,
            local: true,
        }
    }

    /// The result word as unsigned value (bank bits, revision, version).
    pub fn value(&self) -> u32 {
        self.status as u32
    }

    /// Whether the command failed.
    pub fn is_error(&self) -> bool {
        self.status < 0 && !self.command.returns_unsigned()
    }

    /// The result value, or a [`GpioError::Protocol`] for a failed command.
    pub fn into_result(self) -> Result<u32> {
        if self.is_error() {
            Err(GpioError::protocol_error(
                self.command.name(),
                self.p1,
                self.p2,
                self.status,
            ))
        } else {
            Ok(self.value())
        }
    }
}

/// Record a command and its result at debug level.
pub fn log_command(reply: &Reply) {
    debug!(
        "{} {} {} -> {}{}",
        reply.command.name(),
        reply.p1,
        reply.p2,
        reply.status,
        if reply.local { " (not sent)" } else { "" }
    );
}

/// Warn about a failed command; returns whether it failed.
pub fn log_if_bad(reply: &Reply) -> bool {
    if !reply.is_error() {
        return false;
    }
    warn!(
        "{} {} {} failed: {} {}",
        reply.command.name(),
        reply.p1,
        reply.p2,
        reply.status,
        status_text(reply.status)
    );
    true
}

/// The operations application loops drive the hardware with.
pub trait GpioControl {
    /// Set the mode of a GPIO.
    fn set_mode(&mut self, gpio: u32, mode: Mode) -> Result<Reply>;

    /// Drive an output.
    fn set_output(&mut self, gpio: u32, level: Level) -> Result<Reply>;

    /// Configure the pull resistor of a GPIO.
    fn set_pull_resistor(&mut self, gpio: u32, pull: Pull) -> Result<Reply>;

    /// Set the drive strength of a pad group (0: GPIO 0..27, 1: 28..45,
    /// 2: 46..53).
    fn set_drive_strength(&mut self, pad: u32, milliamps: u32) -> Result<Reply>;

    /// Return all claimed outputs to input mode.
    fn release_outputs(&mut self) -> Result<Vec<u32>>;
}

/// One open connection to pigpiod.
///
/// Commands are strictly request then response on one socket; `&mut self`
/// keeps one command in flight at a time.
#[derive(Debug)]
pub struct ProtocolConnection {
    descriptor: BoardDescriptor,
    endpoint: String,
    stream: Option<TcpStream>,
    claimed: BTreeSet<u32>,
}

impl ProtocolConnection {
    /// Connect to the daemon named by `descriptor`, using its timeout for
    /// connecting, reading and writing.
    pub fn connect(descriptor: &BoardDescriptor) -> Result<Self> {
        let endpoint = descriptor.endpoint();
        let timeout = Duration::from_millis(u64::from(descriptor.timeout_ms()));

        let stream = open_stream(descriptor.host(), descriptor.port(), timeout)
            .map_err(|source| connect_error(&endpoint, source))?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| stream.set_write_timeout(Some(timeout)))
            .and_then(|_| stream.set_nodelay(true))
            .map_err(|source| connect_error(&endpoint, source))?;

        info!("Connected to pigpiod at {} ({})", endpoint, descriptor.board_type());
        Ok(Self {
            descriptor: descriptor.clone(),
            endpoint,
            stream: Some(stream),
            claimed: BTreeSet::new(),
        })
    }

    /// The descriptor this connection was opened with.
    pub fn descriptor(&self) -> &BoardDescriptor {
        &self.descriptor
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// GPIOs currently claimed as outputs, ascending.
    pub fn claimed_outputs(&self) -> impl Iterator<Item = u32> + '_ {
        self.claimed.iter().copied()
    }

    /// GPIO on connector `pin`, limited to the GPIOs this client may drive.
    pub fn gpio_for_pin(&self, label: &str, pin: u32) -> Result<u32> {
        self.descriptor.gpio_for_pin_checked(label, pin, MAX_USER_GPIO)
    }

    /// Send one command and wait for its response.
    ///
    /// `p3` is the extension length; commands with extension data are not
    /// supported, so it must be 0. A negative status is returned in the
    /// [`Reply`], not as an error; errors mean the exchange itself failed.
    /// After a failed exchange the socket is closed and every later command
    /// fails.
    pub fn send_command(&mut self, command: Command, p1: u32, p2: u32, p3: u32) -> Result<Reply> {
        if p3 != 0 {
            return Err(GpioError::config_error(format!(
                "{} with {} extension bytes is not supported",
                command.name(),
                p3
            )));
        }

        let frame = match self.exchange(command, p1, p2) {
            Ok(frame) => frame,
            Err(source) => {
                if let Some(stream) = self.stream.take() {
                    warn!("Closing connection to {}: {}", self.endpoint, source);
                    let _ = stream.shutdown(Shutdown::Both);
                }
                return Err(exchange_error(&self.endpoint, source));
            }
        };

        let reply = Reply {
            command,
            p1,
            p2,
            status: frame.status(),
            local: false,
        };
        log_command(&reply);
        Ok(reply)
    }

    /// Write one request and read the response that echoes it.
    fn exchange(&mut self, command: Command, p1: u32, p2: u32) -> io::Result<Frame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;

        let request = encode_command(command.code(), p1, p2, 0);
        let mut response = [0u8; FRAME_LEN];
        stream.write_all(&request)?;
        stream.flush()?;
        stream.read_exact(&mut response)?;

        let frame = Frame::decode(&response);
        if frame.command != command.code() || frame.p1 != p1 || frame.p2 != p2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "response {} {} {} to {} {} {}",
                    frame.command,
                    frame.p1,
                    frame.p2,
                    command.name(),
                    p1,
                    p2
                ),
            ));
        }
        Ok(frame)
    }

    fn checked(&mut self, command: Command, p1: u32, p2: u32, rejection: Option<i32>) -> Result<Reply> {
        match rejection {
            Some(status) => {
                let reply = Reply::rejected(command, p1, p2, status);
                log_command(&reply);
                Ok(reply)
            }
            None => self.send_command(command, p1, p2, 0),
        }
    }

    fn claim_on_success(&mut self, reply: &Reply, gpios: impl IntoIterator<Item = u32>) {
        if !reply.is_error() {
            self.claimed.extend(gpios);
        }
    }

    /// Mode of a GPIO.
    pub fn get_mode(&mut self, gpio: u32) -> Result<Reply> {
        let rejection = (gpio > MAX_GPIO).then_some(status::BAD_GPIO);
        self.checked(Command::Modeg, gpio, 0, rejection)
    }

    /// Level of a GPIO.
    pub fn read_input(&mut self, gpio: u32) -> Result<Reply> {
        let rejection = (gpio > MAX_GPIO).then_some(status::BAD_GPIO);
        self.checked(Command::Read, gpio, 0, rejection)
    }

    /// Levels of GPIO 0..31 (`high_bank == false`) or 32..53 as a bit mask.
    pub fn read_bank(&mut self, high_bank: bool) -> Result<Reply> {
        let command = if high_bank { Command::Br2 } else { Command::Br1 };
        self.send_command(command, 0, 0, 0)
    }

    /// Set or clear every GPIO 0..31 whose bit is set in `mask`; all of them
    /// become claimed outputs.
    pub fn set_outputs(&mut self, mask: u32, level: Level) -> Result<Reply> {
        let command = match level {
            Level::High => Command::Bs1,
            Level::Low => Command::Bc1,
        };
        let reply = self.send_command(command, mask, 0, 0)?;
        self.claim_on_success(&reply, (0..=MAX_USER_GPIO).filter(|bit| mask & (1 << bit) != 0));
        Ok(reply)
    }

    /// Start PWM on a GPIO; 0 stops it.
    pub fn set_pwm_duty(&mut self, gpio: u32, duty: u32) -> Result<Reply> {
        let rejection = if gpio > MAX_USER_GPIO {
            Some(status::BAD_USER_GPIO)
        } else if duty > MAX_DUTY {
            Some(status::BAD_DUTYCYCLE)
        } else {
            None
        };
        let reply = self.checked(Command::Pwm, gpio, duty, rejection)?;
        self.claim_on_success(&reply, [gpio]);
        Ok(reply)
    }

    /// PWM duty cycle of a GPIO.
    pub fn get_pwm_duty(&mut self, gpio: u32) -> Result<Reply> {
        let rejection = (gpio > MAX_USER_GPIO).then_some(status::BAD_USER_GPIO);
        self.checked(Command::Gdc, gpio, 0, rejection)
    }

    /// Start servo pulses of `width_us` on a GPIO; 0 stops them.
    pub fn set_servo_pulse(&mut self, gpio: u32, width_us: u32) -> Result<Reply> {
        let rejection = if gpio > MAX_USER_GPIO {
            Some(status::BAD_USER_GPIO)
        } else if width_us != 0 && !SERVO_RANGE_US.contains(&width_us) {
            Some(status::BAD_PULSEWIDTH)
        } else {
            None
        };
        let reply = self.checked(Command::Servo, gpio, width_us, rejection)?;
        self.claim_on_success(&reply, [gpio]);
        Ok(reply)
    }

    /// Servo pulse width of a GPIO.
    pub fn get_servo_pulse(&mut self, gpio: u32) -> Result<Reply> {
        let rejection = (gpio > MAX_USER_GPIO).then_some(status::BAD_USER_GPIO);
        self.checked(Command::Gpw, gpio, 0, rejection)
    }

    /// Drive strength of a pad group in mA.
    pub fn get_drive_strength(&mut self, pad: u32) -> Result<Reply> {
        let rejection = (pad > MAX_PAD).then_some(status::BAD_PAD);
        self.checked(Command::Padg, pad, 0, rejection)
    }

    /// Hardware revision code of the board.
    pub fn hardware_revision(&mut self) -> Result<u32> {
        self.send_command(Command::Hwver, 0, 0, 0)?.into_result()
    }

    /// Version of the daemon.
    pub fn daemon_version(&mut self) -> Result<u32> {
        self.send_command(Command::Pigpv, 0, 0, 0)?.into_result()
    }

    /// Make a GPIO an input with the given pull resistor.
    ///
    /// Stops at the first failing step and returns its reply.
    pub fn init_as_input(&mut self, gpio: u32, pull: Pull) -> Result<Reply> {
        let reply = self.set_mode(gpio, Mode::Input)?;
        if log_if_bad(&reply) {
            return Ok(reply);
        }
        self.set_pull_resistor(gpio, pull)
    }

    /// Make a GPIO an output at `initial` level.
    ///
    /// Stops at the first failing step and returns its reply.
    pub fn init_as_output(&mut self, gpio: u32, initial: Level) -> Result<Reply> {
        let reply = self.set_mode(gpio, Mode::Output)?;
        if log_if_bad(&reply) {
            return Ok(reply);
        }
        self.set_output(gpio, initial)
    }

    /// Close the socket. Calling it again does nothing.
    ///
    /// Claims are kept; release them first.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; closing is all that matters.
            let _ = stream.shutdown(Shutdown::Both);
            info!("Disconnected from pigpiod at {}", self.endpoint);
        }
        if !self.claimed.is_empty() {
            warn!(
                "Disconnected with {} unreleased outputs: {:?}",
                self.claimed.len(),
                self.claimed
            );
        }
    }
}

impl GpioControl for ProtocolConnection {
    fn set_mode(&mut self, gpio: u32, mode: Mode) -> Result<Reply> {
        let rejection = (gpio > MAX_GPIO).then_some(status::BAD_GPIO);
        let reply = self.checked(Command::Modes, gpio, mode as u32, rejection)?;
        if !reply.is_error() {
            match mode {
                Mode::Output => {
                    self.claimed.insert(gpio);
                }
                Mode::Input => {
                    self.claimed.remove(&gpio);
                }
                _ => {}
            }
        }
        Ok(reply)
    }

    fn set_output(&mut self, gpio: u32, level: Level) -> Result<Reply> {
        let rejection = (gpio > MAX_USER_GPIO).then_some(status::BAD_USER_GPIO);
        let reply = self.checked(Command::Write, gpio, level as u32, rejection)?;
        self.claim_on_success(&reply, [gpio]);
        Ok(reply)
    }

    fn set_pull_resistor(&mut self, gpio: u32, pull: Pull) -> Result<Reply> {
        let rejection = (gpio > MAX_GPIO).then_some(status::BAD_GPIO);
        self.checked(Command::Pud, gpio, pull as u32, rejection)
    }

    fn set_drive_strength(&mut self, pad: u32, milliamps: u32) -> Result<Reply> {
        let rejection = if pad > MAX_PAD {
            Some(status::BAD_PAD)
        } else if !STRENGTH_RANGE_MA.contains(&milliamps) {
            Some(status::BAD_STRENGTH)
        } else {
            None
        };
        self.checked(Command::Pads, pad, milliamps, rejection)
    }

    /// Switch every claimed output back to input and forget the claims.
    ///
    /// Every claim is attempted even if the daemon rejects some. A socket
    /// failure closes the connection, so the remaining claims are given up
    /// and the failure is returned. Otherwise returns the GPIOs the daemon
    /// confirmed.
    fn release_outputs(&mut self) -> Result<Vec<u32>> {
        let claimed = std::mem::take(&mut self.claimed);
        let mut released = Vec::with_capacity(claimed.len());

        for gpio in &claimed {
            match self.send_command(Command::Modes, *gpio, Mode::Input as u32, 0) {
                Ok(reply) => {
                    if !log_if_bad(&reply) {
                        released.push(*gpio);
                    }
                }
                Err(e) => {
                    let abandoned: Vec<u32> = claimed.range(*gpio..).copied().collect();
                    warn!("Releasing outputs {:?} failed: {}", abandoned, e);
                    return Err(e);
                }
            }
        }

        if !released.is_empty() {
            info!("Released outputs {:?}", released);
        }
        Ok(released)
    }
}

impl Drop for ProtocolConnection {
    fn drop(&mut self) {
        if self.stream.is_some() && !self.claimed.is_empty() {
            if let Err(e) = self.release_outputs() {
                warn!("Releasing outputs on drop failed: {}", e);
            }
        }
        self.disconnect();
    }
}

fn open_stream(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, format!("{} resolves to no address", host))
    }))
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn connect_error(endpoint: &str, source: io::Error) -> GpioError {
    if is_timeout(&source) {
        GpioError::Timeout {
            endpoint: endpoint.to_string(),
            source,
        }
    } else {
        GpioError::Connection {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

fn exchange_error(endpoint: &str, source: io::Error) -> GpioError {
    if is_timeout(&source) {
        GpioError::Timeout {
            endpoint: endpoint.to_string(),
            source,
        }
    } else {
        GpioError::Transport {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardType, HostEnvironment};
    use std::net::TcpListener;
    use std::thread;

    /// Daemon answering each request with the status `answer` picks.
    fn spawn_daemon(answer: fn(&Frame) -> i32) -> (BoardDescriptor, thread::JoinHandle<Vec<Frame>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; FRAME_LEN];
            while socket.read_exact(&mut buf).is_ok() {
                let mut frame = Frame::decode(&buf);
                seen.push(frame);
                frame.p3 = answer(&frame) as u32;
                socket.write_all(&frame.encode()).unwrap();
            }
            seen
        });
        let descriptor = BoardDescriptor::describe(
            BoardType::Pi3,
            Some("127.0.0.1"),
            u32::from(port),
            2_000,
            &HostEnvironment::on_pi(),
        );
        (descriptor, handle)
    }

    /// Daemon with full control over each response: `respond` gets the
    /// request index and frame and returns a delay and the frame to send
    /// back, or `None` to stay silent.
    fn spawn_scripted_daemon<F>(timeout_ms: u32, respond: F) -> (BoardDescriptor, thread::JoinHandle<Vec<Frame>>)
    where
        F: Fn(usize, Frame) -> Option<(Duration, Frame)> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; FRAME_LEN];
            while socket.read_exact(&mut buf).is_ok() {
                let frame = Frame::decode(&buf);
                let response = respond(seen.len(), frame);
                seen.push(frame);
                if let Some((delay, response)) = response {
                    thread::sleep(delay);
                    if socket.write_all(&response.encode()).is_err() {
                        break;
                    }
                }
            }
            seen
        });
        let descriptor = BoardDescriptor::describe(
            BoardType::Pi3,
            Some("127.0.0.1"),
            u32::from(port),
            timeout_ms,
            &HostEnvironment::on_pi(),
        );
        (descriptor, handle)
    }

    #[test]
    fn test_late_response_is_never_paired_with_next_command() {
        let (descriptor, daemon) = spawn_scripted_daemon(300, |index, frame| {
            let delay = if index == 0 { 600 } else { 0 };
            Some((Duration::from_millis(delay), Frame { p3: frame.p1, ..frame }))
        });
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();

        let err = conn.read_input(4).unwrap_err();
        assert!(matches!(err, GpioError::Timeout { .. }));
        assert!(!conn.is_connected());

        let err = conn.read_input(9).unwrap_err();
        assert!(matches!(err, GpioError::Transport { .. }));

        drop(conn);
        let seen = daemon.join().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].p1, 4);
    }

    #[test]
    fn test_response_must_echo_parameters() {
        let (descriptor, daemon) = spawn_scripted_daemon(2_000, |_, frame| {
            Some((Duration::ZERO, Frame { p1: frame.p1 + 1, p3: 0, ..frame }))
        });
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();

        let err = conn.set_mode(17, Mode::Output).unwrap_err();
        assert!(matches!(err, GpioError::Transport { .. }));
        assert!(err.to_string().contains("127.0.0.1"));
        assert!(!conn.is_connected());
        assert_eq!(conn.claimed_outputs().count(), 0);

        drop(conn);
        daemon.join().unwrap();
    }

    #[test]
    fn test_release_stops_at_first_socket_failure() {
        let (descriptor, daemon) = spawn_scripted_daemon(300, |index, frame| {
            (index < 3).then_some((Duration::ZERO, Frame { p3: 0, ..frame }))
        });
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();
        for gpio in [5, 6, 13] {
            conn.set_mode(gpio, Mode::Output).unwrap();
        }

        let started = std::time::Instant::now();
        let err = conn.release_outputs().unwrap_err();
        assert!(matches!(err, GpioError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_millis(600));
        assert_eq!(conn.claimed_outputs().count(), 0);
        assert!(!conn.is_connected());

        drop(conn);
        let seen = daemon.join().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], Frame { command: 0, p1: 5, p2: 0, p3: 0 });
    }

    #[test]
    fn test_reply_unsigned_commands_never_fail() {
        let reply = Reply {
            command: Command::Hwver,
            p1: 0,
            p2: 0,
            status: -1,
            local: false,
        };
        assert!(!reply.is_error());
        assert_eq!(reply.into_result().unwrap(), u32::MAX);
    }

    #[test]
    fn test_reply_into_result_carries_status() {
        let reply = Reply::rejected(Command::Modes, 60, 1, status::BAD_GPIO);
        let err = reply.into_result().unwrap_err();
        assert!(matches!(err, GpioError::Protocol { status: -3, p1: 60, .. }));
        assert!(err.to_string().contains("GPIO not 0..53"));
    }

    #[test]
    fn test_local_validation_is_not_sent() {
        let (descriptor, daemon) = spawn_daemon(|_| 0);
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();

        let reply = conn.set_output(40, Level::High).unwrap();
        assert!(reply.local);
        assert_eq!(reply.status, status::BAD_USER_GPIO);

        let reply = conn.set_drive_strength(3, 8).unwrap();
        assert_eq!(reply.status, status::BAD_PAD);
        let reply = conn.set_drive_strength(0, 17).unwrap();
        assert_eq!(reply.status, status::BAD_STRENGTH);
        let reply = conn.set_servo_pulse(18, 499).unwrap();
        assert_eq!(reply.status, status::BAD_PULSEWIDTH);
        let reply = conn.set_pwm_duty(18, 40_001).unwrap();
        assert_eq!(reply.status, status::BAD_DUTYCYCLE);

        let reply = conn.set_drive_strength(0, 16).unwrap();
        assert!(!reply.local);
        assert_eq!(conn.claimed_outputs().count(), 0);

        conn.disconnect();
        let seen = daemon.join().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].command, Command::Pads.code());
    }

    #[test]
    fn test_bank_write_claims_bits() {
        let (descriptor, daemon) = spawn_daemon(|_| 0);
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();

        conn.set_outputs((1 << 17) | (1 << 22), Level::High).unwrap();
        assert_eq!(conn.claimed_outputs().collect::<Vec<_>>(), vec![17, 22]);

        let released = conn.release_outputs().unwrap();
        assert_eq!(released, vec![17, 22]);
        assert_eq!(conn.claimed_outputs().count(), 0);

        conn.disconnect();
        let seen = daemon.join().unwrap();
        assert_eq!(seen[0].command, Command::Bs1.code());
        assert_eq!(seen[1], Frame { command: 0, p1: 17, p2: 0, p3: 0 });
        assert_eq!(seen[2], Frame { command: 0, p1: 22, p2: 0, p3: 0 });
    }

    #[test]
    fn test_input_mode_drops_claim() {
        let (descriptor, daemon) = spawn_daemon(|_| 0);
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();

        conn.init_as_output(5, Level::Low).unwrap();
        assert_eq!(conn.claimed_outputs().collect::<Vec<_>>(), vec![5]);
        conn.init_as_input(5, Pull::Up).unwrap();
        assert_eq!(conn.claimed_outputs().count(), 0);

        conn.disconnect();
        let seen = daemon.join().unwrap();
        let commands: Vec<u32> = seen.iter().map(|f| f.command).collect();
        assert_eq!(commands, vec![0, 4, 0, 2]);
    }

    #[test]
    fn test_unsigned_result_commands() {
        let (descriptor, daemon) = spawn_daemon(|frame| match frame.command {
            17 => 0xa0_2082u32 as i32,
            26 => 79,
            10 => -1,
            _ => 0,
        });
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();

        assert_eq!(conn.hardware_revision().unwrap(), 0xa0_2082);
        assert_eq!(conn.daemon_version().unwrap(), 79);
        assert_eq!(conn.read_bank(false).unwrap().value(), u32::MAX);

        conn.disconnect();
        daemon.join().unwrap();
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (descriptor, daemon) = spawn_daemon(|_| 0);
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();
        conn.disconnect();
        conn.disconnect();
        assert!(!conn.is_connected());

        let err = conn.read_input(4).unwrap_err();
        assert!(matches!(err, GpioError::Transport { .. }));
        daemon.join().unwrap();
    }

    #[test]
    fn test_extension_data_rejected() {
        let (descriptor, daemon) = spawn_daemon(|_| 0);
        let mut conn = ProtocolConnection::connect(&descriptor).unwrap();
        assert!(matches!(
            conn.send_command(Command::Modes, 4, 1, 4),
            Err(GpioError::Config(_))
        ));
        drop(conn);
        assert!(daemon.join().unwrap().is_empty());
    }
}
