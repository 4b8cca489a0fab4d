//! pi_gpio_link - Raspberry Pi GPIO tools over pigpiod
//!
//! LED blinker, GPIO lock holder, pin table and watchdog demonstration.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use pi_gpio_link::{
    error_text, BlinkSummary, Blinker, BoardDescriptor, CycleTimer, DisarmStatus, ErrorCode,
    GpioConfig, GpioError, HostEnvironment, LedLayout, PinFunction, ProcessGuard,
    ProtocolConnection, Watchdog,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi_gpio_link")]
#[command(about = "Raspberry Pi GPIO tools over the pigpio daemon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Blinks LEDs, holds the GPIO lock, lists connector pins and exercises the watchdog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Board type 0..4 (Zero, Pi1 rev.1, Pi1 rev.2, Pi3, Pi4)
    #[arg(short, long)]
    board: Option<i64>,

    /// pigpiod host
    #[arg(long)]
    host: Option<String>,

    /// pigpiod port
    #[arg(short, long)]
    port: Option<u32>,

    /// Connect and read timeout in milliseconds
    #[arg(short, long)]
    timeout: Option<u32>,

    /// GPIO lock file
    #[arg(long)]
    lock_file: Option<PathBuf>,

    /// Create the lock file if missing
    #[arg(long)]
    create_lock: bool,

    /// Don't take the GPIO lock
    #[arg(long)]
    no_lock: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Blink red, yellow and green LEDs (default)
    Blink(BlinkArgs),

    /// Hold the GPIO lock until interrupted
    Lock(LockArgs),

    /// Print the connector pins of the board
    Pins(FormatArgs),

    /// Show the host environment and daemon connection
    Info(InfoArgs),

    /// Arm and trigger the hardware watchdog, then disarm it
    Watchdog(WatchdogArgs),
}

#[derive(Args, Default)]
struct BlinkArgs {
    /// LED layout: default, south, north, east or west
    #[arg(short, long, default_value_t = LedLayout::Default)]
    layout: LedLayout,

    /// Arm the watchdog and trigger it every cycle
    #[arg(short, long)]
    watchdog: bool,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,
}

#[derive(Args)]
struct LockArgs {
    /// Release after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    seconds: Option<u64>,
}

#[derive(Args)]
struct FormatArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Connect and ask the daemon for its version and the hardware revision
    #[arg(long)]
    probe: bool,
}

#[derive(Args)]
struct WatchdogArgs {
    /// Watchdog device (default from the configuration)
    #[arg(long)]
    device: Option<PathBuf>,

    /// Number of triggers
    #[arg(short = 'n', long, default_value_t = 5)]
    triggers: u64,

    /// Trigger interval in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    interval: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("  pi_gpio_link: can't initialise logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        let code = exit_code(&e);
        eprintln!("  pi_gpio_link: {:#}", e);
        eprintln!("  exit {}: {}", code.as_i32(), error_text(code.as_i32()));
        std::process::exit(code.as_i32());
    }
}

fn exit_code(e: &anyhow::Error) -> ErrorCode {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<GpioError>())
        .map(GpioError::code)
        .unwrap_or(ErrorCode::Config)
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner(what: &str) {
    println!("  pi_gpio_link {} ({})", what, env!("CARGO_PKG_VERSION"));
    println!();
}

/// Defaults, then the configuration file, then command line overrides.
fn resolve_config(cli: &Cli) -> pi_gpio_link::Result<GpioConfig> {
    let mut config = match &cli.config {
        Some(path) => GpioConfig::load(path)?,
        None => GpioConfig::default(),
    };
    if let Some(board) = cli.board {
        config = config.with_board_type(board);
    }
    if let Some(host) = &cli.host {
        config = config.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout_ms(timeout);
    }
    if let Some(path) = &cli.lock_file {
        config = config.with_lock_path(path.clone());
    }
    if cli.create_lock {
        config = config.with_create_lock_file(true);
    }
    if cli.no_lock {
        config = config.with_lock(false);
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Some(Commands::Blink(args)) => blink_command(config, args).await,
        Some(Commands::Lock(args)) => lock_command(&config, &args).await,
        Some(Commands::Pins(args)) => pins_command(&config, &args),
        Some(Commands::Info(args)) => info_command(config, args).await,
        Some(Commands::Watchdog(args)) => watchdog_command(config, args).await,
        None => blink_command(config, BlinkArgs::default()).await,
    }
}

/// Set `stop` on the first Ctrl-C.
fn stop_on_ctrl_c(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            stop.store(true, Ordering::SeqCst);
        }
    });
}

fn take_guard(config: &GpioConfig) -> pi_gpio_link::Result<Option<ProcessGuard>> {
    if !config.use_lock {
        warn!("Running without the GPIO lock");
        return Ok(None);
    }
    ProcessGuard::acquire(&config.lock_path, config.lock_options()).map(Some)
}

async fn blink_command(config: GpioConfig, args: BlinkArgs) -> anyhow::Result<()> {
    print_banner("blink");
    let stop = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(stop.clone());

    let summary = tokio::task::spawn_blocking(move || run_blink(&config, &args, &stop))
        .await
        .context("blink task panicked")??;

    println!(
        "  {} cycles from {} to {}, {} overruns, {} failed commands, released {:?}",
        summary.cycles,
        summary.started_at.format("%H:%M:%S"),
        summary.stopped_at.format("%H:%M:%S"),
        summary.overruns,
        summary.failed_commands,
        summary.released
    );
    Ok(())
}

fn run_blink(config: &GpioConfig, args: &BlinkArgs, stop: &AtomicBool) -> pi_gpio_link::Result<BlinkSummary> {
    let env = HostEnvironment::detect();
    let board = config.descriptor(&env);
    let leds = args.layout.resolve(&board)?;

    let mut guard = take_guard(config)?;
    if args.watchdog || config.use_watchdog {
        match guard.as_mut() {
            Some(guard) => {
                if let Err(e) = guard.open_watchdog(&config.watchdog_path) {
                    warn!("{}; blinking without watchdog", e);
                }
            }
            None => warn!("The watchdog needs the GPIO lock; blinking without watchdog"),
        }
    }

    println!("  {} layout {} on {}", board, args.layout, board.board_type().family().name);
    let pi = ProtocolConnection::connect(&board)?;
    let blinker = Blinker::new(pi, leds)?;
    let (mut pi, summary) = blinker.run(stop, guard.as_mut(), args.cycles)?;
    pi.disconnect();

    if let Some(mut guard) = guard {
        match guard.release() {
            Ok(Some(status)) if !status.is_safe() => warn!("Watchdog close: {:?}", status),
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
    }
    Ok(summary)
}

async fn lock_command(config: &GpioConfig, args: &LockArgs) -> anyhow::Result<()> {
    print_banner("lock");
    let mut guard = ProcessGuard::acquire(&config.lock_path, config.lock_options())?;
    println!("  holding {}", guard.lock().path().display());

    match args.seconds {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
        }
    }

    guard.release()?;
    println!("  released {}", guard.lock().path().display());
    Ok(())
}

#[derive(Serialize)]
struct PinRow {
    pin: u32,
    function: PinFunction,
    label: String,
}

fn pins_command(config: &GpioConfig, args: &FormatArgs) -> anyhow::Result<()> {
    let board = config.board();
    let family = board.family();
    let rows: Vec<PinRow> = family
        .connector()
        .into_iter()
        .map(|(pin, function)| PinRow {
            pin,
            function,
            label: function.to_string(),
        })
        .collect();

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        "pretty" => {
            println!("  {} ({})", board, family.name);
            for pair in rows.chunks(2) {
                match pair {
                    [left, right] => println!(
                        "  {:>6} {:>2} | {:<2} {}",
                        left.label, left.pin, right.pin, right.label
                    ),
                    [left] => println!("  {:>6} {:>2} |", left.label, left.pin),
                    _ => {}
                }
            }
        }
        other => anyhow::bail!(GpioError::config_error(format!(
            "unsupported format: {}. Use 'json' or 'pretty'",
            other
        ))),
    }
    Ok(())
}

#[derive(Serialize)]
struct InfoReport {
    detected_at: DateTime<Utc>,
    environment: HostEnvironment,
    descriptor: BoardDescriptor,
    daemon_version: Option<u32>,
    hardware_revision: Option<String>,
}

async fn info_command(config: GpioConfig, args: InfoArgs) -> anyhow::Result<()> {
    let probe = args.probe;
    let report = tokio::task::spawn_blocking(move || -> pi_gpio_link::Result<InfoReport> {
        let environment = HostEnvironment::detect();
        let descriptor = config.descriptor(&environment);
        let mut report = InfoReport {
            detected_at: Utc::now(),
            environment,
            descriptor,
            daemon_version: None,
            hardware_revision: None,
        };
        if probe {
            let mut pi = ProtocolConnection::connect(&report.descriptor)?;
            report.daemon_version = Some(pi.daemon_version()?);
            report.hardware_revision = Some(format!("{:x}", pi.hardware_revision()?));
            pi.disconnect();
        }
        Ok(report)
    })
    .await
    .context("info task panicked")??;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "pretty" => {
            let env = &report.environment;
            println!("  Host: {} ({})", env.hostname, env.os_name);
            println!("  Model: {}", env.model.as_deref().unwrap_or("not a Raspberry Pi"));
            if let Some(ip) = env.local_ipv4 {
                println!("  Address: {}", ip);
            }
            println!("  Connection: {}", report.descriptor);
            println!("  Timeout: {} ms", report.descriptor.timeout_ms());
            if let Some(version) = report.daemon_version {
                println!("  pigpiod version: {}", version);
            }
            if let Some(revision) = &report.hardware_revision {
                println!("  Hardware revision: {}", revision);
            }
        }
        other => anyhow::bail!(GpioError::config_error(format!(
            "unsupported format: {}. Use 'json' or 'pretty'",
            other
        ))),
    }
    Ok(())
}

async fn watchdog_command(config: GpioConfig, args: WatchdogArgs) -> anyhow::Result<()> {
    print_banner("watchdog");
    let stop = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(stop.clone());

    let status = tokio::task::spawn_blocking(move || -> pi_gpio_link::Result<DisarmStatus> {
        let device = args.device.unwrap_or_else(|| config.watchdog_path.clone());
        let interval = Duration::from_millis(args.interval);

        match take_guard(&config)? {
            Some(mut guard) => {
                guard.open_watchdog(&device)?;
                trigger_repeatedly(args.triggers, interval, &stop, || guard.trigger_watchdog())?;
                let status = guard.close_watchdog()?.unwrap_or(DisarmStatus::Unverified);
                guard.release()?;
                Ok(status)
            }
            None => {
                let mut watchdog = Watchdog::open(&device)?;
                trigger_repeatedly(args.triggers, interval, &stop, || watchdog.trigger())?;
                watchdog.close()
            }
        }
    })
    .await
    .context("watchdog task panicked")??;

    match status {
        DisarmStatus::Disarmed => println!("  watchdog disarmed"),
        DisarmStatus::NoWayOut => println!("  watchdog can't be stopped (nowayout): the board will reset"),
        DisarmStatus::Unverified => println!("  watchdog closed; disarm could not be verified"),
    }
    Ok(())
}

fn trigger_repeatedly(
    triggers: u64,
    interval: Duration,
    stop: &AtomicBool,
    mut trigger: impl FnMut() -> pi_gpio_link::Result<()>,
) -> pi_gpio_link::Result<()> {
    let mut timer = CycleTimer::new(interval);
    for n in 1..=triggers {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        trigger()?;
        println!("  trigger {}", n);
        timer.wait();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "pi_gpio_link",
            "--board",
            "1",
            "--port",
            "8889",
            "blink",
            "--layout",
            "west",
            "--cycles",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.board, Some(1));
        assert_eq!(cli.port, Some(8889));
        match cli.command {
            Some(Commands::Blink(args)) => {
                assert_eq!(args.layout, LedLayout::West);
                assert_eq!(args.cycles, Some(3));
                assert!(!args.watchdog);
            }
            _ => panic!("expected blink"),
        }
    }

    #[test]
    fn test_default_values() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["pi_gpio_link"]).unwrap();
        assert!(cli.command.is_none());
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config, GpioConfig::default());
    }

    #[test]
    fn test_overrides() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "pi_gpio_link",
            "--host",
            "raspi61",
            "--no-lock",
            "--lock-file",
            "/tmp/.lockPiGpio",
            "pins",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.host.as_deref(), Some("raspi61"));
        assert!(!config.use_lock);
        assert_eq!(config.lock_path, PathBuf::from("/tmp/.lockPiGpio"));
    }

    #[test]
    fn test_watchdog_arguments() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["pi_gpio_link", "watchdog", "-n", "1"]).unwrap();
        match cli.command {
            Some(Commands::Watchdog(args)) => {
                assert_eq!(args.triggers, 1);
                assert_eq!(args.interval, 1000);
                assert!(args.device.is_none());
            }
            _ => panic!("expected watchdog"),
        }
    }

    #[tokio::test]
    async fn test_watchdog_command_missing_device() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = GpioConfig::default().with_lock(false);
        let args = WatchdogArgs {
            device: Some(dir.path().join("watchdog")),
            triggers: 1,
            interval: 1,
        };

        let err = watchdog_command(config, args).await.unwrap_err();
        assert_eq!(exit_code(&err), ErrorCode::OpenWatchdog);
    }

    #[tokio::test]
    async fn test_watchdog_command_triggers_and_disarms() {
        let dir = tempfile::TempDir::new().unwrap();
        let device = dir.path().join("watchdog");
        std::fs::File::create(&device).unwrap();
        let config = GpioConfig::default().with_lock(false);
        let args = WatchdogArgs {
            device: Some(device.clone()),
            triggers: 1,
            interval: 1,
        };

        watchdog_command(config, args).await.unwrap();
        assert_eq!(std::fs::read(&device).unwrap(), b"XV");
    }

    #[test]
    fn test_bad_layout_rejected() {
        use clap::Parser;

        assert!(Cli::try_parse_from(["pi_gpio_link", "blink", "--layout", "up"]).is_err());
    }

    #[test]
    fn test_exit_code_from_chain() {
        let err = anyhow::Error::new(GpioError::AlreadyLocked {
            path: PathBuf::from("/home/pi/bin/.lockPiGpio"),
        });
        assert_eq!(exit_code(&err), ErrorCode::NotLocked);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), ErrorCode::Config);
    }
}
