//! Midas battery daemon
//!
//! Runs the charging state machine for the device battery against
//! `/sys/class/power_supply`, IIO ADCs and sysfs GPIOs.
//!
//! Start-up:
//! 1. Load platform data (file, board profile or system default)
//! 2. Open the charger and fuel gauge supplies
//! 3. Start the work queue and queue the first monitor run
//! 4. Serve the control socket and wait for signals
//!
//! SIGUSR1 and SIGUSR2 tell the daemon the system is suspending and resuming.

mod board;
mod control;
mod publish;
mod simulate;
mod workqueue;

use anyhow::{Context, Result};
use clap::Parser;
use midas_battery::{Battery, Hardware};
use midas_config::{AdcType, BatteryConfig, CONFIG_DIR};
use midas_hal::{IioAdc, MonotonicClock, PowerSupplyRegistry, SysfsGpio};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::board::SysBoard;
use crate::publish::Publisher;
use crate::workqueue::WakeLocks;

#[derive(Debug, Parser)]
#[command(name = "midas-batteryd")]
#[command(about = "Battery charging monitor daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Platform data file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Board profile (built-in or from <config-dir>/boards)
    #[arg(short, long, conflicts_with = "config")]
    profile: Option<String>,

    #[arg(long, default_value = CONFIG_DIR)]
    config_dir: PathBuf,

    /// Control socket path
    #[arg(long, default_value = "/run/midas-battery.sock")]
    socket: PathBuf,

    /// sysfs mount point
    #[arg(long, default_value = "/sys")]
    sysfs: PathBuf,

    /// Run against simulated hardware
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    info!("midas-batteryd {} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let publisher = Publisher::new();

    let (hardware, locks) = if cli.mock {
        (simulate::hardware(&config.battery), WakeLocks::mock())
    } else {
        (
            system_hardware(&cli.sysfs)?,
            WakeLocks::sysfs(&cli.sysfs.join("power")),
        )
    };

    let battery = Battery::new(
        config,
        hardware.with_listener(Arc::new(publisher.clone())),
    )
    .context("Failed to start battery monitor")?;

    let (queue, worker) = workqueue::channel(battery, locks, publisher.clone());
    let worker = tokio::spawn(worker.run());

    let listener = control::bind(&cli.socket)?;
    tokio::spawn(control::serve(listener, queue.clone(), publisher));

    wait_for_signals(&queue).await?;

    info!("Shutting down...");
    queue.shutdown();
    worker.await.context("Work queue task failed")?;

    if let Err(e) = std::fs::remove_file(&cli.socket) {
        warn!("Failed to remove {}: {}", cli.socket.display(), e);
    }
    Ok(())
}

/// Setup logging to the console
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();
}

fn load_config(cli: &Cli) -> Result<BatteryConfig> {
    let config = if let Some(path) = &cli.config {
        BatteryConfig::load_layered(Some(path))
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(name) = &cli.profile {
        BatteryConfig::load_profile(&cli.config_dir, name)
            .with_context(|| format!("Failed to load board profile {}", name))?
    } else {
        BatteryConfig::load_default().context("Failed to load platform data")?
    };

    info!(
        "Battery: {}, polling {:?}",
        config.battery.vendor, config.monitor.polling
    );
    Ok(config)
}

fn system_hardware(sysfs: &Path) -> Result<Hardware> {
    let registry = PowerSupplyRegistry::detect(&sysfs.join("class/power_supply"))
        .context("Failed to scan power supplies")?;
    info!("Power supplies: {}", registry.names().join(", "));

    let mut hardware = Hardware::new(registry, Arc::new(MonotonicClock::new()))
        .with_gpio(Arc::new(SysfsGpio::new(&sysfs.join("class/gpio"))))
        .with_board(Arc::new(SysBoard::detect(Path::new("/proc/cmdline"))));

    // AP converter first, PMIC-side converter second
    let iio = sysfs.join("bus/iio/devices");
    for (kind, device) in [(AdcType::Ap, "iio:device0"), (AdcType::Ic, "iio:device1")] {
        let path = iio.join(device);
        if path.exists() {
            hardware = hardware.with_adc(kind, Arc::new(IioAdc::new(&path)));
        }
    }

    Ok(hardware)
}

/// Wait for a shutdown signal, forwarding suspend and resume
async fn wait_for_signals(queue: &workqueue::WorkQueue) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut suspend = signal(SignalKind::from_raw(libc::SIGUSR1))?;
    let mut resume = signal(SignalKind::from_raw(libc::SIGUSR2))?;

    loop {
        tokio::select! {
            _ = term.recv() => break,
            _ = int.recv() => break,
            _ = suspend.recv() => {
                info!("Received suspend signal");
                queue.suspend();
            }
            _ = resume.recv() => {
                info!("Received resume signal");
                queue.resume();
            }
        }
    }

    info!("Received shutdown signal");
    Ok(())
}
