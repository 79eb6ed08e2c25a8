//! Vigil daemon - polls hazard sensors and drives the alarm outputs.
//!
//! Run with: `cargo run -p vigil-daemon`

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vigil_core::config::DEFAULT_CONFIG_PATH;
use vigil_core::mock::{MockCamera, MockHub, MockPort};
use vigil_core::{
    ActuatorPort, AlertSink, Camera, LogOnlySink, Monitor, MonitorConfig, SensorHub, TwilioSink,
};

#[cfg(target_os = "linux")]
use vigil_core::{RpiActuatorPort, RpiSensorHub, StillCamera};

/// Vigil - environmental hazard monitor.
#[derive(Parser, Debug)]
#[command(name = "vigild")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Poll interval in milliseconds (overrides config).
    #[arg(short, long, global = true)]
    interval_ms: Option<u64>,

    /// Use mock sensors and actuators instead of GPIO hardware.
    #[arg(long, global = true)]
    mock: bool,

    /// Log every monitor event as JSON.
    #[arg(long, global = true)]
    verbose_events: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor in the foreground (default behavior).
    Run,

    /// Validate the configuration and print the effective settings.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Command::Check) => check_config(&args),
        Some(Command::Run) | None => run_monitor(args).await,
    }
}

/// Load the configuration, apply CLI overrides, and validate.
fn load_config(args: &Args) -> anyhow::Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::load_default()?,
    };
    if let Some(interval) = args.interval_ms {
        config.poll_interval_ms = interval;
    }
    config.validate()?;
    Ok(config)
}

fn check_config(args: &Args) -> anyhow::Result<()> {
    let config = load_config(args)?;
    println!("{}", toml::to_string_pretty(&masked(&config))?);
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    println!("configuration OK: {}", path.display());
    Ok(())
}

/// Copy of the configuration that is safe to print.
fn masked(config: &MonitorConfig) -> MonitorConfig {
    let mut masked = config.clone();
    if !masked.alert.twilio.auth_token.is_empty() {
        masked.alert.twilio.auth_token = "********".to_string();
    }
    masked
}

async fn run_monitor(args: Args) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vigil_core=info".parse()?)
                .add_directive("vigil_daemon=info".parse()?),
        )
        .init();

    let config = load_config(&args)?;

    let (hub, port, camera) = build_devices(&args, &config)?;

    let sink: Arc<dyn AlertSink> = if config.alert.enabled {
        Arc::new(TwilioSink::new(config.alert.clone())?)
    } else {
        info!("alert delivery disabled, alerts will only be logged");
        Arc::new(LogOnlySink)
    };

    let monitor = Monitor::new(hub, port, camera, sink, &config);

    if args.verbose_events {
        let mut events = monitor.events().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => info!(target: "vigil_daemon::events", "{line}"),
                        Err(e) => warn!(error = %e, "failed to serialize monitor event"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event logger lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    // Stop cleanly on ctrl-c or SIGTERM so the outputs are released.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_cancel.cancel();
    });

    monitor.run(cancel).await?;
    Ok(())
}

type Devices = (Arc<dyn SensorHub>, Box<dyn ActuatorPort>, Arc<dyn Camera>);

fn build_devices(args: &Args, config: &MonitorConfig) -> anyhow::Result<Devices> {
    if args.mock {
        info!("using mock sensors and actuators");
        return Ok((
            Arc::new(MockHub::new()),
            Box::new(MockPort::new()),
            Arc::new(MockCamera::new()),
        ));
    }
    build_hardware(config)
}

#[cfg(target_os = "linux")]
fn build_hardware(config: &MonitorConfig) -> anyhow::Result<Devices> {
    let hub = RpiSensorHub::new(&config.pins, &config.smoke)?;
    let port = RpiActuatorPort::new(&config.pins)?;
    let camera = StillCamera::from_config(&config.alert);
    Ok((Arc::new(hub), Box::new(port), Arc::new(camera)))
}

#[cfg(not(target_os = "linux"))]
fn build_hardware(_config: &MonitorConfig) -> anyhow::Result<Devices> {
    anyhow::bail!("hardware access requires Linux; use --mock on other platforms")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_to_run() {
        let args = Args::try_parse_from(["vigild"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.mock);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_accept_overrides() {
        let args = Args::try_parse_from([
            "vigild",
            "run",
            "--config",
            "/tmp/vigil.toml",
            "--interval-ms",
            "250",
            "--mock",
        ])
        .unwrap();
        assert!(matches!(args.command, Some(Command::Run)));
        assert_eq!(args.interval_ms, Some(250));
        assert!(args.mock);
    }

    #[test]
    fn test_interval_override_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        MonitorConfig::default().save(&path).unwrap();

        let args = Args::try_parse_from([
            "vigild",
            "--config",
            path.to_str().unwrap(),
            "--interval-ms",
            "250",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn test_masked_config_hides_the_auth_token() {
        let mut config = MonitorConfig::default();
        config.alert.twilio.auth_token = "super-secret".to_string();
        let printed = masked(&config);
        assert_eq!(printed.alert.twilio.auth_token, "********");
        assert_eq!(printed.poll_interval_ms, config.poll_interval_ms);
    }
}
