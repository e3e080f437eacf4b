//! mqtt-gpio-bind - MQTT to GPIO binding daemon
//!
//! Subscribes to MQTT topics and writes the received boolean values to GPIO
//! output pins. SIGHUP reloads the bindings, SIGINT/SIGTERM stop the daemon.

use clap::{ArgGroup, CommandFactory, Parser};
use mqtt_gpio_bind::binding::Binding;
use mqtt_gpio_bind::config::{BrokerConfig, ConfigError, DaemonConfig};
use mqtt_gpio_bind::daemon::{BindingDaemon, DaemonHandle};
use mqtt_gpio_bind::error::DaemonResult;
use mqtt_gpio_bind::gpio::{GpioBackend, Platform};
use mqtt_gpio_bind::observability::{init_logging, LogFormat, LoggingOptions};
use mqtt_gpio_bind::transport::mqtt::MqttClient;
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Config file used when the daemon is started without arguments
const BINDING_CFG_ENV: &str = "MQTT_GPIO_BINDING_CFG";

/// Bind MQTT topics to GPIO output pins
#[derive(Parser, Debug)]
#[command(name = "mqtt-gpio-bind")]
#[command(about = "Bind MQTT topics to GPIO output pins")]
#[command(version)]
#[command(group(
    ArgGroup::new("binding_source")
        .required(true)
        .args(["config", "topic"]),
))]
struct Cli {
    /// The MQTT topic to bind to the GPIO pin
    #[arg(short, long, value_name = "MQTT TOPIC", requires_all = ["pin", "mqtt_config"])]
    topic: Option<String>,

    /// ID of the GPIO pin to bind the MQTT topic to
    #[arg(short, long, value_name = "ID", requires = "topic")]
    pin: Option<String>,

    /// Invert the received value before it is written to the GPIO pin
    #[arg(short, long, requires = "topic")]
    invert: bool,

    /// The MQTT server configuration file
    #[arg(short, long, value_name = "FILE", requires = "topic")]
    mqtt_config: Option<PathBuf>,

    /// The binding and MQTT server configuration file
    #[arg(short = 'g', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log to the given file instead of stderr
    #[arg(short, long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Enable detailed logging
    #[arg(short, long)]
    verbose: bool,

    /// GPIO backend (auto, sysfs, rppal or log)
    #[arg(long, value_name = "BACKEND", default_value = "auto", env = "GPIO_BACKEND")]
    gpio_backend: GpioBackend,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogFormatArg {
    Json,
    Pretty,
    Compact,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
        }
    }
}

impl Cli {
    /// Arguments from the command line, or from the environment when none
    /// were given
    fn load() -> Self {
        if std::env::args_os().len() > 1 {
            return Cli::parse();
        }

        match std::env::var_os(BINDING_CFG_ENV) {
            Some(config) => Cli {
                topic: None,
                pin: None,
                invert: false,
                mqtt_config: None,
                config: Some(PathBuf::from(config)),
                log_file: None,
                log_format: None,
                verbose: true,
                gpio_backend: std::env::var("GPIO_BACKEND")
                    .ok()
                    .and_then(|backend| backend.parse().ok())
                    .unwrap_or(GpioBackend::Auto),
                check: false,
            },
            None => {
                let _ = Cli::command().print_help();
                process::exit(2);
            }
        }
    }

    fn daemon_config(&self) -> Result<DaemonConfig, ConfigError> {
        if let Some(config) = &self.config {
            info!("Loading configuration from: {}", config.display());
            return DaemonConfig::from_file(config);
        }

        let topic = Self::required_arg(self.topic.as_deref(), "topic")?;
        let pin = Self::required_arg(self.pin.as_deref(), "pin")?;
        let mqtt_config = self
            .mqtt_config
            .as_deref()
            .ok_or_else(|| Self::missing_arg("mqtt-config"))?;

        info!("Loading MQTT configuration from: {}", mqtt_config.display());
        DaemonConfig::with_binding(Binding::new(topic, pin, self.invert), mqtt_config)
    }

    fn required_arg<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ConfigError> {
        value.ok_or_else(|| Self::missing_arg(name))
    }

    fn missing_arg(name: &str) -> ConfigError {
        ConfigError::MissingValue {
            section: "command line".to_string(),
            key: name.to_string(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::load();

    let logging = LoggingOptions::from_env()
        .verbose(cli.verbose)
        .with_format(cli.log_format.map(LogFormat::from))
        .with_log_file(cli.log_file.clone());
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to open log file: {e}");
        process::exit(1);
    }

    info!(
        "Starting mqtt-gpio-bind v{} with PID '{}'",
        env!("CARGO_PKG_VERSION"),
        process::id()
    );

    if let Err(e) = run(&cli).await {
        error!("{}", e);
        process::exit(e.exit_code());
    }

    info!("Shutdown complete");
}

async fn run(cli: &Cli) -> DaemonResult<()> {
    let config = cli.daemon_config()?;

    if cli.check {
        check_config(&config)
    } else {
        run_daemon(config, cli.gpio_backend).await
    }
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    mqtt: &'a BrokerConfig,
    bindings: Vec<Binding>,
}

fn check_config(config: &DaemonConfig) -> DaemonResult<()> {
    let loaded = config.bindings.load()?;
    let report = ConfigReport {
        mqtt: &config.broker,
        bindings: loaded.bindings,
    };

    println!("{}", toml::to_string_pretty(&report)?);
    Ok(())
}

async fn run_daemon(config: DaemonConfig, backend: GpioBackend) -> DaemonResult<()> {
    let platform = Platform::detect();
    info!(platform = ?platform, "Detected platform");
    let writer = backend.create_writer(platform)?;

    let transport = MqttClient::new(&config.broker);
    let mut daemon = BindingDaemon::new(config, transport, writer);
    let (handle, commands) = daemon.handle();

    daemon.start().await?;

    let signals = tokio::spawn(forward_signals(handle));

    let status = daemon.run(commands).await;
    signals.abort();

    info!(
        state = %status.state,
        received = status.stats.received,
        written = status.stats.written,
        "Daemon finished"
    );
    Ok(())
}

/// Turn SIGHUP into reloads and SIGINT/SIGTERM into a shutdown
async fn forward_signals(handle: DaemonHandle) {
    let (mut sighup, mut sigint, mut sigterm) = match (
        signal(SignalKind::hangup()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sighup), Ok(sigint), Ok(sigterm)) => (sighup, sigint, sigterm),
        _ => {
            error!("Failed to install signal handlers, shutting down");
            let _ = handle.shutdown().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading bindings");
                if let Err(e) = handle.reload().await {
                    warn!("Reload failed: {}", e);
                }
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
                break;
            }
        }
    }

    let _ = handle.shutdown().await;
}
