//! gpio-write - write a single value to a GPIO output pin
//!
//! Uses the same boolean literals and GPIO backends as the daemon:
//!
//! ```bash
//! gpio-write --pin XIO-P4 high
//! gpio-write --pin 17 0 --backend sysfs -v
//! ```

use clap::Parser;
use mqtt_gpio_bind::binding::{level_str, parse_boolean};
use mqtt_gpio_bind::error::DaemonResult;
use mqtt_gpio_bind::gpio::{GpioBackend, GpioWriter, Platform};
use mqtt_gpio_bind::observability::{init_logging, LoggingOptions};
use std::process;
use tracing::{debug, error, info};

/// Write a value to a GPIO output pin
#[derive(Parser, Debug)]
#[command(name = "gpio-write")]
#[command(about = "Write a value to a GPIO output pin")]
#[command(version)]
struct Args {
    /// ID of the GPIO pin and the value: HIGH/LOW, true/false, 1/0, on/off
    #[arg(short, long, num_args = 2, value_names = ["ID", "VALUE"], required = true)]
    pin: Vec<String>,

    /// GPIO backend (auto, sysfs, rppal or log)
    #[arg(long, value_name = "BACKEND", default_value = "auto", env = "GPIO_BACKEND")]
    backend: GpioBackend,

    /// Enable verbose mode
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let logging = LoggingOptions::from_env().verbose(args.verbose);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }
    debug!("Options: {:?}", args);

    let (pin, raw_value) = match args.pin.as_slice() {
        [pin, value] => (pin.as_str(), value.as_str()),
        _ => {
            error!("--pin takes exactly two arguments: <ID> <VALUE>");
            process::exit(2);
        }
    };

    match write_pin(pin, raw_value, args.backend).await {
        Ok(value) => info!("{} written to PIN {}", level_str(value), pin),
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

/// Parse the value and drive the pin; returns the written level
async fn write_pin(pin: &str, raw_value: &str, backend: GpioBackend) -> DaemonResult<bool> {
    let value = parse_boolean(raw_value)?;

    let platform = Platform::detect();
    debug!(platform = ?platform, "Detected platform");

    let writer = backend.create_writer(platform)?;
    writer.write(pin, value).await?;
    Ok(value)
}
