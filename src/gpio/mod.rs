//! GPIO output backends
//!
//! The daemon only needs one operation from the hardware: drive a named pin
//! high or low. [`GpioWriter`] is that seam; the concrete backends form a
//! closed set selected through [`GpioBackend`].

pub mod platform;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod sysfs;

pub use platform::Platform;
pub use sysfs::SysfsGpioWriter;

use async_trait::async_trait;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Failure to drive an output pin
#[derive(Debug, Error)]
pub enum PinAccessError {
    #[error("Unknown GPIO pin '{pin}': {reason}")]
    UnknownPin { pin: String, reason: String },
    #[error("I/O error on GPIO pin '{pin}'")]
    Io {
        pin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("GPIO pin '{pin}' unavailable: {reason}")]
    Unavailable { pin: String, reason: String },
}

impl PinAccessError {
    pub fn pin(&self) -> &str {
        match self {
            PinAccessError::UnknownPin { pin, .. }
            | PinAccessError::Io { pin, .. }
            | PinAccessError::Unavailable { pin, .. } => pin,
        }
    }
}

/// Applies a level to an output pin on the host platform
#[async_trait]
pub trait GpioWriter: Send + Sync {
    /// Drive `pin` high (`true`) or low (`false`)
    async fn write(&self, pin: &str, value: bool) -> Result<(), PinAccessError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<W: GpioWriter + ?Sized> GpioWriter for Box<W> {
    async fn write(&self, pin: &str, value: bool) -> Result<(), PinAccessError> {
        (**self).write(pin, value).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Backend that only logs what it would write
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingGpioWriter;

#[async_trait]
impl GpioWriter for LoggingGpioWriter {
    async fn write(&self, pin: &str, value: bool) -> Result<(), PinAccessError> {
        info!(
            pin = %pin,
            value = crate::binding::value::level_str(value),
            "Dry run: pin not written"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Selectable GPIO backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioBackend {
    /// Pick a backend for the detected platform
    Auto,
    /// Linux sysfs interface under `/sys/class/gpio`
    Sysfs,
    /// rppal on a Raspberry Pi (requires the `rpi` feature)
    Rppal,
    /// Log writes without touching hardware
    Log,
}

impl FromStr for GpioBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(GpioBackend::Auto),
            "sysfs" => Ok(GpioBackend::Sysfs),
            "rppal" | "rpi" => Ok(GpioBackend::Rppal),
            "log" | "dry-run" => Ok(GpioBackend::Log),
            other => Err(format!(
                "unknown GPIO backend '{other}' (expected auto, sysfs, rppal or log)"
            )),
        }
    }
}

impl GpioBackend {
    /// Resolve `Auto` against the platform
    pub fn resolve(self, platform: Platform) -> GpioBackend {
        match self {
            GpioBackend::Auto => match platform {
                Platform::RaspberryPi if cfg!(feature = "rpi") => GpioBackend::Rppal,
                _ => GpioBackend::Sysfs,
            },
            other => other,
        }
    }

    /// Construct the writer for this backend
    pub fn create_writer(self, platform: Platform) -> Result<Box<dyn GpioWriter>, PinAccessError> {
        let writer: Box<dyn GpioWriter> = match self.resolve(platform) {
            GpioBackend::Sysfs | GpioBackend::Auto => Box::new(SysfsGpioWriter::new()),
            GpioBackend::Log => Box::new(LoggingGpioWriter),
            #[cfg(feature = "rpi")]
            GpioBackend::Rppal => Box::new(rpi::RppalGpioWriter::new()?),
            #[cfg(not(feature = "rpi"))]
            GpioBackend::Rppal => {
                return Err(PinAccessError::Unavailable {
                    pin: "*".to_string(),
                    reason: "built without the 'rpi' feature".to_string(),
                })
            }
        };

        info!(backend = writer.name(), platform = ?platform, "GPIO backend selected");
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("auto".parse::<GpioBackend>(), Ok(GpioBackend::Auto));
        assert_eq!("SYSFS".parse::<GpioBackend>(), Ok(GpioBackend::Sysfs));
        assert_eq!("rpi".parse::<GpioBackend>(), Ok(GpioBackend::Rppal));
        assert_eq!("dry-run".parse::<GpioBackend>(), Ok(GpioBackend::Log));
        assert!("wiringpi".parse::<GpioBackend>().is_err());
    }

    #[test]
    fn test_auto_resolution() {
        assert_eq!(GpioBackend::Auto.resolve(Platform::Chip), GpioBackend::Sysfs);
        assert_eq!(
            GpioBackend::Auto.resolve(Platform::Generic),
            GpioBackend::Sysfs
        );
        assert_eq!(GpioBackend::Log.resolve(Platform::Chip), GpioBackend::Log);

        let expected = if cfg!(feature = "rpi") {
            GpioBackend::Rppal
        } else {
            GpioBackend::Sysfs
        };
        assert_eq!(GpioBackend::Auto.resolve(Platform::RaspberryPi), expected);
    }

    #[tokio::test]
    async fn test_logging_writer_never_fails() {
        let writer: Box<dyn GpioWriter> = GpioBackend::Log
            .create_writer(Platform::Generic)
            .unwrap();
        assert_eq!(writer.name(), "log");
        assert!(writer.write("XIO-P4", true).await.is_ok());
    }

    #[cfg(not(feature = "rpi"))]
    #[test]
    fn test_rppal_unavailable_without_feature() {
        let result = GpioBackend::Rppal.create_writer(Platform::RaspberryPi);
        assert!(matches!(result, Err(PinAccessError::Unavailable { .. })));
    }

    #[test]
    fn test_pin_access_error_reports_pin() {
        let err = PinAccessError::UnknownPin {
            pin: "XIO-P9".to_string(),
            reason: "no such pin".to_string(),
        };
        assert_eq!(err.pin(), "XIO-P9");
        assert_eq!(err.to_string(), "Unknown GPIO pin 'XIO-P9': no such pin");
    }
}
