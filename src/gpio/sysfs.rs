//! GPIO output through the Linux sysfs interface
//!
//! Pins are addressed by kernel GPIO number. Identifiers accepted:
//! plain numbers (`"408"`), `GPIOn`, and the CHIP expander names `XIO-P0`
//! through `XIO-P7`, which are offsets from the base of the `pcf8574a`
//! gpiochip.

use super::{GpioWriter, PinAccessError};
use crate::binding::value::level_str;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Label of the I2C expander that provides the CHIP `XIO-Pn` pins
pub const XIO_CHIP_LABEL: &str = "pcf8574a";

const XIO_PREFIX: &str = "XIO-P";
const XIO_PIN_COUNT: u32 = 8;

#[derive(Debug, Clone)]
pub struct SysfsGpioWriter {
    root: PathBuf,
}

impl SysfsGpioWriter {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_SYSFS_ROOT)
    }

    /// Use a different sysfs root (tests point this at a temp dir)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a pin identifier to its kernel GPIO number
    pub async fn resolve_pin(&self, pin: &str) -> Result<u32, PinAccessError> {
        let id = pin.trim();

        if let Ok(number) = id.parse::<u32>() {
            return Ok(number);
        }

        let upper = id.to_ascii_uppercase();

        if let Some(offset) = upper.strip_prefix(XIO_PREFIX) {
            let offset = offset
                .parse::<u32>()
                .ok()
                .filter(|offset| *offset < XIO_PIN_COUNT)
                .ok_or_else(|| PinAccessError::UnknownPin {
                    pin: pin.to_string(),
                    reason: format!("expander pins are XIO-P0 to XIO-P{}", XIO_PIN_COUNT - 1),
                })?;
            let base = self.chip_base(pin, XIO_CHIP_LABEL).await?;
            return Ok(base + offset);
        }

        if let Some(number) = upper.strip_prefix("GPIO") {
            return number.parse::<u32>().map_err(|_| PinAccessError::UnknownPin {
                pin: pin.to_string(),
                reason: "expected GPIO followed by a number".to_string(),
            });
        }

        Err(PinAccessError::UnknownPin {
            pin: pin.to_string(),
            reason: "not a GPIO number, GPIOn or XIO-Pn identifier".to_string(),
        })
    }

    /// Find the base GPIO number of the gpiochip with the given label
    async fn chip_base(&self, pin: &str, label: &str) -> Result<u32, PinAccessError> {
        let io_error = |source: std::io::Error| PinAccessError::Io {
            pin: pin.to_string(),
            source,
        };

        let mut entries = fs::read_dir(&self.root).await.map_err(io_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            if !entry.file_name().to_string_lossy().starts_with("gpiochip") {
                continue;
            }

            let chip_dir = entry.path();
            let chip_label = match fs::read_to_string(chip_dir.join("label")).await {
                Ok(chip_label) => chip_label,
                Err(_) => continue,
            };
            if chip_label.trim() != label {
                continue;
            }

            let base = fs::read_to_string(chip_dir.join("base"))
                .await
                .map_err(io_error)?;
            return base
                .trim()
                .parse::<u32>()
                .map_err(|_| PinAccessError::Unavailable {
                    pin: pin.to_string(),
                    reason: format!("invalid base '{}' for gpiochip {label}", base.trim()),
                });
        }

        Err(PinAccessError::Unavailable {
            pin: pin.to_string(),
            reason: format!("no gpiochip labelled '{label}' under {}", self.root.display()),
        })
    }

    async fn export(&self, pin: &str, number: u32) -> Result<PathBuf, PinAccessError> {
        let pin_dir = self.root.join(format!("gpio{number}"));
        if fs::metadata(&pin_dir).await.is_ok() {
            return Ok(pin_dir);
        }

        debug!(pin = %pin, number, "Exporting GPIO pin");
        fs::write(self.root.join("export"), number.to_string())
            .await
            .map_err(|source| PinAccessError::Io {
                pin: pin.to_string(),
                source,
            })?;

        if fs::metadata(&pin_dir).await.is_err() {
            return Err(PinAccessError::Unavailable {
                pin: pin.to_string(),
                reason: format!("gpio{number} did not appear after export"),
            });
        }

        Ok(pin_dir)
    }
}

impl Default for SysfsGpioWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GpioWriter for SysfsGpioWriter {
    async fn write(&self, pin: &str, value: bool) -> Result<(), PinAccessError> {
        let number = self.resolve_pin(pin).await?;
        let pin_dir = self.export(pin, number).await?;
        let io_error = |source: std::io::Error| PinAccessError::Io {
            pin: pin.to_string(),
            source,
        };

        let direction = fs::read_to_string(pin_dir.join("direction"))
            .await
            .map_err(io_error)?;

        if direction.trim() == "out" {
            fs::write(pin_dir.join("value"), level_str(value))
                .await
                .map_err(io_error)?;
        } else {
            // "high"/"low" switch to output and set the level in one step
            let initial = if value { "high" } else { "low" };
            fs::write(pin_dir.join("direction"), initial)
                .await
                .map_err(io_error)?;
        }

        debug!(pin = %pin, number, value = level_str(value), "Wrote sysfs GPIO");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sysfs"
    }
}
