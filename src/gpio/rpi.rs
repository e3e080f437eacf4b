//! Raspberry Pi GPIO through rppal
//!
//! Pins are BCM numbers, given either plainly (`"17"`) or as `GPIO17`/`BCM17`.
//! Output pins are kept open for the life of the writer so their level holds
//! between messages.

use super::{GpioWriter, PinAccessError};
use async_trait::async_trait;
use rppal::gpio::{Gpio, OutputPin};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

pub struct RppalGpioWriter {
    gpio: Gpio,
    pins: Mutex<HashMap<u8, OutputPin>>,
}

impl RppalGpioWriter {
    pub fn new() -> Result<Self, PinAccessError> {
        let gpio = Gpio::new().map_err(|e| PinAccessError::Unavailable {
            pin: "*".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            gpio,
            pins: Mutex::new(HashMap::new()),
        })
    }

    /// Parse a BCM pin identifier
    pub fn parse_bcm(pin: &str) -> Result<u8, PinAccessError> {
        let id = pin.trim().to_ascii_uppercase();
        let number = id
            .strip_prefix("GPIO")
            .or_else(|| id.strip_prefix("BCM"))
            .unwrap_or(&id);

        number.parse::<u8>().map_err(|_| PinAccessError::UnknownPin {
            pin: pin.to_string(),
            reason: "expected a BCM pin number".to_string(),
        })
    }

    fn set_level(&self, pin: &str, bcm: u8, value: bool) -> Result<(), PinAccessError> {
        let mut pins = self.pins.lock().map_err(|_| PinAccessError::Unavailable {
            pin: pin.to_string(),
            reason: "pin registry lock poisoned".to_string(),
        })?;

        if !pins.contains_key(&bcm) {
            let mut output = self
                .gpio
                .get(bcm)
                .map_err(|e| PinAccessError::Unavailable {
                    pin: pin.to_string(),
                    reason: e.to_string(),
                })?
                .into_output();
            output.set_reset_on_drop(false);
            pins.insert(bcm, output);
        }

        if let Some(output) = pins.get_mut(&bcm) {
            if value {
                output.set_high();
            } else {
                output.set_low();
            }
        }

        Ok(())
    }
}

#[async_trait]
impl GpioWriter for RppalGpioWriter {
    async fn write(&self, pin: &str, value: bool) -> Result<(), PinAccessError> {
        let bcm = Self::parse_bcm(pin)?;
        self.set_level(pin, bcm, value)?;
        debug!(pin = %pin, bcm, value, "Wrote rppal GPIO");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rppal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bcm() {
        assert_eq!(RppalGpioWriter::parse_bcm("17").unwrap(), 17);
        assert_eq!(RppalGpioWriter::parse_bcm("GPIO4").unwrap(), 4);
        assert_eq!(RppalGpioWriter::parse_bcm("bcm27").unwrap(), 27);
        assert!(RppalGpioWriter::parse_bcm("XIO-P4").is_err());
        assert!(RppalGpioWriter::parse_bcm("300").is_err());
    }
}
