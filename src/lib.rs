//! mqtt-gpio-bind
//!
//! A daemon that binds MQTT topics to GPIO output pins on single-board
//! computers.
//!
//! # Overview
//!
//! - Binding table and boolean value transform ([`binding`])
//! - TOML configuration for the broker and the bindings ([`config`])
//! - GPIO backends: sysfs, rppal (feature `rpi`) and a dry-run logger ([`gpio`])
//! - MQTT transport built on rumqttc ([`transport`])
//! - The daemon state machine with reload and shutdown ([`daemon`])
//!
//! # Quick Start
//!
//! ```rust
//! use mqtt_gpio_bind::binding::{to_pin_value, Binding, BindingTable};
//!
//! let table = BindingTable::new(vec![
//!     Binding::new("test/value", "XIO-P4", true),
//!     Binding::new("test/value2", "XIO-P5", false),
//! ]);
//!
//! let binding = table.lookup("test/value").unwrap();
//! assert_eq!(binding.pin(), "XIO-P4");
//! assert_eq!(to_pin_value("true", binding.invert()).unwrap(), false);
//! assert!(table.lookup("unbound/topic").is_none());
//! ```

pub mod binding;
pub mod config;
pub mod daemon;
pub mod error;
pub mod gpio;
pub mod observability;
pub mod testing;
pub mod transport;

pub use binding::{Binding, BindingTable};
pub use config::{BrokerConfig, ConfigError, DaemonConfig};
pub use daemon::{BindingDaemon, DaemonHandle, DaemonState, DaemonStatus};
pub use error::{DaemonError, DaemonResult};
pub use gpio::{GpioBackend, GpioWriter, PinAccessError, Platform};
pub use transport::mqtt::MqttClient;
