//! MQTT client implementation of the daemon transport
//!
//! This module separates pure functions from I/O operations for better
//! testability and maintainability.
//!
//! # Architecture
//!
//! - [`connection`] - Pure option building, QoS mapping and reconnect backoff
//! - [`link_monitor`] - Pure outage tracking and reconnect decisions
//! - [`message_handler`] - Pure routing of rumqttc events to transport events
//! - [`client`] - Impure I/O: the network loop task and request forwarding
//!
//! # Usage
//!
//! ```rust,no_run
//! use mqtt_gpio_bind::config::{BrokerConfig, QosLevel};
//! use mqtt_gpio_bind::transport::mqtt::MqttClient;
//! use mqtt_gpio_bind::transport::Transport;
//!
//! # tokio_test::block_on(async {
//! let config = BrokerConfig {
//!     host: "localhost".to_string(),
//!     port: 1883,
//!     client_id: "gpio-device-tools".to_string(),
//!     qos: QosLevel::AtMostOnce,
//!     retain: true,
//!     keepalive: 60,
//! };
//!
//! let mut client = MqttClient::new(&config);
//! client.connect().await?;
//! client.subscribe("test/value", config.qos).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod link_monitor;
pub mod message_handler;

pub use client::MqttClient;
pub use connection::{MqttError, ReconnectConfig};
pub use message_handler::{EventRoute, MessageHandler};
