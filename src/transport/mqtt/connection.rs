//! Pure connection configuration for the MQTT client
//!
//! This module contains pure functions for building client options,
//! mapping QoS levels and computing reconnection delays.

use crate::config::{BrokerConfig, QosLevel};
use rumqttc::v5::{mqttbytes::QoS, ClientError, MqttOptions};
use std::time::Duration;
use thiserror::Error;

/// Reconnection configuration
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive reconnection attempts (None = unlimited)
    pub max_attempts: Option<u32>,
    /// Backoff pattern in milliseconds, one entry per attempt
    pub backoff_pattern: Vec<u64>,
    /// Delay to use after pattern is exhausted
    pub sustained_delay: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff_pattern: vec![500, 1000, 2000, 5000],
            sustained_delay: 10_000,
        }
    }
}

impl ReconnectConfig {
    /// Calculate backoff delay for given attempt (1-based)
    pub fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff_pattern
            .get(index)
            .copied()
            .unwrap_or(self.sustained_delay)
    }
}

/// Errors raised by the MQTT transport
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Event loop already started")]
    AlreadyStarted,
    #[error("Subscription to '{topic}' failed")]
    SubscriptionFailed {
        topic: String,
        #[source]
        source: ClientError,
    },
    #[error("Unsubscribe from '{topic}' failed")]
    UnsubscribeFailed {
        topic: String,
        #[source]
        source: ClientError,
    },
    #[error("Disconnect request failed")]
    DisconnectFailed(#[source] ClientError),
}

/// Pure function to configure MQTT options from the broker section
pub fn configure_mqtt_options(config: &BrokerConfig) -> MqttOptions {
    let mut mqtt_options =
        MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    mqtt_options.set_keep_alive(Duration::from_secs(u64::from(config.keepalive)));
    mqtt_options.set_clean_start(true);
    mqtt_options
}

/// Map the configured QoS level onto the rumqttc type
pub fn to_qos(level: QosLevel) -> QoS {
    match level {
        QosLevel::AtMostOnce => QoS::AtMostOnce,
        QosLevel::AtLeastOnce => QoS::AtLeastOnce,
        QosLevel::ExactlyOnce => QoS::ExactlyOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> BrokerConfig {
        BrokerConfig {
            host: "broker.local".to_string(),
            port: 1884,
            client_id: "gpio-device-tools".to_string(),
            qos: QosLevel::AtLeastOnce,
            retain: true,
            keepalive: 30,
        }
    }

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.backoff_pattern, vec![500, 1000, 2000, 5000]);
        assert_eq!(config.sustained_delay, 10_000);
    }

    #[test]
    fn test_calculate_backoff_delay() {
        let config = ReconnectConfig::default();

        assert_eq!(config.calculate_backoff_delay(1), 500);
        assert_eq!(config.calculate_backoff_delay(2), 1000);
        assert_eq!(config.calculate_backoff_delay(4), 5000);

        // Pattern exhausted
        assert_eq!(config.calculate_backoff_delay(5), 10_000);
        assert_eq!(config.calculate_backoff_delay(100), 10_000);
    }

    #[test]
    fn test_empty_pattern_uses_sustained_delay() {
        let config = ReconnectConfig {
            max_attempts: Some(3),
            backoff_pattern: vec![],
            sustained_delay: 42,
        };
        assert_eq!(config.calculate_backoff_delay(1), 42);
    }

    #[test]
    fn test_configure_mqtt_options() {
        let options = configure_mqtt_options(&broker());

        assert_eq!(
            options.broker_address(),
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(options.client_id(), "gpio-device-tools");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn test_qos_mapping() {
        assert_eq!(to_qos(QosLevel::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(to_qos(QosLevel::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(to_qos(QosLevel::ExactlyOnce), QoS::ExactlyOnce);
    }
}
