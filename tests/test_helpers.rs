//! Test helpers and utilities for integration tests

use mqtt_gpio_bind::binding::Binding;
use mqtt_gpio_bind::config::{BindingSource, BrokerConfig, DaemonConfig, QosLevel};
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Broker section shared by the config fixtures
#[allow(dead_code)]
pub const BROKER_SECTION: &str = r#"
[mqtt]
host = "localhost"
port = 1883
client_id = "gpio-device-tools"
qos = 1
"#;

/// The two bindings used throughout the daemon scenarios
#[allow(dead_code)]
pub const TWO_BINDINGS: &str = r#"
[binding1]
topic = "test/value"
pin = "XIO-P4"
invert = true

[binding2]
topic = "test/value2"
pin = "XIO-P5"
invert = false
"#;

/// Write `content` to a fresh temp file
#[allow(dead_code)]
pub fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{content}").unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Replace the contents of an existing config file
#[allow(dead_code)]
pub fn rewrite_config(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

/// Combined config with the broker section and the two standard bindings
#[allow(dead_code)]
pub fn combined_config() -> NamedTempFile {
    write_config(&format!("{BROKER_SECTION}{TWO_BINDINGS}"))
}

#[allow(dead_code)]
pub fn test_broker() -> BrokerConfig {
    BrokerConfig {
        host: "localhost".to_string(),
        port: 1883,
        client_id: "gpio-device-tools".to_string(),
        qos: QosLevel::AtLeastOnce,
        retain: true,
        keepalive: 60,
    }
}

/// Daemon config with fixed bindings
#[allow(dead_code)]
pub fn fixed_config(bindings: Vec<Binding>) -> DaemonConfig {
    DaemonConfig {
        broker: test_broker(),
        bindings: BindingSource::Fixed(bindings),
    }
}

/// The two standard bindings as values
#[allow(dead_code)]
pub fn two_bindings() -> Vec<Binding> {
    vec![
        Binding::new("test/value", "XIO-P4", true),
        Binding::new("test/value2", "XIO-P5", false),
    ]
}

/// Poll `check` until it returns true, failing the test after two seconds
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert!(result.is_ok(), "condition not met within two seconds");
}
