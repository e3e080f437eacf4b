//! Configuration loading for the binding daemon
//!
//! Config files are TOML. Broker parameters live in an `[mqtt]` table, or at
//! the top level of the file when no such table exists. Bindings are numbered
//! tables `[binding1]`, `[binding2]`, ... read until the first missing index.
//!
//! ```toml
//! [mqtt]
//! host = "localhost"
//! port = 1883
//! client_id = "gpio-device-tools"
//! qos = 1
//!
//! [binding1]
//! topic = "test/value"
//! pin = "XIO-P4"
//! invert = true
//! ```

use crate::binding::{parse_boolean, Binding};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};

/// Name of the broker section
pub const BROKER_SECTION: &str = "mqtt";

/// Section name reported in errors when broker keys are read from the top level
pub const DEFAULT_SECTION: &str = "default";

/// Prefix of the numbered binding sections
pub const BINDING_SECTION_PREFIX: &str = "binding";

pub const DEFAULT_QOS: QosLevel = QosLevel::AtMostOnce;
pub const DEFAULT_RETAIN: bool = true;
pub const DEFAULT_KEEPALIVE_SECS: u16 = 60;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Failed to read config file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML in {}: {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Value '{key}' not defined in section [{section}]")]
    MissingValue { section: String, key: String },
    #[error("Unsupported value for '{key}' in section [{section}]: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
    #[error("Section [{0}] must be a table")]
    InvalidSection(String),
}

impl ConfigError {
    fn missing(section: &str, key: &str) -> Self {
        Self::MissingValue {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    fn invalid<S: Into<String>>(section: &str, key: &str, message: S) -> Self {
        Self::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// MQTT quality-of-service level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<i64> for QosLevel {
    type Error = String;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(QosLevel::AtMostOnce),
            1 => Ok(QosLevel::AtLeastOnce),
            2 => Ok(QosLevel::ExactlyOnce),
            other => Err(format!("QoS must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<QosLevel> for u8 {
    fn from(level: QosLevel) -> Self {
        match level {
            QosLevel::AtMostOnce => 0,
            QosLevel::AtLeastOnce => 1,
            QosLevel::ExactlyOnce => 2,
        }
    }
}

/// Broker connection parameters, fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub qos: QosLevel,
    pub retain: bool,
    /// Keep-alive interval in seconds
    pub keepalive: u16,
}

impl BrokerConfig {
    /// Load broker parameters from a config file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let document = read_document(path)?;
        Self::from_document(&document)
    }

    /// Extract broker parameters from a parsed document, falling back to the
    /// top-level keys when there is no `[mqtt]` table
    pub fn from_document(document: &Table) -> Result<Self, ConfigError> {
        let (section_name, section) = match document.get(BROKER_SECTION) {
            Some(Value::Table(table)) => (BROKER_SECTION, table),
            Some(_) => return Err(ConfigError::InvalidSection(BROKER_SECTION.to_string())),
            None => (DEFAULT_SECTION, document),
        };

        let host = required_string(section_name, section, "host")?;
        let port = required(section_name, section, "port")
            .and_then(|value| integer_value(section_name, "port", value))
            .and_then(|port| {
                u16::try_from(port)
                    .ok()
                    .filter(|port| *port > 0)
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            section_name,
                            "port",
                            format!("port must be in 1..=65535, got {port}"),
                        )
                    })
            })?;
        let client_id = required_string(section_name, section, "client_id")?;

        let qos = match section.get("qos") {
            Some(value) => integer_value(section_name, "qos", value).and_then(|level| {
                QosLevel::try_from(level)
                    .map_err(|message| ConfigError::invalid(section_name, "qos", message))
            })?,
            None => DEFAULT_QOS,
        };

        let retain = match section.get("retain") {
            Some(value) => bool_value(section_name, "retain", value)?,
            None => DEFAULT_RETAIN,
        };

        let keepalive = match section.get("keepalive") {
            Some(value) => integer_value(section_name, "keepalive", value).and_then(|secs| {
                u16::try_from(secs)
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            section_name,
                            "keepalive",
                            format!("keepalive must be in 1..=65535 seconds, got {secs}"),
                        )
                    })
            })?,
            None => DEFAULT_KEEPALIVE_SECS,
        };

        Ok(Self {
            host,
            port,
            client_id,
            qos,
            retain,
            keepalive,
        })
    }
}

/// Where the daemon gets its bindings from
#[derive(Debug, Clone, PartialEq)]
pub enum BindingSource {
    /// Binding sections of a config file, re-read on every reload
    File(PathBuf),
    /// Bindings given on the command line; reload only re-logs them
    Fixed(Vec<Binding>),
}

/// Bindings read from a [`BindingSource`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedBindings {
    pub bindings: Vec<Binding>,
    /// Modification time of the source file, absent for fixed bindings
    pub modified: Option<DateTime<Local>>,
}

impl BindingSource {
    pub fn load(&self) -> Result<LoadedBindings, ConfigError> {
        match self {
            BindingSource::File(path) => {
                let bindings = load_bindings(path)?;
                let modified = config_mtime(path)?;
                Ok(LoadedBindings {
                    bindings,
                    modified: Some(modified),
                })
            }
            BindingSource::Fixed(bindings) => Ok(LoadedBindings {
                bindings: bindings.clone(),
                modified: None,
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            BindingSource::File(path) => Some(path),
            BindingSource::Fixed(_) => None,
        }
    }
}

/// Everything the daemon needs at startup
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub broker: BrokerConfig,
    pub bindings: BindingSource,
}

impl DaemonConfig {
    /// Combined config file holding both broker and binding sections
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let broker = BrokerConfig::load_from_file(path)?;
        Ok(Self {
            broker,
            bindings: BindingSource::File(path.to_path_buf()),
        })
    }

    /// A single binding from the command line plus a broker config file
    pub fn with_binding(binding: Binding, broker_file: &Path) -> Result<Self, ConfigError> {
        if binding.topic().is_empty() {
            return Err(ConfigError::invalid(
                "command line",
                "topic",
                "topic must not be empty",
            ));
        }

        let broker = BrokerConfig::load_from_file(broker_file)?;
        Ok(Self {
            broker,
            bindings: BindingSource::Fixed(vec![binding]),
        })
    }
}

/// Read the numbered binding sections from a config file
pub fn load_bindings(path: &Path) -> Result<Vec<Binding>, ConfigError> {
    let document = read_document(path)?;
    bindings_from_document(&document)
}

/// Extract the numbered binding sections from a parsed document
pub fn bindings_from_document(document: &Table) -> Result<Vec<Binding>, ConfigError> {
    let mut bindings = Vec::new();

    for index in 1.. {
        let section_name = format!("{BINDING_SECTION_PREFIX}{index}");
        let section = match document.get(&section_name) {
            Some(Value::Table(table)) => table,
            Some(_) => return Err(ConfigError::InvalidSection(section_name)),
            None => break,
        };

        let topic = required_string(&section_name, section, "topic")?;
        if topic.is_empty() {
            return Err(ConfigError::invalid(
                &section_name,
                "topic",
                "topic must not be empty",
            ));
        }

        let pin = required_string(&section_name, section, "pin")?;

        let invert = match section.get("invert") {
            Some(value) => bool_value(&section_name, "invert", value)?,
            None => false,
        };

        bindings.push(Binding::new(topic, pin, invert));
    }

    Ok(bindings)
}

/// Modification time of a config file
pub fn config_mtime(path: &Path) -> Result<DateTime<Local>, ConfigError> {
    let modified = std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified))
}

fn read_document(path: &Path) -> Result<Table, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<Table>(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

fn required<'a>(section: &str, table: &'a Table, key: &str) -> Result<&'a Value, ConfigError> {
    table
        .get(key)
        .ok_or_else(|| ConfigError::missing(section, key))
}

fn required_string(section: &str, table: &Table, key: &str) -> Result<String, ConfigError> {
    match required(section, table, key)? {
        Value::String(text) => Ok(text.clone()),
        Value::Integer(number) => Ok(number.to_string()),
        other => Err(ConfigError::invalid(
            section,
            key,
            format!("expected a string, got {}", other.type_str()),
        )),
    }
}

fn integer_value(section: &str, key: &str, value: &Value) -> Result<i64, ConfigError> {
    match value {
        Value::Integer(number) => Ok(*number),
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| {
            ConfigError::invalid(section, key, format!("'{text}' is not an integer"))
        }),
        other => Err(ConfigError::invalid(
            section,
            key,
            format!("expected an integer, got {}", other.type_str()),
        )),
    }
}

fn bool_value(section: &str, key: &str, value: &Value) -> Result<bool, ConfigError> {
    match value {
        Value::Boolean(flag) => Ok(*flag),
        Value::Integer(0) => Ok(false),
        Value::Integer(1) => Ok(true),
        Value::String(text) => {
            parse_boolean(text).map_err(|e| ConfigError::invalid(section, key, e.to_string()))
        }
        other => Err(ConfigError::invalid(
            section,
            key,
            format!("expected a boolean, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Table {
        toml::from_str(content).expect("test document should parse")
    }

    #[test]
    fn test_broker_section() {
        let document = parse(
            r#"
[mqtt]
host = "test"
port = 3333
client_id = "gpio-device-tools"
qos = 1
retain = true
keepalive = 42
"#,
        );

        let broker = BrokerConfig::from_document(&document).unwrap();
        assert_eq!(broker.host, "test");
        assert_eq!(broker.port, 3333);
        assert_eq!(broker.client_id, "gpio-device-tools");
        assert_eq!(broker.qos, QosLevel::AtLeastOnce);
        assert!(broker.retain);
        assert_eq!(broker.keepalive, 42);
    }

    #[test]
    fn test_broker_defaults() {
        let document = parse(
            r#"
[mqtt]
host = "broker.local"
port = "1883"
client_id = "daemon"
"#,
        );

        let broker = BrokerConfig::from_document(&document).unwrap();
        assert_eq!(broker.port, 1883);
        assert_eq!(broker.qos, DEFAULT_QOS);
        assert_eq!(broker.retain, DEFAULT_RETAIN);
        assert_eq!(broker.keepalive, DEFAULT_KEEPALIVE_SECS);
    }

    #[test]
    fn test_broker_falls_back_to_top_level() {
        let document = parse(
            r#"
host = "fallback"
port = 1884
client_id = "top-level"
retain = "off"

[binding1]
topic = "a"
pin = "1"
"#,
        );

        let broker = BrokerConfig::from_document(&document).unwrap();
        assert_eq!(broker.host, "fallback");
        assert_eq!(broker.port, 1884);
        assert!(!broker.retain);
    }

    #[test]
    fn test_broker_missing_required_keys() {
        let document = parse("[mqtt]\nport = 1883\nclient_id = \"x\"\n");
        let err = BrokerConfig::from_document(&document).unwrap_err();
        assert_eq!(err.to_string(), "Value 'host' not defined in section [mqtt]");

        let document = parse("host = \"h\"\nclient_id = \"x\"\n");
        let err = BrokerConfig::from_document(&document).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value 'port' not defined in section [default]"
        );

        let document = parse("[mqtt]\nhost = \"h\"\nport = 1883\n");
        let err = BrokerConfig::from_document(&document).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingValue { ref key, .. } if key == "client_id"
        ));
    }

    #[test]
    fn test_broker_rejects_out_of_range_values() {
        let base = "host = \"h\"\nclient_id = \"c\"\n";

        let document = parse(&format!("[mqtt]\n{base}port = 70000\n"));
        assert!(matches!(
            BrokerConfig::from_document(&document),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "port"
        ));

        let document = parse(&format!("[mqtt]\n{base}port = 1883\nqos = 3\n"));
        assert!(matches!(
            BrokerConfig::from_document(&document),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "qos"
        ));

        let document = parse(&format!("[mqtt]\n{base}port = 1883\nkeepalive = 0\n"));
        assert!(matches!(
            BrokerConfig::from_document(&document),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "keepalive"
        ));
    }

    #[test]
    fn test_bindings_in_order() {
        let document = parse(
            r#"
[binding1]
topic = "test/value"
pin = "XIO-P4"
invert = true

[binding2]
topic = "test/value2"
pin = "XIO-P5"
"#,
        );

        let bindings = bindings_from_document(&document).unwrap();
        assert_eq!(
            bindings,
            vec![
                Binding::new("test/value", "XIO-P4", true),
                Binding::new("test/value2", "XIO-P5", false),
            ]
        );
    }

    #[test]
    fn test_bindings_stop_at_first_gap() {
        let document = parse(
            r#"
[binding1]
topic = "one"
pin = "1"

[binding3]
topic = "three"
pin = "3"
"#,
        );

        let bindings = bindings_from_document(&document).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].topic(), "one");
    }

    #[test]
    fn test_binding_missing_topic() {
        let document = parse(
            r#"
[binding1]
topic = "one"
pin = "1"

[binding2]
pin = "2"
"#,
        );

        let err = bindings_from_document(&document).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value 'topic' not defined in section [binding2]"
        );
    }

    #[test]
    fn test_binding_rejects_empty_topic() {
        let document = parse("[binding1]\ntopic = \"\"\npin = \"1\"\n");
        assert!(matches!(
            bindings_from_document(&document),
            Err(ConfigError::InvalidValue { ref section, .. }) if section == "binding1"
        ));
    }

    #[test]
    fn test_binding_accepts_flexible_values() {
        let document = parse(
            r#"
[binding1]
topic = "numeric/pin"
pin = 17
invert = "yes"

[binding2]
topic = "flag"
pin = "GPIO27"
invert = 1
"#,
        );

        let bindings = bindings_from_document(&document).unwrap();
        assert_eq!(bindings[0], Binding::new("numeric/pin", "17", true));
        assert_eq!(bindings[1], Binding::new("flag", "GPIO27", true));
    }

    #[test]
    fn test_binding_rejects_bad_invert() {
        let document = parse("[binding1]\ntopic = \"t\"\npin = \"1\"\ninvert = \"sometimes\"\n");
        let err = bindings_from_document(&document).unwrap_err();
        assert!(err.to_string().contains("[binding1]"));
        assert!(err.to_string().contains("invert"));
    }

    #[test]
    fn test_fixed_source_has_no_mtime() {
        let source = BindingSource::Fixed(vec![Binding::new("t", "1", false)]);
        let loaded = source.load().unwrap();
        assert_eq!(loaded.bindings.len(), 1);
        assert!(loaded.modified.is_none());
        assert!(source.path().is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = load_bindings(Path::new("/nonexistent/bindings.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_qos_conversion() {
        assert_eq!(QosLevel::try_from(0), Ok(QosLevel::AtMostOnce));
        assert_eq!(QosLevel::try_from(2), Ok(QosLevel::ExactlyOnce));
        assert!(QosLevel::try_from(-1).is_err());
        assert_eq!(u8::from(QosLevel::AtLeastOnce), 1);
    }
}
