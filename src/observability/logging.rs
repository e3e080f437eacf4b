//! Structured logging system using tracing crate
//!
//! ## Log Format Options
//!
//! Three output formats, chosen with `LOG_FORMAT` or `--log-format`:
//!
//! - `json` - Structured JSON format for log aggregation systems
//! - `pretty` - Human-readable format with colors and indentation
//! - `compact` - Terminal-friendly single-line format (default)
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: Log level (ERROR, WARN, INFO, DEBUG, TRACE) - defaults to INFO
//! - `LOG_FORMAT`: Output format (json, pretty, compact) - defaults to compact
//! - `LOG_SPANS`: Include span events (true/false) - defaults to false
//! - `RUST_LOG`: Override log filtering (follows env_logger format)
//!
//! ## Examples
//!
//! ```bash
//! # Debug output on the terminal
//! mqtt-gpio-bind --config /etc/mqtt-gpio-bind.toml -v
//!
//! # JSON lines into a file
//! LOG_FORMAT=json mqtt-gpio-bind --config bindings.toml --log-file /var/log/gpio.log
//! ```

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for structured logging (machine-readable)
    Json,
    /// Pretty format with colors and indentation (human-readable)
    Pretty,
    /// Compact format with minimal spacing (terminal-friendly)
    Compact,
}

impl LogFormat {
    /// Parse log format from string; unknown names fall back to compact
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Parse a level name; unknown names fall back to INFO
pub fn parse_level(s: &str) -> Level {
    match s.to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Everything needed to install the subscriber
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub level: Level,
    pub format: LogFormat,
    pub include_spans: bool,
    /// Append to this file instead of writing to stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            include_spans: false,
            log_file: None,
        }
    }
}

impl LoggingOptions {
    /// Options from `LOG_LEVEL`, `LOG_FORMAT` and `LOG_SPANS`
    pub fn from_env() -> Self {
        let level = env::var("LOG_LEVEL")
            .map(|level| parse_level(&level))
            .unwrap_or(Level::INFO);
        let format = env::var("LOG_FORMAT")
            .map(|format| LogFormat::parse(&format))
            .unwrap_or(LogFormat::Compact);
        let include_spans = env::var("LOG_SPANS")
            .map(|spans| spans.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            level,
            format,
            include_spans,
            log_file: None,
        }
    }

    /// Force DEBUG, as `-v` does
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose && self.level < Level::DEBUG {
            self.level = Level::DEBUG;
        }
        self
    }

    pub fn with_format(mut self, format: Option<LogFormat>) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Filter directives, with dependency noise reduced
    pub fn filter_directives(&self) -> String {
        format!("{},rumqttc=warn,tokio=warn", self.level)
    }
}

/// Install the global subscriber
///
/// Fails only if the log file cannot be opened.
pub fn init_logging(options: &LoggingOptions) -> std::io::Result<()> {
    let filter = match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => EnvFilter::new(options.filter_directives()),
    };

    let (writer, ansi) = match &options.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    match options.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_span_events(options.span_events());
            subscriber.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_ansi(ansi)
                .with_writer(writer)
                .with_span_events(options.span_events());
            subscriber.with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_ansi(ansi)
                .with_target(false)
                .with_writer(writer)
                .with_span_events(options.span_events());
            subscriber.with(fmt_layer).init();
        }
    }

    Ok(())
}

/// Create a lifecycle event span (start, reload, shutdown)
#[macro_export]
macro_rules! lifecycle_span {
    ($($field:tt)*) => {
        tracing::info_span!("lifecycle_event", $($field)*)
    };
}

/// Create a message dispatch span
#[macro_export]
macro_rules! dispatch_span {
    ($($field:tt)*) => {
        tracing::info_span!("message_dispatch", $($field)*)
    };
}

pub use {dispatch_span, lifecycle_span};
