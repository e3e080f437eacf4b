//! Error types for the binding daemon
//!
//! Each concern owns its error enum; [`DaemonError`] gathers them for the
//! binaries, which turn it into an exit code.

use crate::binding::InvalidBooleanLiteral;
use crate::config::ConfigError;
use crate::gpio::PinAccessError;
use thiserror::Error;

/// Main error type for daemon operations
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    InvalidBooleanLiteral(#[from] InvalidBooleanLiteral),

    #[error("GPIO error: {0}")]
    PinAccess(#[from] PinAccessError),

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to render configuration: {0}")]
    Report(#[from] toml::ser::Error),

    #[error("Daemon is not running")]
    NotRunning,
}

impl DaemonError {
    /// Wrap an error from any [`crate::transport::Transport`] implementation
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(error))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, DaemonError::Config(_))
    }

    /// Process exit code: 2 for bad input, 1 for runtime failures
    pub fn exit_code(&self) -> i32 {
        if self.is_config_error() || matches!(self, DaemonError::InvalidBooleanLiteral(_)) {
            2
        } else {
            1
        }
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
