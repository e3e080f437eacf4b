//! Observability for the binding daemon
//!
//! Structured logging through `tracing`, with span macros for lifecycle
//! operations and message dispatch.

pub mod logging;

pub use logging::{init_logging, parse_level, LogFormat, LoggingOptions};

// Span macros for structured logging
pub use logging::{dispatch_span, lifecycle_span};
