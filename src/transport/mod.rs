//! Transport layer for the binding daemon
//!
//! This module provides the transport abstraction the daemon drives and the
//! MQTT implementation of it.

use crate::config::QosLevel;

pub mod mqtt;

/// Notifications delivered by a transport, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A (re)connection attempt has started
    Connecting,
    /// The broker acknowledged the connection
    Connected,
    /// The connection dropped or the broker closed it
    Disconnected(String),
    /// A message arrived on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
}

/// Transport trait for broker communication
///
/// This trait provides an abstraction over the broker connection (primarily
/// MQTT) so the daemon can be driven by a mock in tests.
#[async_trait::async_trait]
pub trait Transport: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open the connection; acknowledgment arrives later as
    /// [`TransportEvent::Connected`]
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Close the connection and stop the network loop
    async fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Subscribe to a single topic
    async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), Self::Error>;

    /// Remove a subscription
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Wait for the next event; `None` once the transport is shut down
    async fn next_event(&mut self) -> Option<TransportEvent>;
}
