//! Events processed by the daemon's state-transition function

use crate::transport::TransportEvent;

/// Everything that can move the daemon between states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    /// A connection attempt started
    Connecting,
    /// The broker acknowledged the connection
    Connected,
    /// The connection dropped, with the reason reported by the transport
    Disconnected(String),
    /// A message arrived
    Message { topic: String, payload: Vec<u8> },
    /// Shutdown was requested
    Shutdown,
}

impl From<TransportEvent> for DaemonEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Connecting => DaemonEvent::Connecting,
            TransportEvent::Connected => DaemonEvent::Connected,
            TransportEvent::Disconnected(reason) => DaemonEvent::Disconnected(reason),
            TransportEvent::Message { topic, payload } => DaemonEvent::Message { topic, payload },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_event() {
        assert_eq!(
            DaemonEvent::from(TransportEvent::Connected),
            DaemonEvent::Connected
        );
        assert_eq!(
            DaemonEvent::from(TransportEvent::Disconnected("reset".to_string())),
            DaemonEvent::Disconnected("reset".to_string())
        );
        assert_eq!(
            DaemonEvent::from(TransportEvent::Message {
                topic: "test/value".to_string(),
                payload: b"on".to_vec(),
            }),
            DaemonEvent::Message {
                topic: "test/value".to_string(),
                payload: b"on".to_vec(),
            }
        );
    }
}
