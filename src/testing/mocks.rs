//! Mock implementations for testing
//!
//! Provides mock Transport and GpioWriter implementations so the daemon can
//! be exercised without a broker or GPIO hardware.

use crate::config::QosLevel;
use crate::gpio::{GpioWriter, PinAccessError};
use crate::transport::{Transport, TransportEvent};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// A call made on [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    Subscribe(String, QosLevel),
    Unsubscribe(String),
    Disconnect,
}

#[derive(Debug, Error)]
#[error("Mock transport failure: {0}")]
pub struct MockTransportError(pub String);

/// Mock transport for testing
///
/// Events are injected through the paired [`MockBroker`]; once every broker
/// handle is dropped, [`Transport::next_event`] returns `None`.
#[derive(Debug)]
pub struct MockTransport {
    pub calls: Arc<Mutex<Vec<TransportCall>>>,
    pub should_fail: bool,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Test-side end of a [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockBroker {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockTransport {
    pub fn new() -> (Self, MockBroker) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        (
            Self {
                calls: calls.clone(),
                should_fail: false,
                events: events_rx,
            },
            MockBroker {
                calls,
                events: events_tx,
            },
        )
    }

    pub fn with_failure() -> (Self, MockBroker) {
        let (mut transport, broker) = Self::new();
        transport.should_fail = true;
        (transport, broker)
    }

    async fn record(&self, call: TransportCall) -> Result<(), MockTransportError> {
        if self.should_fail {
            return Err(MockTransportError(format!("{call:?} rejected")));
        }
        self.calls.lock().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MockTransportError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        self.record(TransportCall::Connect).await
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.record(TransportCall::Disconnect).await
    }

    async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), Self::Error> {
        self.record(TransportCall::Subscribe(topic.to_string(), qos))
            .await
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.record(TransportCall::Unsubscribe(topic.to_string()))
            .await
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl MockBroker {
    /// Deliver an event to the transport
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn connack(&self) {
        self.emit(TransportEvent::Connected);
    }

    pub fn drop_connection(&self, reason: &str) {
        self.emit(TransportEvent::Disconnected(reason.to_string()));
    }

    pub fn publish(&self, topic: &str, payload: &str) {
        self.emit(TransportEvent::Message {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        });
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    pub async fn subscriptions(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                TransportCall::Subscribe(topic, _) => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn unsubscriptions(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                TransportCall::Unsubscribe(topic) => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn disconnect_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| **call == TransportCall::Disconnect)
            .count()
    }

    pub async fn clear_history(&self) {
        self.calls.lock().await.clear();
    }
}

/// Mock GPIO writer recording every successful write
#[derive(Debug, Clone, Default)]
pub struct MockGpioWriter {
    pub written: Arc<Mutex<Vec<(String, bool)>>>,
    pub failing_pins: Arc<Mutex<HashSet<String>>>,
}

impl MockGpioWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer whose writes to `pin` fail
    pub fn with_failing_pin(pin: &str) -> Self {
        Self {
            failing_pins: Arc::new(Mutex::new(HashSet::from([pin.to_string()]))),
            ..Default::default()
        }
    }

    pub async fn writes(&self) -> Vec<(String, bool)> {
        self.written.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.written.lock().await.clear();
    }
}

#[async_trait]
impl GpioWriter for MockGpioWriter {
    async fn write(&self, pin: &str, value: bool) -> Result<(), PinAccessError> {
        if self.failing_pins.lock().await.contains(pin) {
            return Err(PinAccessError::Io {
                pin: pin.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock failure"),
            });
        }

        self.written.lock().await.push((pin.to_string(), value));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_records_calls() {
        let (mut transport, broker) = MockTransport::new();

        transport.connect().await.unwrap();
        transport
            .subscribe("test/value", QosLevel::AtMostOnce)
            .await
            .unwrap();
        transport.unsubscribe("test/value").await.unwrap();
        transport.disconnect().await.unwrap();

        assert_eq!(broker.subscriptions().await, vec!["test/value".to_string()]);
        assert_eq!(broker.unsubscriptions().await, vec!["test/value".to_string()]);
        assert_eq!(broker.disconnect_count().await, 1);

        broker.clear_history().await;
        assert!(broker.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_transport_failure() {
        let (mut transport, broker) = MockTransport::with_failure();
        assert!(transport.connect().await.is_err());
        assert!(broker.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_transport_events() {
        let (mut transport, broker) = MockTransport::new();
        broker.connack();
        broker.publish("test/value", "on");
        drop(broker);

        assert_eq!(transport.next_event().await, Some(TransportEvent::Connected));
        assert_eq!(
            transport.next_event().await,
            Some(TransportEvent::Message {
                topic: "test/value".to_string(),
                payload: b"on".to_vec(),
            })
        );
        assert_eq!(transport.next_event().await, None);
    }

    #[tokio::test]
    async fn test_mock_gpio_writer() {
        let writer = MockGpioWriter::with_failing_pin("XIO-P7");

        writer.write("XIO-P4", true).await.unwrap();
        assert!(writer.write("XIO-P7", false).await.is_err());
        assert_eq!(writer.writes().await, vec![("XIO-P4".to_string(), true)]);
    }
}
