//! Impure I/O operations for MQTT client
//!
//! This module owns the rumqttc event loop. [`MqttClient::connect`] spawns a
//! supervisor task that polls the loop, turns routed events into
//! [`TransportEvent`]s and sleeps with backoff between reconnection attempts.

use super::connection::{configure_mqtt_options, to_qos, MqttError, ReconnectConfig};
use super::link_monitor::{LinkMonitor, ReconnectionDecision};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::{BrokerConfig, QosLevel};
use crate::transport::{Transport, TransportEvent};
use async_trait::async_trait;
use rumqttc::v5::{AsyncClient, EventLoop};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the request queue between [`AsyncClient`] and the event loop
const REQUEST_CAPACITY: usize = 10;

/// Capacity of the transport event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// MQTT transport backed by rumqttc
pub struct MqttClient {
    client: AsyncClient,
    event_loop: Option<EventLoop>,
    events_tx: Option<mpsc::Sender<TransportEvent>>,
    events_rx: mpsc::Receiver<TransportEvent>,
    shutdown_tx: watch::Sender<bool>,
    event_loop_handle: Option<JoinHandle<()>>,
    reconnect_config: ReconnectConfig,
}

impl MqttClient {
    pub fn new(config: &BrokerConfig) -> Self {
        Self::with_reconnect_config(config, ReconnectConfig::default())
    }

    pub fn with_reconnect_config(config: &BrokerConfig, reconnect_config: ReconnectConfig) -> Self {
        let mqtt_options = configure_mqtt_options(config);
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);

        MqttClient {
            client,
            event_loop: Some(event_loop),
            events_tx: Some(events_tx),
            events_rx,
            shutdown_tx,
            event_loop_handle: None,
            reconnect_config,
        }
    }

    /// Start the supervised network loop
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        let (event_loop, events) = match (self.event_loop.take(), self.events_tx.take()) {
            (Some(event_loop), Some(events)) => (event_loop, events),
            _ => return Err(MqttError::AlreadyStarted),
        };

        // rumqttc connects on the first poll
        let _ = events.send(TransportEvent::Connecting).await;

        let shutdown_rx = self.shutdown_tx.subscribe();
        let reconnect_config = self.reconnect_config.clone();
        let handle = tokio::spawn(async move {
            Self::run_event_loop(event_loop, events, shutdown_rx, reconnect_config).await;
        });

        self.event_loop_handle = Some(handle);
        Ok(())
    }

    async fn run_event_loop(
        mut event_loop: EventLoop,
        events: mpsc::Sender<TransportEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
        reconnect_config: ReconnectConfig,
    ) {
        info!("Starting MQTT event loop");
        let mut link = LinkMonitor::new(reconnect_config);

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping MQTT event loop");
                        break;
                    }
                }

                event_result = event_loop.poll() => {
                    match event_result {
                        Ok(event) => {
                            let route = MessageHandler::route_mqtt_event(&event);
                            match route {
                                EventRoute::ConnectionAcknowledged => {
                                    link.connected();
                                    if events.send(TransportEvent::Connected).await.is_err() {
                                        break;
                                    }
                                }
                                EventRoute::MessageReceived { topic, payload, retain } => {
                                    debug!(topic = %topic, retain, bytes = payload.len(), "Received MQTT message");
                                    if events.send(TransportEvent::Message { topic, payload }).await.is_err() {
                                        break;
                                    }
                                }
                                EventRoute::Disconnected => {
                                    link.link_lost();
                                    let reason = "broker closed the connection".to_string();
                                    if events.send(TransportEvent::Disconnected(reason)).await.is_err() {
                                        break;
                                    }
                                }
                                EventRoute::SubscriptionConfirmed { packet_id, rejected } => {
                                    if rejected > 0 {
                                        warn!(packet_id, rejected, "Broker rejected subscription");
                                    } else {
                                        debug!(packet_id, "Subscription confirmed");
                                    }
                                }
                                EventRoute::InfrastructureEvent(event_str) => {
                                    debug!(target: "mqtt_transport", "MQTT event: {}", event_str);
                                }
                                EventRoute::DisconnectSent => {
                                    debug!("DISCONNECT sent, stopping MQTT event loop");
                                    break;
                                }
                                EventRoute::OutgoingEvent => {}
                            }
                        }
                        Err(e) => {
                            error!("MQTT event loop error: {}", e);
                            if link.link_lost()
                                && events.send(TransportEvent::Disconnected(e.to_string())).await.is_err()
                            {
                                break;
                            }

                            let shutdown_requested = *shutdown_rx.borrow();
                            match link.next_attempt(shutdown_requested) {
                                ReconnectionDecision::Retry { attempt, delay_ms } => {
                                    info!(attempt, delay_ms, "Reconnecting to MQTT broker");
                                    if !Self::interruptible_sleep(shutdown_rx.clone(), delay_ms).await {
                                        break;
                                    }
                                    link.retrying();
                                    if events.send(TransportEvent::Connecting).await.is_err() {
                                        break;
                                    }
                                }
                                ReconnectionDecision::Shutdown => break,
                                ReconnectionDecision::GiveUp { attempts } => {
                                    error!(attempts, "Giving up on MQTT broker");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }

        info!("MQTT event loop stopped");
    }

    /// Perform interruptible sleep with shutdown monitoring
    /// Returns true if sleep completed, false if shutdown requested
    async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay_ms: u64) -> bool {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Shutdown signal received during reconnection delay, stopping");
                    return false;
                }
                true
            }
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => true,
        }
    }

    pub async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), MqttError> {
        self.client
            .subscribe(topic, to_qos(qos))
            .await
            .map_err(|source| MqttError::SubscriptionFailed {
                topic: topic.to_string(),
                source,
            })?;
        debug!(topic = %topic, "Subscribe requested");
        Ok(())
    }

    pub async fn unsubscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|source| MqttError::UnsubscribeFailed {
                topic: topic.to_string(),
                source,
            })?;
        debug!(topic = %topic, "Unsubscribe requested");
        Ok(())
    }

    /// Send DISCONNECT and wait for the network loop to finish
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        let result = self
            .client
            .disconnect()
            .await
            .map_err(MqttError::DisconnectFailed);

        if let Some(handle) = self.event_loop_handle.take() {
            // Give the loop a chance to flush the DISCONNECT before stopping it
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => info!("Event loop task shut down gracefully"),
                Ok(Err(e)) => warn!("Event loop task ended with error: {}", e),
                Err(_) => warn!("Event loop did not stop within {:?}", SHUTDOWN_GRACE),
            }
        }
        let _ = self.shutdown_tx.send(true);

        result
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        MqttClient::connect(self).await
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        MqttClient::disconnect(self).await
    }

    async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), Self::Error> {
        MqttClient::subscribe(self, topic, qos).await
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        MqttClient::unsubscribe(self, topic).await
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }
}
