//! The MQTT-to-GPIO binding daemon
//!
//! [`BindingDaemon`] owns the binding table, the broker transport and the
//! GPIO writer. A single task drives it: transport events and control
//! commands are handled one at a time, so the table is replaced by a plain
//! ownership swap and a dispatch never sees a partial update.

pub mod event;
pub mod handle;
pub mod state;

pub use event::DaemonEvent;
pub use handle::{DaemonCommand, DaemonHandle, COMMAND_CHANNEL_CAPACITY};
pub use state::{
    log_state_transition, next_state, DaemonState, DaemonStatus, DispatchStats, SubscriptionPlan,
};

use crate::binding::value::level_str;
use crate::binding::{to_pin_value, BindingTable};
use crate::config::{BindingSource, DaemonConfig, QosLevel};
use crate::error::{DaemonError, DaemonResult};
use crate::gpio::GpioWriter;
use crate::transport::Transport;
use crate::{dispatch_span, lifecycle_span};
use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn, Instrument};

/// Result of dispatching one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The pin was written with this level
    Written { pin: String, value: bool },
    /// No binding for the topic
    Unbound,
    /// The payload was not a boolean literal
    InvalidLiteral,
    /// The GPIO writer reported an error
    WriteFailed { pin: String },
    /// The daemon was not connected
    Ignored,
}

pub struct BindingDaemon<T, W>
where
    T: Transport,
    W: GpioWriter,
{
    source: BindingSource,
    qos: QosLevel,
    table: BindingTable,
    transport: T,
    writer: W,
    state: DaemonState,
    last_config_mtime: Option<DateTime<Local>>,
    stats: DispatchStats,
    status_tx: watch::Sender<DaemonStatus>,
}

impl<T, W> BindingDaemon<T, W>
where
    T: Transport,
    W: GpioWriter,
{
    pub fn new(config: DaemonConfig, transport: T, writer: W) -> Self {
        let (status_tx, _) = watch::channel(DaemonStatus::default());

        Self {
            source: config.bindings,
            qos: config.broker.qos,
            table: BindingTable::default(),
            transport,
            writer,
            state: DaemonState::Disconnected,
            last_config_mtime: None,
            stats: DispatchStats::default(),
            status_tx,
        }
    }

    /// Create a handle for controlling [`BindingDaemon::run`] from other tasks
    pub fn handle(&self) -> (DaemonHandle, mpsc::Receiver<DaemonCommand>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        (
            DaemonHandle::new(command_tx, self.status_tx.subscribe()),
            command_rx,
        )
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            state: self.state,
            connected: self.state.is_connected(),
            last_config_mtime: self.last_config_mtime,
            bindings: self.table.len(),
            stats: self.stats,
        }
    }

    /// Load the bindings and open the broker connection
    ///
    /// Configuration errors here are fatal for the caller.
    pub async fn start(&mut self) -> DaemonResult<()> {
        let span = lifecycle_span!(operation = "start");
        async {
            if self.state == DaemonState::Stopped {
                return Err(DaemonError::NotRunning);
            }

            let loaded = self.source.load()?;
            self.table.replace(loaded.bindings);
            self.last_config_mtime = loaded.modified;
            self.log_table("Loaded bindings");

            self.apply(DaemonEvent::Connecting).await;
            self.transport
                .connect()
                .await
                .map_err(DaemonError::transport)?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Feed one event through the state machine and perform its side effects
    pub async fn handle_event(&mut self, event: DaemonEvent) -> Option<DispatchOutcome> {
        self.apply(event).await
    }

    async fn apply(&mut self, event: DaemonEvent) -> Option<DispatchOutcome> {
        let previous = self.state;
        if previous == DaemonState::Stopped {
            debug!(event = ?event, "Ignoring event after shutdown");
            return None;
        }

        let next = next_state(previous, &event);

        if event == DaemonEvent::Shutdown && previous.connection_open() {
            info!("Disconnecting from MQTT broker");
            if let Err(e) = self.transport.disconnect().await {
                warn!("Disconnect from MQTT broker failed: {}", e);
            }
        }

        if next != previous {
            log_state_transition(previous, next, &event);
            self.state = next;
        }

        let outcome = match event {
            DaemonEvent::Connected => {
                self.subscribe_all().await;
                None
            }
            DaemonEvent::Message { topic, payload } => Some(self.dispatch(&topic, &payload).await),
            _ => None,
        };

        self.publish_status();
        outcome
    }

    async fn subscribe_all(&mut self) {
        for topic in self.table.topics() {
            match self.transport.subscribe(topic, self.qos).await {
                Ok(()) => info!("Subscribed to topic '{}'", topic),
                Err(e) => error!(topic = %topic, "Subscribe failed: {}", e),
            }
        }
    }

    /// Route a message to its pin
    pub async fn dispatch(&mut self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let span = dispatch_span!(topic = %topic);
        self.dispatch_inner(topic, payload).instrument(span).await
    }

    async fn dispatch_inner(&mut self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        if !self.state.is_connected() {
            debug!(state = %self.state, "Message arrived while not connected, ignoring");
            return DispatchOutcome::Ignored;
        }
        self.stats.received += 1;

        let Some(binding) = self.table.lookup(topic) else {
            self.stats.unbound += 1;
            debug!("No binding for topic, discarding");
            return DispatchOutcome::Unbound;
        };

        let raw = String::from_utf8_lossy(payload);
        let raw = raw.trim();
        let pin = binding.pin().to_string();

        let value = match to_pin_value(raw, binding.invert()) {
            Ok(value) => value,
            Err(e) => {
                self.stats.invalid += 1;
                warn!(pin = %pin, payload = %raw, "Discarding message: {}", e);
                return DispatchOutcome::InvalidLiteral;
            }
        };

        match self.writer.write(&pin, value).await {
            Ok(()) => {
                self.stats.written += 1;
                info!(
                    pin = %pin,
                    payload = %raw,
                    "Wrote {} to GPIO Pin '{}'",
                    level_str(value),
                    pin
                );
                DispatchOutcome::Written { pin, value }
            }
            Err(e) => {
                self.stats.write_failures += 1;
                error!(pin = %pin, payload = %raw, "GPIO write failed: {}", e);
                DispatchOutcome::WriteFailed { pin }
            }
        }
    }

    /// Re-read the bindings and bring subscriptions in line with them
    ///
    /// On error the current table stays in place.
    pub async fn reload(&mut self) -> DaemonResult<()> {
        let span = lifecycle_span!(operation = "reload");
        async {
            if self.state == DaemonState::Stopped {
                return Err(DaemonError::NotRunning);
            }

            let loaded = match self.source.load() {
                Ok(loaded) => loaded,
                Err(e) => {
                    error!(
                        bindings = self.table.len(),
                        "Reload failed, keeping current bindings: {}", e
                    );
                    return Err(e.into());
                }
            };

            let previous = BindingTable::new(self.table.replace(loaded.bindings));
            if loaded.modified.is_some() {
                self.last_config_mtime = loaded.modified;
            }
            self.log_table("Reloaded bindings");

            let plan = SubscriptionPlan::between(&previous, &self.table);
            if plan.is_empty() {
                debug!("Subscriptions unchanged");
            } else if self.state.is_connected() {
                for topic in &plan.unsubscribe {
                    match self.transport.unsubscribe(topic).await {
                        Ok(()) => info!("Unsubscribed from topic '{}'", topic),
                        Err(e) => error!(topic = %topic, "Unsubscribe failed: {}", e),
                    }
                }
                for topic in &plan.subscribe {
                    match self.transport.subscribe(topic, self.qos).await {
                        Ok(()) => info!("Subscribed to topic '{}'", topic),
                        Err(e) => error!(topic = %topic, "Subscribe failed: {}", e),
                    }
                }
            }

            self.publish_status();
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Disconnect if a connection is open and stop; later calls do nothing
    pub async fn shutdown(&mut self) {
        if self.state == DaemonState::Stopped {
            return;
        }

        let span = lifecycle_span!(operation = "shutdown");
        async {
            self.apply(DaemonEvent::Shutdown).await;
            let stats = self.stats;
            info!(
                received = stats.received,
                written = stats.written,
                write_failures = stats.write_failures,
                unbound = stats.unbound,
                invalid = stats.invalid,
                "Dispatch summary"
            );
        }
        .instrument(span)
        .await
    }

    /// Process transport events and control commands until shutdown
    ///
    /// Returns the final status. The loop also ends when the transport stops
    /// producing events or every [`DaemonHandle`] is gone.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<DaemonCommand>) -> DaemonStatus {
        while self.state != DaemonState::Stopped {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(DaemonCommand::Reload(reply)) => {
                        let result = self.reload().await;
                        let _ = reply.send(result);
                    }
                    Some(DaemonCommand::Shutdown) => self.shutdown().await,
                    None => {
                        info!("Control channel closed");
                        self.shutdown().await;
                    }
                },
                event = self.transport.next_event() => match event {
                    Some(event) => {
                        self.apply(event.into()).await;
                    }
                    None => {
                        warn!("Transport stopped delivering events");
                        self.shutdown().await;
                    }
                },
            }
        }

        self.status()
    }

    fn log_table(&self, message: &str) {
        match self.source.path() {
            Some(path) => info!(
                bindings = self.table.len(),
                path = %path.display(),
                "{}", message
            ),
            None => info!(bindings = self.table.len(), "{}", message),
        }
        self.table.log_bindings();
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }
}
