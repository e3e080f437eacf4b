//! Pure state handling for the binding daemon
//!
//! All transitions go through [`next_state`]; the daemon only performs the
//! I/O that belongs to a transition.

use super::event::DaemonEvent;
use crate::binding::BindingTable;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Lifecycle state of the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DaemonState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

impl DaemonState {
    pub fn is_connected(self) -> bool {
        self == DaemonState::Connected
    }

    /// A broker connection exists or is being established
    pub fn connection_open(self) -> bool {
        matches!(self, DaemonState::Connecting | DaemonState::Connected)
    }
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DaemonState::Disconnected => "disconnected",
            DaemonState::Connecting => "connecting",
            DaemonState::Connected => "connected",
            DaemonState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Determine next state after an event (pure function)
///
/// `Stopped` is terminal. Messages never change the state.
pub fn next_state(current: DaemonState, event: &DaemonEvent) -> DaemonState {
    match (current, event) {
        (DaemonState::Stopped, _) => DaemonState::Stopped,
        (_, DaemonEvent::Shutdown) => DaemonState::Stopped,
        (_, DaemonEvent::Connecting) => DaemonState::Connecting,
        (_, DaemonEvent::Connected) => DaemonState::Connected,
        (_, DaemonEvent::Disconnected(_)) => DaemonState::Disconnected,
        (state, DaemonEvent::Message { .. }) => state,
    }
}

/// Log a state transition
pub fn log_state_transition(from: DaemonState, to: DaemonState, event: &DaemonEvent) {
    match (from, to, event) {
        (_, DaemonState::Connecting, _) => info!("Connecting to MQTT broker"),
        (_, DaemonState::Connected, _) => info!("Connected to MQTT broker"),
        (DaemonState::Connected, DaemonState::Disconnected, DaemonEvent::Disconnected(reason)) => {
            warn!(reason = %reason, "Lost connection to MQTT broker")
        }
        (_, DaemonState::Disconnected, DaemonEvent::Disconnected(reason)) => {
            warn!(reason = %reason, "Could not connect to MQTT broker")
        }
        (_, DaemonState::Stopped, _) => info!("Daemon stopped"),
        _ => info!("Daemon state: {} -> {}", from, to),
    }
}

/// Counters for message dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Messages delivered while connected
    pub received: u64,
    /// Successful GPIO writes
    pub written: u64,
    pub write_failures: u64,
    /// Messages on topics without a binding
    pub unbound: u64,
    /// Payloads that were not boolean literals
    pub invalid: u64,
}

/// Snapshot of the daemon published after every handled event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub connected: bool,
    pub last_config_mtime: Option<DateTime<Local>>,
    pub bindings: usize,
    pub stats: DispatchStats,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            state: DaemonState::Disconnected,
            connected: false,
            last_config_mtime: None,
            bindings: 0,
            stats: DispatchStats::default(),
        }
    }
}

/// Subscription changes needed to move from one table to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPlan {
    /// Topics only the old table had
    pub unsubscribe: Vec<String>,
    /// Topics only the new table has, in table order
    pub subscribe: Vec<String>,
}

impl SubscriptionPlan {
    pub fn between(old: &BindingTable, new: &BindingTable) -> Self {
        let old_topics = old.topics();
        let new_topics = new.topics();

        Self {
            unsubscribe: old_topics
                .iter()
                .filter(|topic| !new_topics.contains(*topic))
                .map(|topic| topic.to_string())
                .collect(),
            subscribe: new_topics
                .iter()
                .filter(|topic| !old_topics.contains(*topic))
                .map(|topic| topic.to_string())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unsubscribe.is_empty() && self.subscribe.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Binding;

    fn message() -> DaemonEvent {
        DaemonEvent::Message {
            topic: "test/value".to_string(),
            payload: b"1".to_vec(),
        }
    }

    #[test]
    fn test_connection_cycle() {
        let state = DaemonState::Disconnected;
        let state = next_state(state, &DaemonEvent::Connecting);
        assert_eq!(state, DaemonState::Connecting);
        let state = next_state(state, &DaemonEvent::Connected);
        assert_eq!(state, DaemonState::Connected);
        let state = next_state(state, &DaemonEvent::Disconnected("io".to_string()));
        assert_eq!(state, DaemonState::Disconnected);
        let state = next_state(state, &DaemonEvent::Connecting);
        assert_eq!(state, DaemonState::Connecting);
    }

    #[test]
    fn test_messages_do_not_change_state() {
        for state in [
            DaemonState::Disconnected,
            DaemonState::Connecting,
            DaemonState::Connected,
        ] {
            assert_eq!(next_state(state, &message()), state);
        }
    }

    #[test]
    fn test_stopped_is_terminal() {
        for event in [
            DaemonEvent::Connecting,
            DaemonEvent::Connected,
            DaemonEvent::Disconnected("late".to_string()),
            message(),
            DaemonEvent::Shutdown,
        ] {
            assert_eq!(next_state(DaemonState::Stopped, &event), DaemonState::Stopped);
        }
    }

    #[test]
    fn test_shutdown_from_any_state() {
        for state in [
            DaemonState::Disconnected,
            DaemonState::Connecting,
            DaemonState::Connected,
        ] {
            assert_eq!(next_state(state, &DaemonEvent::Shutdown), DaemonState::Stopped);
        }
    }

    #[test]
    fn test_connection_open() {
        assert!(!DaemonState::Disconnected.connection_open());
        assert!(DaemonState::Connecting.connection_open());
        assert!(DaemonState::Connected.connection_open());
        assert!(!DaemonState::Stopped.connection_open());
        assert!(DaemonState::Connected.is_connected());
        assert!(!DaemonState::Connecting.is_connected());
    }

    #[test]
    fn test_subscription_plan() {
        let old = BindingTable::new(vec![
            Binding::new("test/value", "XIO-P4", true),
            Binding::new("test/value2", "XIO-P5", false),
        ]);
        let new = BindingTable::new(vec![
            Binding::new("test/value2", "XIO-P6", false),
            Binding::new("test/value3", "XIO-P7", false),
        ]);

        let plan = SubscriptionPlan::between(&old, &new);
        assert_eq!(plan.unsubscribe, vec!["test/value".to_string()]);
        assert_eq!(plan.subscribe, vec!["test/value3".to_string()]);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_subscription_plan_identical_tables() {
        let table = BindingTable::new(vec![Binding::new("a", "1", false)]);
        assert!(SubscriptionPlan::between(&table, &table.clone()).is_empty());
    }

    #[test]
    fn test_status_serializes() {
        let status = DaemonStatus::default();
        let encoded = toml::to_string(&status).unwrap();
        assert!(encoded.contains("state = \"Disconnected\""));
        assert!(encoded.contains("connected = false"));
    }
}
