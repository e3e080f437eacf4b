//! Topic to pin bindings
//!
//! A [`BindingTable`] is the ordered set of bindings the daemon serves. It is
//! never edited in place: a reload builds a fresh table and swaps it in whole.

pub mod value;

pub use value::{
    is_boolean_literal, level_str, parse_boolean, to_pin_value, InvalidBooleanLiteral,
};

use serde::Serialize;
use std::fmt;
use tracing::info;

/// Association between an MQTT topic and a GPIO output pin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    topic: String,
    pin: String,
    invert: bool,
}

impl Binding {
    /// Create a binding. Callers validate that the topic is non-empty
    /// (see [`crate::config`]); an empty topic would never match a message.
    pub fn new(topic: impl Into<String>, pin: impl Into<String>, invert: bool) -> Self {
        Self {
            topic: topic.into(),
            pin: pin.into(),
            invert,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn invert(&self) -> bool {
        self.invert
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invert {
            write!(
                f,
                "Topic '{}' -> invert value -> GPIO Pin '{}'",
                self.topic, self.pin
            )
        } else {
            write!(f, "Topic '{}' -> GPIO Pin '{}'", self.topic, self.pin)
        }
    }
}

/// Ordered collection of bindings; first match wins on lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Find the first binding whose topic equals `topic` exactly
    pub fn lookup(&self, topic: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.topic == topic)
    }

    /// Swap in a new set of bindings, returning the previous ones
    pub fn replace(&mut self, bindings: Vec<Binding>) -> Vec<Binding> {
        std::mem::replace(&mut self.bindings, bindings)
    }

    /// Distinct topics in table order
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            if !topics.contains(&binding.topic.as_str()) {
                topics.push(&binding.topic);
            }
        }
        topics
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Log every binding at info level
    pub fn log_bindings(&self) {
        info!(count = self.bindings.len(), "Initialize Bindings:");
        for binding in &self.bindings {
            info!("{}", binding);
        }
    }
}

impl From<Vec<Binding>> for BindingTable {
    fn from(bindings: Vec<Binding>) -> Self {
        Self::new(bindings)
    }
}
