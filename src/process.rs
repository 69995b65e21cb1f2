//! Process identity: the flow type descriptor and the process key.
//!
//! A process is the shared mutable entity whose state transitions are
//! serialized. It is identified by the label of its flow type plus a key
//! that is either an integer primary key or a string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor of a flow type (the "process type").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowType {
    label: String,
}

impl FlowType {
    /// Create a flow type descriptor from its label (e.g. `helpdesk/ticket`).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// The flow label used in diagnostics and lock keys.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Key of a single process within its flow type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessKey {
    Int(i64),
    Str(String),
}

impl ProcessKey {
    /// Parse a key from user input: integers become `Int`, anything else `Str`.
    pub fn parse(input: &str) -> Self {
        match input.parse::<i64>() {
            Ok(value) => ProcessKey::Int(value),
            Err(_) => ProcessKey::Str(input.to_string()),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessKey::Int(value) => write!(f, "{}", value),
            ProcessKey::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ProcessKey {
    fn from(value: i64) -> Self {
        ProcessKey::Int(value)
    }
}

impl From<i32> for ProcessKey {
    fn from(value: i32) -> Self {
        ProcessKey::Int(value.into())
    }
}

impl From<u32> for ProcessKey {
    fn from(value: u32) -> Self {
        ProcessKey::Int(value.into())
    }
}

impl From<&str> for ProcessKey {
    fn from(value: &str) -> Self {
        ProcessKey::Str(value.to_string())
    }
}

impl From<String> for ProcessKey {
    fn from(value: String) -> Self {
        ProcessKey::Str(value)
    }
}

/// Build the cache key guarding one process: `{prefix}-{flow}/{key}`.
pub fn lock_key(prefix: &str, flow: &FlowType, key: &ProcessKey) -> String {
    format!("{}-{}/{}", prefix, flow.label(), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_combines_prefix_flow_and_key() {
        let flow = FlowType::new("helpdesk");
        assert_eq!(lock_key("lock", &flow, &ProcessKey::Int(42)), "lock-helpdesk/42");
        assert_eq!(
            lock_key("lock", &flow, &ProcessKey::from("ticket-7")),
            "lock-helpdesk/ticket-7"
        );
    }

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(ProcessKey::parse("17"), ProcessKey::Int(17));
        assert_eq!(ProcessKey::parse("-3"), ProcessKey::Int(-3));
        assert_eq!(ProcessKey::parse("a17"), ProcessKey::Str("a17".to_string()));
    }

    #[test]
    fn keys_serialize_untagged() {
        assert_eq!(serde_json::to_string(&ProcessKey::Int(5)).unwrap(), "5");
        assert_eq!(
            serde_json::to_string(&ProcessKey::from("x")).unwrap(),
            "\"x\""
        );
        let key: ProcessKey = serde_json::from_str("12").unwrap();
        assert_eq!(key, ProcessKey::Int(12));
    }

    #[test]
    fn flow_type_displays_label() {
        let flow = FlowType::new("shipment/delivery");
        assert_eq!(flow.to_string(), "shipment/delivery");
        assert_eq!(flow.label(), "shipment/delivery");
    }
}
