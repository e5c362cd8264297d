//! Core identity types shared across the node runtime.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node's identifier. Comparison is lexicographic, per spec: the Bully
/// algorithm and the highest-id-wins rule both operate directly on `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// A message identifier: a 128-bit UUID generated by the originating
/// sender at submit time, rendered in its canonical textual form on the
/// wire and in the durable log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the static peer table: a node's id plus the address the
/// listener for that node binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

impl PeerInfo {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_ordering_is_lexicographic() {
        assert!(NodeId::new("n1") < NodeId::new("n2"));
        assert!(NodeId::new("n10") < NodeId::new("n2")); // lexicographic, not numeric
    }

    #[test]
    fn message_id_round_trips_through_json() {
        let id = MessageId::new();
        let encoded = serde_json::to_string(&id).unwrap();
        let decoded: MessageId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn peer_addr_formats_host_and_port() {
        let p = PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 };
        assert_eq!(p.addr(), "localhost:5001");
    }
}
