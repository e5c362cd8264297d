//! Node configuration: the static peer table and the tunable timings,
//! loadable from a TOML file or falling back to the compiled-in three-node
//! mesh used throughout the end-to-end scenarios.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::NodeError;
use crate::types::{NodeId, PeerInfo};

fn default_hb_interval_secs() -> u64 {
    3
}
fn default_hb_timeout_secs() -> u64 {
    8
}
fn default_election_wait_secs() -> u64 {
    3
}
fn default_connect_timeout_secs() -> u64 {
    2
}

/// The recommended tunables from spec.md §6, each independently
/// overridable from a config file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Tunables {
    #[serde(default = "default_hb_interval_secs")]
    pub hb_interval_secs: u64,
    #[serde(default = "default_hb_timeout_secs")]
    pub hb_timeout_secs: u64,
    #[serde(default = "default_election_wait_secs")]
    pub election_wait_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            hb_interval_secs: default_hb_interval_secs(),
            hb_timeout_secs: default_hb_timeout_secs(),
            election_wait_secs: default_election_wait_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Tunables {
    pub fn hb_interval(&self) -> Duration {
        Duration::from_secs(self.hb_interval_secs)
    }
    pub fn hb_timeout(&self) -> Duration {
        Duration::from_secs(self.hb_timeout_secs)
    }
    pub fn election_wait(&self) -> Duration {
        Duration::from_secs(self.election_wait_secs)
    }
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
struct PeerEntry {
    id: String,
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    node_id: String,
    #[serde(default = "default_host")]
    host: String,
    port: u16,
    #[serde(default)]
    peers: Vec<PeerEntry>,
    #[serde(default)]
    tunables: Tunables,
}

fn default_host() -> String {
    "localhost".to_string()
}

/// A fully resolved node configuration: this node's own identity and bind
/// address, the peers it can reach, and the tunables governing its timers.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
    pub peers: Vec<PeerInfo>,
    pub tunables: Tunables,
}

/// The full-mesh network map compiled into the binary: the three standard
/// node ids used throughout the documented end-to-end scenarios.
fn default_network_map() -> [(&'static str, &'static str, u16); 3] {
    [
        ("n1", "localhost", 5000),
        ("n2", "localhost", 5001),
        ("n3", "localhost", 5002),
    ]
}

/// Load a node's configuration from a TOML file. `node_id_override`, when
/// given, takes precedence over the file's `node_id` (so `--config` and a
/// positional node id can be combined on the same invocation).
pub fn load_from_file(path: &Path, node_id_override: Option<String>) -> Result<NodeConfig, NodeError> {
    let text = std::fs::read_to_string(path).map_err(NodeError::Storage)?;
    let mut parsed: FileConfig = toml::from_str(&text).map_err(|e| NodeError::Config(e.to_string()))?;
    if let Some(id) = node_id_override {
        parsed.node_id = id;
    }
    let id = NodeId::new(parsed.node_id);
    let peers = parsed
        .peers
        .into_iter()
        .filter(|p| p.id != id.as_str())
        .map(|p| PeerInfo { id: NodeId::new(p.id), host: p.host, port: p.port })
        .collect();
    Ok(NodeConfig { id, host: parsed.host, port: parsed.port, peers, tunables: parsed.tunables })
}

/// Build a node's configuration from the compiled-in three-node mesh,
/// given only the node id and the port to bind — the `run <nodeId> <port>`
/// shorthand from spec.md §6.
pub fn load_default(node_id: String, port: u16) -> Result<NodeConfig, NodeError> {
    let map = default_network_map();
    if !map.iter().any(|(id, _, _)| *id == node_id) {
        return Err(NodeError::Config(format!(
            "unknown node id '{node_id}': the compiled-in network map only knows n1/n2/n3; pass --config for other ids"
        )));
    }
    let id = NodeId::new(node_id);
    let peers = map
        .into_iter()
        .filter(|(pid, _, _)| *pid != id.as_str())
        .map(|(pid, host, pport)| PeerInfo { id: NodeId::new(pid), host: host.to_string(), port: pport })
        .collect();
    Ok(NodeConfig { id, host: "localhost".to_string(), port, peers, tunables: Tunables::default() })
}
