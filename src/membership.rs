//! Failure detector: the heartbeat emitter and the liveness scanner of
//! spec.md §4.3.

use std::sync::Arc;
use std::time::Instant;

use crate::election;
use crate::net::send;
use crate::node::Node;
use crate::record::Record;
use crate::state::Phase;
use crate::types::NodeId;

/// Record a heartbeat from `from`. A heartbeat claiming to be from this
/// node itself has no effect — it can only arrive from a stale or
/// misconfigured peer table.
pub async fn on_heartbeat(node: &Arc<Node>, from: NodeId) {
    if from == node.id {
        return;
    }
    let mut state = node.state.write().await;
    state.last_seen.insert(from, Instant::now());
}

/// Long-lived task: broadcast a heartbeat to every peer on a fixed
/// interval.
pub async fn emit_loop(node: Arc<Node>) {
    loop {
        send::send_all(&node, Record::Heartbeat { from: node.id.clone() }).await;
        if node.tick(node.tunables.hb_interval()).await {
            break;
        }
    }
}

/// Long-lived task: on the same cadence as the emitter, check whether the
/// current leader has gone quiet for longer than the timeout and, if so,
/// declare it failed and kick off a new election.
pub async fn scan_loop(node: Arc<Node>) {
    loop {
        let stale_leader = {
            let state = node.state.read().await;
            match &state.leader_id {
                Some(leader) if *leader != node.id => match state.last_seen.get(leader) {
                    Some(seen) => seen.elapsed() > node.tunables.hb_timeout(),
                    None => false,
                },
                _ => false,
            }
        };

        if stale_leader {
            log::warn!("{}: leader heartbeat timed out, declaring it failed", node.id);
            let phase = {
                let mut state = node.state.write().await;
                state.leader_id = None;
                state.election.phase
            };
            if phase == Phase::Idle {
                election::start_campaign(&node).await;
            }
        }

        if node.tick(node.tunables.hb_interval()).await {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodeConfig, Tunables};
    use crate::storage::FileLog;

    async fn test_node(id: &str) -> Arc<Node> {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::init(dir.path().join(format!("{id}_chat.jsonl"))).await.unwrap();
        let cfg = NodeConfig {
            id: NodeId::new(id),
            host: "127.0.0.1".to_string(),
            port: 0,
            peers: vec![],
            tunables: Tunables::default(),
        };
        Arc::new(Node::new(cfg, log))
    }

    #[tokio::test]
    async fn self_heartbeat_has_no_effect() {
        let node = test_node("n1").await;
        on_heartbeat(&node, NodeId::new("n1")).await;
        assert!(node.state.read().await.last_seen.is_empty());
    }

    #[tokio::test]
    async fn peer_heartbeat_updates_last_seen() {
        let node = test_node("n1").await;
        on_heartbeat(&node, NodeId::new("n2")).await;
        assert!(node.state.read().await.last_seen.contains_key(&NodeId::new("n2")));
    }
}
