//! Leader-ordered commit pipeline: `submit`, `onRequest`, `applyCommit`
//! from spec.md §4.5.

use std::sync::Arc;

use crate::election;
use crate::net::send;
use crate::node::Node;
use crate::record::Record;
use crate::state::Phase;
use crate::types::{MessageId, NodeId};

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// No leader is currently known; an election was kicked off (if one
    /// was not already in flight) and the caller should retry shortly.
    NoLeader,
}

/// Submit a locally originated chat message. If this node is the leader,
/// it commits and broadcasts immediately; otherwise it forwards a
/// `request` to whoever the leader is. With no known leader, the caller
/// gets `SubmitError::NoLeader` and an election is started if one isn't
/// already under way.
pub async fn submit(node: &Arc<Node>, content: String) -> Result<(), SubmitError> {
    let leader = node.state.read().await.leader_id.clone();

    match leader {
        None => {
            log::warn!("{}: submit refused, no leader known", node.id);
            let phase = node.state.read().await.election.phase;
            if phase == Phase::Idle {
                election::start_campaign(node).await;
            }
            Err(SubmitError::NoLeader)
        }
        Some(ref l) if *l == node.id => {
            let id = MessageId::new();
            apply_commit(node, id, node.id.clone(), content.clone()).await;
            send::send_all(
                node,
                Record::Commit { from: node.id.clone(), id, content, original_sender: node.id.clone() },
            )
            .await;
            Ok(())
        }
        Some(leader) => {
            if let Some(peer) = node.peer(&leader).cloned() {
                let id = MessageId::new();
                send::send(node, &peer, &Record::Request { from: node.id.clone(), id, content }).await;
            }
            Ok(())
        }
    }
}

/// Handle an incoming `request`: only the leader acts on it. A follower
/// that receives one (stale view of who's leader) drops it silently.
pub async fn on_request(node: &Arc<Node>, from: NodeId, id: MessageId, content: String) {
    let is_leader = node.state.read().await.leader_id.as_ref() == Some(&node.id);
    if !is_leader {
        log::debug!("{}: dropping request from {}, not leader", node.id, from);
        return;
    }
    apply_commit(node, id, from.clone(), content.clone()).await;
    send::send_all(node, Record::Commit { from: node.id.clone(), id, content, original_sender: from }).await;
}

/// Apply a commit: insert-if-absent against `seen_ids`, append to the
/// durable log, and print it to the shell. Idempotent — a commit already
/// applied (by id) is a no-op.
pub async fn apply_commit(node: &Arc<Node>, id: MessageId, original_sender: NodeId, content: String) {
    let is_new = {
        let mut state = node.state.write().await;
        if state.seen_ids.contains(&id) {
            false
        } else {
            state.seen_ids.insert(id);
            true
        }
    };
    if !is_new {
        return;
    }

    if let Err(e) = node.log.append(id, original_sender.clone(), content.clone()).await {
        log::error!("{}: failed to persist commit {}: {}", node.id, id, e);
    }
    println!("[{original_sender}]: {content}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodeConfig, Tunables};
    use crate::storage::FileLog;
    use crate::types::PeerInfo;

    async fn test_node(id: &str, peers: Vec<PeerInfo>) -> Arc<Node> {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::init(dir.path().join(format!("{id}_chat.jsonl"))).await.unwrap();
        let cfg = NodeConfig { id: NodeId::new(id), host: "127.0.0.1".to_string(), port: 0, peers, tunables: Tunables::default() };
        Arc::new(Node::new(cfg, log))
    }

    #[tokio::test]
    async fn duplicate_commit_id_is_applied_once() {
        let node = test_node("n1", vec![]).await;
        let id = MessageId::new();
        apply_commit(&node, id, NodeId::new("n2"), "hi".to_string()).await;
        apply_commit(&node, id, NodeId::new("n2"), "hi".to_string()).await;
        assert_eq!(node.log.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_without_leader_starts_an_election_and_errors() {
        let node = test_node("n1", vec![PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 }]).await;
        let result = submit(&node, "hello".to_string()).await;
        assert_eq!(result, Err(SubmitError::NoLeader));
        assert_eq!(node.state.read().await.election.phase, Phase::Campaigning);
    }

    #[tokio::test]
    async fn submit_as_leader_commits_immediately() {
        let node = test_node("n1", vec![]).await;
        {
            let mut state = node.state.write().await;
            state.leader_id = Some(node.id.clone());
        }
        submit(&node, "hello".to_string()).await.unwrap();
        let history = node.log.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn non_leader_drops_a_request_it_receives() {
        let node = test_node("n2", vec![]).await;
        on_request(&node, NodeId::new("n1"), MessageId::new(), "hi".to_string()).await;
        assert!(node.log.history().await.unwrap().is_empty());
    }
}
