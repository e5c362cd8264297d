//! The Bully election coordinator: the five-state table of spec.md §4.4,
//! driven both by incoming records (handled inline, under the shared
//! lock) and by deadline timeouts (handled by `election_loop`, which waits
//! on whichever is sooner: the current deadline or a wakeup from
//! `election_notify`).

use std::sync::Arc;
use std::time::Instant;

use crate::net::send;
use crate::node::Node;
use crate::record::Record;
use crate::state::Phase;
use crate::types::NodeId;

/// Decide this node's starting phase: a node that already knows it is the
/// highest id in the network goes straight to `Leader`; everyone else
/// starts a campaign.
pub async fn initialize(node: &Arc<Node>) {
    if node.highest_known_id() == &node.id {
        become_leader(node).await;
    } else {
        start_campaign(node).await;
    }
}

/// Enter `Campaigning`: challenge every peer with a higher id and arm the
/// election deadline.
pub async fn start_campaign(node: &Arc<Node>) {
    let higher: Vec<_> = node.peers.iter().filter(|p| p.id > node.id).cloned().collect();

    {
        let mut state = node.state.write().await;
        state.election.phase = Phase::Campaigning;
        state.election.deadline = Some(Instant::now() + node.tunables.election_wait());
    }

    log::info!("{}: starting election, challenging {} higher peer(s)", node.id, higher.len());
    for peer in &higher {
        send::send(node, peer, &Record::Election { from: node.id.clone() }).await;
    }
    node.election_notify.notify_waiters();
}

async fn become_leader(node: &Arc<Node>) {
    {
        let mut state = node.state.write().await;
        state.election.phase = Phase::Leader;
        state.election.deadline = None;
        state.leader_id = Some(node.id.clone());
    }
    log::info!("{}: elected leader", node.id);
    send::send_all(node, Record::Leader { from: node.id.clone() }).await;
    node.election_notify.notify_waiters();
}

/// Handle an incoming `election` record from `from`: always reply `ok`,
/// then apply the state's own transition rule.
pub async fn on_election(node: &Arc<Node>, from: NodeId) {
    if let Some(peer) = node.peer(&from).cloned() {
        send::send(node, &peer, &Record::Ok { from: node.id.clone() }).await;
    }

    let phase = node.state.read().await.election.phase;
    match phase {
        Phase::Idle => {
            if from < node.id {
                start_campaign(node).await;
            }
        }
        Phase::Leader => {
            if from > node.id {
                {
                    let mut state = node.state.write().await;
                    state.leader_id = None;
                }
                start_campaign(node).await;
            }
        }
        Phase::Campaigning | Phase::Yielding => {}
    }
}

/// Handle an incoming `ok` record: only `Campaigning` reacts, yielding to
/// whichever higher peer just answered.
pub async fn on_ok(node: &Arc<Node>, _from: NodeId) {
    let should_yield = node.state.read().await.election.phase == Phase::Campaigning;
    if should_yield {
        let mut state = node.state.write().await;
        if state.election.phase == Phase::Campaigning {
            state.election.phase = Phase::Yielding;
            state.election.deadline = Some(Instant::now() + node.tunables.election_wait());
        }
        drop(state);
        node.election_notify.notify_waiters();
    }
}

/// Handle an incoming `leader` record from `from`.
pub async fn on_leader(node: &Arc<Node>, from: NodeId) {
    let phase = node.state.read().await.election.phase;
    let mut accepted = false;

    match phase {
        Phase::Idle => {
            let mut state = node.state.write().await;
            state.leader_id = Some(from.clone());
            accepted = true;
        }
        Phase::Campaigning | Phase::Yielding => {
            let mut state = node.state.write().await;
            state.leader_id = Some(from.clone());
            state.election.phase = Phase::Idle;
            state.election.deadline = None;
            accepted = true;
        }
        Phase::Leader => {
            if from > node.id {
                let mut state = node.state.write().await;
                state.leader_id = Some(from.clone());
                state.election.phase = Phase::Idle;
                state.election.deadline = None;
                accepted = true;
            }
        }
    }

    if accepted {
        log::info!("{}: accepted {} as leader", node.id, from);
        node.election_notify.notify_waiters();
    }
}

/// Long-lived task: wakes on whichever comes first, the current election
/// deadline or a notify from an incoming record, and advances the state
/// machine's timeout transitions.
pub async fn election_loop(node: Arc<Node>) {
    loop {
        if node.shutdown.is_set() {
            break;
        }

        let deadline = {
            let state = node.state.read().await;
            match state.election.phase {
                Phase::Campaigning | Phase::Yielding => state.election.deadline,
                _ => None,
            }
        };

        match deadline {
            Some(when) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(when.into()) => handle_timeout(&node).await,
                    _ = node.election_notify.notified() => {}
                    _ = node.shutdown.wait() => break,
                }
            }
            None => {
                tokio::select! {
                    _ = node.election_notify.notified() => {}
                    _ = node.shutdown.wait() => break,
                }
            }
        }
    }
}

async fn handle_timeout(node: &Arc<Node>) {
    let phase = {
        let state = node.state.read().await;
        let expired = state.election.deadline.map(|d| Instant::now() >= d).unwrap_or(false);
        if expired {
            Some(state.election.phase)
        } else {
            None
        }
    };

    match phase {
        Some(Phase::Campaigning) => become_leader(node).await,
        Some(Phase::Yielding) => start_campaign(node).await,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tunables;
    use crate::storage::FileLog;
    use crate::types::PeerInfo;

    async fn test_node(id: &str, peers: Vec<PeerInfo>) -> Arc<Node> {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::init(dir.path().join(format!("{id}_chat.jsonl"))).await.unwrap();
        let cfg = crate::config::NodeConfig {
            id: NodeId::new(id),
            host: "127.0.0.1".to_string(),
            port: 0,
            peers,
            tunables: Tunables { election_wait_secs: 1, ..Tunables::default() },
        };
        Arc::new(Node::new(cfg, log))
    }

    #[tokio::test]
    async fn highest_id_goes_straight_to_leader() {
        let node = test_node("n3", vec![
            PeerInfo { id: NodeId::new("n1"), host: "localhost".into(), port: 5000 },
            PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 },
        ])
        .await;
        initialize(&node).await;
        let state = node.state.read().await;
        assert_eq!(state.election.phase, Phase::Leader);
        assert_eq!(state.leader_id.as_ref(), Some(&node.id));
    }

    #[tokio::test]
    async fn non_max_id_starts_campaigning() {
        let node = test_node("n1", vec![
            PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 },
            PeerInfo { id: NodeId::new("n3"), host: "localhost".into(), port: 5002 },
        ])
        .await;
        initialize(&node).await;
        let state = node.state.read().await;
        assert_eq!(state.election.phase, Phase::Campaigning);
    }

    #[tokio::test]
    async fn ok_from_campaigning_transitions_to_yielding() {
        let node = test_node("n1", vec![PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 }]).await;
        start_campaign(&node).await;
        on_ok(&node, NodeId::new("n2")).await;
        assert_eq!(node.state.read().await.election.phase, Phase::Yielding);
    }

    #[tokio::test]
    async fn leader_record_is_accepted_while_campaigning() {
        let node = test_node("n1", vec![PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 }]).await;
        start_campaign(&node).await;
        on_leader(&node, NodeId::new("n2")).await;
        let state = node.state.read().await;
        assert_eq!(state.election.phase, Phase::Idle);
        assert_eq!(state.leader_id, Some(NodeId::new("n2")));
    }

    #[tokio::test]
    async fn leader_steps_down_to_a_higher_election() {
        let node = test_node("n1", vec![PeerInfo { id: NodeId::new("n2"), host: "localhost".into(), port: 5001 }]).await;
        initialize(&node).await; // n1 alone vs n2 -> n2 is higher, n1 campaigns
        // force n1 into Leader directly to exercise the step-down rule
        {
            let mut state = node.state.write().await;
            state.election.phase = Phase::Leader;
            state.leader_id = Some(node.id.clone());
        }
        on_election(&node, NodeId::new("n2")).await;
        let state = node.state.read().await;
        assert_eq!(state.election.phase, Phase::Campaigning);
        assert_eq!(state.leader_id, None);
    }

    #[tokio::test]
    async fn leader_ignores_election_from_a_lower_id() {
        let node = test_node("n2", vec![PeerInfo { id: NodeId::new("n1"), host: "localhost".into(), port: 5000 }]).await;
        {
            let mut state = node.state.write().await;
            state.election.phase = Phase::Leader;
            state.leader_id = Some(node.id.clone());
        }
        on_election(&node, NodeId::new("n1")).await;
        let state = node.state.read().await;
        assert_eq!(state.election.phase, Phase::Leader);
        assert_eq!(state.leader_id, Some(node.id.clone()));
    }
}
