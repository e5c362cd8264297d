//! Best-effort, fire-and-forget outbound sends. A send opens a fresh
//! connection, writes one record, and closes it — it never waits for or
//! reads a reply on that connection.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::node::Node;
use crate::record::Record;
use crate::types::PeerInfo;

/// Send `record` to a single peer. Connect failures, timeouts, and write
/// errors are logged at `debug` and otherwise ignored — the failure
/// detector, not the sender, is responsible for noticing a dead peer.
pub async fn send(node: &Node, peer: &PeerInfo, record: &Record) {
    let line = match record.encode() {
        Ok(l) => l,
        Err(e) => {
            log::error!("{}: failed to encode record for {}: {}", node.id, peer.id, e);
            return;
        }
    };

    let addr = peer.addr();
    let connected = timeout(node.tunables.connect_timeout(), TcpStream::connect(&addr)).await;
    let mut stream = match connected {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            log::debug!("{}: connect to {} ({}) failed: {}", node.id, peer.id, addr, e);
            return;
        }
        Err(_) => {
            log::debug!("{}: connect to {} ({}) timed out", node.id, peer.id, addr);
            return;
        }
    };

    if let Err(e) = stream.write_all(line.as_bytes()).await {
        log::debug!("{}: send to {} ({}) failed: {}", node.id, peer.id, addr, e);
        return;
    }
    let _ = stream.shutdown().await;
}

/// Fan `record` out to every peer concurrently. Each send runs as its own
/// task so a slow or unreachable peer never blocks delivery to the rest.
pub async fn send_all(node: &Arc<Node>, record: Record) {
    for peer in node.peers.clone() {
        let node = node.clone();
        let record = record.clone();
        tokio::spawn(async move {
            send(&node, &peer, &record).await;
        });
    }
}
