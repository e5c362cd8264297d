//! Accept loop: one task per inbound connection, reading exactly one
//! record and dispatching it. The listener never writes a response on the
//! same connection — replies (`ok`, `leader`, `commit`) always go out as
//! fresh outbound sends.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use crate::node::Node;
use crate::record::Record;
use crate::{commit, election, membership};

/// Connections are capped at this many bytes before being abandoned, so a
/// misbehaving peer can't exhaust memory by never sending a newline.
const MAX_RECORD_BYTES: usize = 64 * 1024;

pub async fn run(node: Arc<Node>, listener: TcpListener) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let node = node.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(&node, stream).await {
                                log::debug!("{}: connection from {} dropped: {}", node.id, peer_addr, e);
                            }
                        });
                    }
                    Err(e) => log::warn!("{}: accept error: {}", node.id, e),
                }
            }
            _ = node.shutdown.wait() => break,
        }
    }
}

async fn handle_connection(node: &Arc<Node>, mut stream: TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(256);
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_RECORD_BYTES {
            log::debug!("{}: dropping oversized connection ({} bytes)", node.id, buf.len());
            return Ok(());
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    match Record::decode(trimmed) {
        Ok(record) => dispatch(node, record).await,
        Err(e) => log::debug!("{}: dropping malformed record: {}", node.id, e),
    }
    Ok(())
}

async fn dispatch(node: &Arc<Node>, record: Record) {
    match record {
        Record::Heartbeat { from } => membership::on_heartbeat(node, from).await,
        Record::Election { from } => election::on_election(node, from).await,
        Record::Ok { from } => election::on_ok(node, from).await,
        Record::Leader { from } => election::on_leader(node, from).await,
        Record::Request { from, id, content } => commit::on_request(node, from, id, content).await,
        Record::Commit { from: _, id, content, original_sender } => {
            commit::apply_commit(node, id, original_sender, content).await
        }
    }
}
