//! The shutdown watcher: listens for `SIGINT`/`SIGTERM` (or, off Unix,
//! just `Ctrl+C`) and converges on the same `Shutdown` flag the shell's
//! `/exit` command triggers.

use std::sync::Arc;

use crate::node::Node;

pub async fn watch(node: Arc<Node>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{}: failed to install SIGTERM handler: {}", node.id, e);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
            _ = node.shutdown.wait() => return,
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = node.shutdown.wait() => return,
        }
    }

    log::info!("{}: received shutdown signal", node.id);
    node.shutdown.trigger();
}
