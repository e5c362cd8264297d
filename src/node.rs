//! The `Node` handle: immutable identity and peer table, plus the shared
//! lock-protected state every task clones an `Arc` to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, RwLock};

use crate::config::{NodeConfig, Tunables};
use crate::state::SharedState;
use crate::storage::FileLog;
use crate::types::{NodeId, PeerInfo};

/// Cooperative shutdown signal shared by every long-lived task. Checking
/// `is_set()` before work and racing `wait()` against a task's own sleep
/// is how each loop notices a shutdown without polling.
#[derive(Default)]
pub struct Shutdown {
    flag: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        if self.is_set() {
            return;
        }
        self.notify.notified().await;
    }
}

pub struct Node {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
    pub peers: Vec<PeerInfo>,
    pub tunables: Tunables,
    pub state: RwLock<SharedState>,
    pub log: FileLog,
    pub shutdown: Shutdown,
    /// Wakes the election coordinator as soon as an `ok`/`leader`/`election`
    /// record changes its state, instead of it polling on a fixed tick.
    pub election_notify: Notify,
}

impl Node {
    pub fn new(cfg: NodeConfig, log: FileLog) -> Self {
        Self {
            id: cfg.id,
            host: cfg.host,
            port: cfg.port,
            peers: cfg.peers,
            tunables: cfg.tunables,
            state: RwLock::new(SharedState::default()),
            log,
            shutdown: Shutdown::default(),
            election_notify: Notify::new(),
        }
    }

    pub fn peer(&self, id: &NodeId) -> Option<&PeerInfo> {
        self.peers.iter().find(|p| &p.id == id)
    }

    /// The highest node id known to exist, across self and all peers.
    pub fn highest_known_id(&self) -> &NodeId {
        self.peers
            .iter()
            .map(|p| &p.id)
            .chain(std::iter::once(&self.id))
            .max()
            .expect("a node always knows at least itself")
    }

    /// Sleep for `dur`, or return early if shutdown is triggered first.
    /// Returns `true` if shutdown fired and the caller's loop should exit.
    pub async fn tick(&self, dur: Duration) -> bool {
        if self.shutdown.is_set() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(dur) => false,
            _ = self.shutdown.wait() => true,
        }
    }
}
