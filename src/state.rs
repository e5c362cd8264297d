//! `SharedState`: the single lock-protected struct holding everything the
//! failure detector and the election coordinator read and mutate.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::types::{MessageId, NodeId};

/// The five states of the Bully table in spec.md §4.4. `Idle` is the
/// resting state for a follower that believes it has a leader (or simply
/// has not yet been told otherwise).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Campaigning,
    Yielding,
    Leader,
}

#[derive(Debug, Default)]
pub struct ElectionState {
    pub phase: Phase,
    /// Deadline for the current `Campaigning`/`Yielding` window. `None`
    /// outside those two phases.
    pub deadline: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct SharedState {
    /// Last time a heartbeat was received from each peer.
    pub last_seen: HashMap<NodeId, Instant>,
    /// Message ids already applied to the log, for commit de-duplication.
    pub seen_ids: HashSet<MessageId>,
    pub leader_id: Option<NodeId>,
    pub election: ElectionState,
}
