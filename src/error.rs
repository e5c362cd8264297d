//! Error types for the node runtime.

use thiserror::Error;

/// Errors surfaced by configuration, storage, and the wire codec.
///
/// Only [`NodeError::Bind`] and [`NodeError::Config`] are fatal: they occur
/// during startup and propagate out of `main` as a non-zero exit.
/// [`NodeError::Storage`] and [`NodeError::Codec`] occur on the hot path
/// (listener dispatch, log append) and are logged and swallowed there —
/// no error path is allowed to terminate the listener, heartbeat emitter,
/// or election coordinator.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[source] std::io::Error),

    #[error("record codec error: {0}")]
    Codec(#[source] serde_json::Error),
}

impl From<std::io::Error> for NodeError {
    fn from(e: std::io::Error) -> Self {
        NodeError::Storage(e)
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::Codec(e)
    }
}
