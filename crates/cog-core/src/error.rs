//! Engine Error Types
//!
//! Failures are contained at the smallest granularity that makes sense:
//! malformed input is rejected at the boundary, a single agent's bad
//! decision skips only that agent, and only integrity and initialization
//! errors propagate to the caller.

use thiserror::Error;

/// Errors surfaced to callers of the engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Out-of-range or inconsistent configuration; fatal at initialization.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot checksum or layout mismatch; fatal for the restore, the
    /// running world is left untouched.
    #[error("snapshot integrity failure: {0}")]
    Integrity(String),

    /// A snapshot handle that does not name a stored snapshot.
    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(String),

    /// Filesystem failure while persisting or loading a snapshot.
    #[error("snapshot io: {0}")]
    SnapshotIo(#[from] std::io::Error),

    /// Serialization failure while encoding or decoding a snapshot.
    #[error("snapshot encoding: {0}")]
    SnapshotEncoding(#[from] serde_json::Error),
}

/// A contained per-agent failure during the decide phase.
///
/// Never propagated to the caller; recorded as a diagnostic event and the
/// agent simply idles for the tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFault {
    pub agent_id: String,
    pub reason: String,
}

impl AgentFault {
    pub fn new(agent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for AgentFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent {} skipped: {}", self.agent_id, self.reason)
    }
}
