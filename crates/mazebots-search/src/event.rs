//! Messages emitted by search workers.

use mazebots_core::Score;
use serde::{Deserialize, Serialize};

/// Event tagged with the worker that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchEvent {
    pub worker: usize,
    #[serde(flatten)]
    pub kind: SearchEventKind,
}

/// Payload of a [`SearchEvent`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEventKind {
    /// `delta` more attempts were made since the previous progress event.
    Progress { delta: u64 },
    /// The worker's running best score was exceeded.
    Best {
        score: Score,
        script: Vec<i64>,
        generation: u32,
    },
    /// No new best for too long; the worker's archive was reset.
    StagnationReset,
}
