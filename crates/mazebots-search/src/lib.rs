//! Parallel archive search over MazeBots scripts.
//!
//! Each worker owns a private maze and archive and runs the mutate, evaluate
//! and insert loop on its own thread. Workers share nothing but the stop flag
//! and the event channel.

use mazebots_core::ConfigError;
use thiserror::Error;

pub mod coordinator;
pub mod event;
pub mod worker;

pub use coordinator::{SearchHandle, SearchOutcome, spawn, worker_seed};
pub use event::{SearchEvent, SearchEventKind};
pub use worker::{AttemptOutcome, Worker, WorkerReport};

/// Errors raised while starting a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
}
