//! Worker threads sharing one event channel.

use crossfire::{MRx, TryRecvError, detect_backoff_cfg, mpmc};
use mazebots_core::{MazeBotsConfig, WallSegment};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::SearchError;
use crate::event::SearchEvent;
use crate::worker::{Worker, WorkerReport};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Events drained and reports collected while shutting a search down.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub events: Vec<SearchEvent>,
    pub reports: Vec<WorkerReport>,
}

/// Seed for worker `index`: derived from `base` when reproducible runs are
/// requested, otherwise drawn from the OS.
#[must_use]
pub fn worker_seed(base: Option<u64>, index: usize) -> u64 {
    match base {
        Some(seed) => seed.wrapping_add(index as u64),
        None => rand::random(),
    }
}

/// Start `config.workers` independent workers, each with its own copy of `segments`.
pub fn spawn(config: &MazeBotsConfig, segments: &[WallSegment]) -> Result<SearchHandle, SearchError> {
    config.validate()?;
    detect_backoff_cfg();
    let (tx, rx) = mpmc::bounded_blocking::<SearchEvent>(config.event_capacity);
    let stop = Arc::new(AtomicBool::new(false));
    let mut handle = SearchHandle {
        stop: Arc::clone(&stop),
        events: rx,
        workers: Vec::with_capacity(config.workers),
    };

    for index in 0..config.workers {
        let worker = Worker::new(index, config, segments, worker_seed(config.rng_seed, index))?;
        let tx = tx.clone();
        let stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("mazebots-worker-{index}"))
            .spawn(move || worker.run(&stop, &mut |event| tx.send(event).is_ok()))
            .map_err(|source| SearchError::Spawn {
                worker: index,
                source,
            })?;
        handle.workers.push(thread);
    }

    info!(
        workers = config.workers,
        segments = segments.len(),
        seed = ?config.rng_seed,
        "search started"
    );
    Ok(handle)
}

/// Owner of a running search. Dropping it stops and joins every worker.
pub struct SearchHandle {
    stop: Arc<AtomicBool>,
    events: MRx<SearchEvent>,
    workers: Vec<JoinHandle<WorkerReport>>,
}

impl std::fmt::Debug for SearchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHandle")
            .field("workers", &self.workers.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl SearchHandle {
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Ask every worker to stop after its current iteration. Does not wait.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Next pending event, if any.
    #[must_use]
    pub fn try_next(&self) -> Option<SearchEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Every event currently queued.
    #[must_use]
    pub fn drain(&self) -> Vec<SearchEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Stop the workers and wait for them.
    ///
    /// The channel keeps being drained while waiting so no worker stays blocked
    /// on a full queue.
    pub fn shutdown(mut self) -> SearchOutcome {
        self.finish()
    }

    fn finish(&mut self) -> SearchOutcome {
        self.stop();
        let mut outcome = SearchOutcome::default();
        while self.workers.iter().any(|worker| !worker.is_finished()) {
            outcome.events.extend(self.drain());
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        for worker in self.workers.drain(..) {
            match worker.join() {
                Ok(report) => outcome.reports.push(report),
                Err(_) => warn!("search worker panicked"),
            }
        }
        outcome.events.extend(self.drain());
        outcome
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.finish();
        }
    }
}
