//! Single-threaded mutate, evaluate and archive loop.

use mazebots_core::{Archive, Evaluator, Maze, MazeBotsConfig, Mutator, Score, WallSegment};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace};

use crate::SearchError;
use crate::event::{SearchEvent, SearchEventKind};

/// What one call to [`Worker::attempt`] did with its candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptOutcome {
    /// Empty script or an identity already in the archive.
    Rejected,
    /// Evaluated and offered to the archive without beating the running best.
    Archived { score: Score },
    /// Evaluated and beat the running best.
    Improved { score: Score },
}

/// Totals reported by a worker once it stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerReport {
    pub worker: usize,
    /// Attempts across all archive resets.
    pub attempts: u64,
    /// Candidates that passed the empty/duplicate filter.
    pub evaluated: u64,
    pub resets: u64,
    /// Running best at the time the worker stopped.
    pub best_score: Score,
}

/// Search state owned by one worker: a private maze and archive.
#[derive(Debug)]
pub struct Worker {
    index: usize,
    maze: Maze,
    archive: Archive,
    evaluator: Evaluator,
    mutator: Mutator,
    rng: SmallRng,
    progress_interval: u64,
    stagnation_threshold: u64,
    attempts: u64,
    last_best: u64,
    best_score: Score,
    total_attempts: u64,
    evaluated: u64,
    resets: u64,
}

impl Worker {
    /// Build worker `index` with its own copy of the wall layout.
    pub fn new(
        index: usize,
        config: &MazeBotsConfig,
        segments: &[WallSegment],
        seed: u64,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            index,
            maze: Maze::from_config(config, segments)?,
            archive: Archive::from_config(config),
            evaluator: Evaluator::from_config(config),
            mutator: Mutator::from_config(config),
            rng: SmallRng::seed_from_u64(seed),
            progress_interval: config.progress_interval,
            stagnation_threshold: config.stagnation_threshold,
            attempts: 0,
            last_best: 0,
            best_score: Score::NEG_INFINITY,
            total_attempts: 0,
            evaluated: 0,
            resets: 0,
        })
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    #[must_use]
    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// Best score seen since the last reset.
    #[must_use]
    pub const fn best_score(&self) -> Score {
        self.best_score
    }

    #[must_use]
    pub fn report(&self) -> WorkerReport {
        WorkerReport {
            worker: self.index,
            attempts: self.total_attempts,
            evaluated: self.evaluated,
            resets: self.resets,
            best_score: self.best_score,
        }
    }

    /// Run one iteration of the search loop, passing any events to `emit`.
    pub fn attempt(&mut self, emit: &mut dyn FnMut(SearchEventKind)) -> AttemptOutcome {
        let outcome = self.try_candidate(emit);
        if let AttemptOutcome::Improved { .. } = outcome {
            self.last_best = self.attempts;
        }
        self.attempts += 1;
        self.total_attempts += 1;

        if self.attempts.is_multiple_of(self.progress_interval) {
            emit(SearchEventKind::Progress {
                delta: self.progress_interval,
            });
        }

        if self.attempts - self.last_best > self.stagnation_threshold {
            info!(
                worker = self.index,
                attempts = self.attempts,
                best = self.best_score,
                "no progress; resetting archive"
            );
            self.archive.reset();
            self.best_score = Score::NEG_INFINITY;
            self.attempts = 0;
            self.last_best = 0;
            self.resets += 1;
            emit(SearchEventKind::StagnationReset);
        }
        outcome
    }

    fn try_candidate(&mut self, emit: &mut dyn FnMut(SearchEventKind)) -> AttemptOutcome {
        let Some(parent) = self.archive.choose(&mut self.rng) else {
            self.archive.reset();
            return AttemptOutcome::Rejected;
        };
        let mut child = self.mutator.mutate(parent, &mut self.rng);
        if child.script().is_empty() || self.archive.contains(&child.identity()) {
            return AttemptOutcome::Rejected;
        }

        let score = self.evaluator.evaluate(&mut self.maze, &mut child);
        self.evaluated += 1;
        let generation = child.generation();
        let improved = score > self.best_score;
        let codes = improved.then(|| child.script().codes());
        let rank = self.archive.insert(child);
        trace!(worker = self.index, score, ?rank, "candidate archived");

        let Some(script) = codes else {
            return AttemptOutcome::Archived { score };
        };
        self.best_score = score;
        debug!(
            worker = self.index,
            score,
            generation = generation.0,
            len = script.len(),
            "new best"
        );
        emit(SearchEventKind::Best {
            score,
            script,
            generation: generation.0,
        });
        AttemptOutcome::Improved { score }
    }

    /// Loop until `stop` is raised or `send` reports the receiver is gone.
    pub fn run(
        mut self,
        stop: &AtomicBool,
        send: &mut dyn FnMut(SearchEvent) -> bool,
    ) -> WorkerReport {
        info!(worker = self.index, "worker started");
        let index = self.index;
        let mut connected = true;
        while connected && !stop.load(Ordering::Relaxed) {
            self.attempt(&mut |kind| {
                if connected && !send(SearchEvent { worker: index, kind }) {
                    connected = false;
                }
            });
        }
        let report = self.report();
        info!(
            worker = index,
            attempts = report.attempts,
            evaluated = report.evaluated,
            resets = report.resets,
            best = report.best_score,
            "worker stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MazeBotsConfig {
        MazeBotsConfig {
            grid_width: 16,
            grid_height: 10,
            archive_capacity: 50,
            patience: 60,
            progress_interval: 10,
            ..MazeBotsConfig::default()
        }
    }

    fn collect(worker: &mut Worker, attempts: usize) -> Vec<SearchEventKind> {
        let mut events = Vec::new();
        for _ in 0..attempts {
            worker.attempt(&mut |kind| events.push(kind));
        }
        events
    }

    #[test]
    fn progress_is_reported_every_interval() {
        let mut worker = Worker::new(0, &config(), &[], 11).expect("worker");
        let events = collect(&mut worker, 100);
        let deltas: Vec<u64> = events
            .iter()
            .filter_map(|kind| match kind {
                SearchEventKind::Progress { delta } => Some(*delta),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec![10; 10]);
        assert_eq!(worker.report().attempts, 100);
    }

    #[test]
    fn best_events_strictly_increase() {
        let mut worker = Worker::new(1, &config(), &[WallSegment::new(4, 0, 4, 6)], 5)
            .expect("worker");
        let events = collect(&mut worker, 500);
        let bests: Vec<Score> = events
            .iter()
            .filter_map(|kind| match kind {
                SearchEventKind::Best { score, script, .. } => {
                    assert!(!script.is_empty());
                    Some(*score)
                }
                _ => None,
            })
            .collect();
        assert!(!bests.is_empty());
        assert!(bests.windows(2).all(|pair| pair[0] < pair[1]), "{bests:?}");
        assert_eq!(bests.last().copied(), Some(worker.best_score()));
        worker.archive().check_invariants().expect("invariants");
    }

    #[test]
    fn best_event_carries_archived_script() {
        let mut worker = Worker::new(2, &config(), &[], 99).expect("worker");
        let mut bests = Vec::new();
        for _ in 0..200 {
            worker.attempt(&mut |kind| {
                if let SearchEventKind::Best { score, script, .. } = kind {
                    bests.push((score, script));
                }
            });
        }
        let (score, script) = bests.last().cloned().expect("best");
        assert!(
            worker
                .archive()
                .iter()
                .any(|entry| entry.agent.score() == score && entry.agent.script().codes() == script)
        );
    }

    #[test]
    fn stagnation_resets_archive() {
        let config = MazeBotsConfig {
            stagnation_threshold: 3,
            ..config()
        };
        let mut worker = Worker::new(3, &config, &[], 1234).expect("worker");
        let events = collect(&mut worker, 2_000);
        let resets = events
            .iter()
            .filter(|kind| matches!(kind, SearchEventKind::StagnationReset))
            .count();
        assert!(resets > 0);
        assert_eq!(worker.report().resets, resets as u64);
        assert!(worker.archive().len() <= config.archive_capacity);
    }

    #[test]
    fn reset_fires_once_threshold_is_exceeded_then_best_restarts() {
        let config = MazeBotsConfig {
            stagnation_threshold: 3,
            ..config()
        };
        let mut worker = Worker::new(6, &config, &[], 31).expect("worker");
        let (mut attempts, mut last_best) = (0_u64, 0_u64);
        let mut awaiting_best = false;
        let mut resets = 0;
        for step in 0..3_000 {
            let mut events = Vec::new();
            let outcome = worker.attempt(&mut |kind| events.push(kind));
            let best_emitted = events
                .iter()
                .any(|kind| matches!(kind, SearchEventKind::Best { .. }));
            let reset_emitted = events
                .iter()
                .any(|kind| matches!(kind, SearchEventKind::StagnationReset));

            if awaiting_best && outcome != AttemptOutcome::Rejected {
                assert!(
                    matches!(outcome, AttemptOutcome::Improved { .. }),
                    "first evaluation after a reset at step {step} must be a new best"
                );
                assert!(best_emitted);
                awaiting_best = false;
            }
            assert_eq!(best_emitted, matches!(outcome, AttemptOutcome::Improved { .. }));

            if matches!(outcome, AttemptOutcome::Improved { .. }) {
                last_best = attempts;
            }
            attempts += 1;
            let expected_reset = attempts - last_best > 3;
            assert_eq!(reset_emitted, expected_reset, "step {step}");
            if expected_reset {
                assert_eq!(worker.best_score(), Score::NEG_INFINITY);
                assert_eq!(worker.archive().len(), 1);
                attempts = 0;
                last_best = 0;
                awaiting_best = true;
                resets += 1;
            }
        }
        assert!(resets > 0);
        assert_eq!(worker.report().resets, resets);
    }

    #[test]
    fn stop_flag_ends_the_loop() {
        let worker = Worker::new(4, &config(), &[], 8).expect("worker");
        let stop = AtomicBool::new(false);
        let mut sent = 0_u32;
        let report = worker.run(&stop, &mut |_| {
            sent += 1;
            if sent >= 25 {
                stop.store(true, Ordering::Relaxed);
            }
            true
        });
        assert!(report.attempts > 0);
        assert!(sent >= 25);
    }

    #[test]
    fn disconnected_receiver_ends_the_loop() {
        let worker = Worker::new(5, &config(), &[], 8).expect("worker");
        let stop = AtomicBool::new(false);
        let report = worker.run(&stop, &mut |_| false);
        assert!(report.attempts >= 1);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = MazeBotsConfig {
            workers: 0,
            ..MazeBotsConfig::default()
        };
        assert!(matches!(
            Worker::new(0, &config, &[], 0),
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
