//! Loading inputs for the `mazebots` binary and folding worker events into a summary.

use anyhow::{Context, Result};
use mazebots_core::{MazeBotsConfig, Score, Script, WallSegment};
use mazebots_search::{SearchEvent, SearchEventKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Read a wall layout stored as a JSON array of `[x1, y1, x2, y2]` arrays.
pub fn load_segments(path: &Path) -> Result<Vec<WallSegment>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read wall layout {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse wall layout {}", path.display()))
}

/// Read a configuration file. Missing fields fall back to their defaults.
pub fn load_config(path: &Path) -> Result<MazeBotsConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: MazeBotsConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Best script reported by any worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestScript {
    pub worker: usize,
    pub score: Score,
    pub generation: u32,
    pub script: Vec<i64>,
}

impl BestScript {
    /// Decoded script, if the codes are valid.
    pub fn decode(&self) -> Option<Script> {
        Script::from_codes(&self.script).ok()
    }
}

/// Aggregate view of a run across all workers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub attempts: u64,
    pub best: Option<BestScript>,
    pub resets: BTreeMap<usize, u64>,
    /// Best scores per worker since its last reset.
    pub history: BTreeMap<usize, Vec<Score>>,
}

impl RunSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &SearchEvent) {
        match &event.kind {
            SearchEventKind::Progress { delta } => {
                self.attempts = self.attempts.saturating_add(*delta);
            }
            SearchEventKind::Best {
                score,
                script,
                generation,
            } => {
                self.history.entry(event.worker).or_default().push(*score);
                if self.best.as_ref().is_none_or(|best| *score > best.score) {
                    self.best = Some(BestScript {
                        worker: event.worker,
                        score: *score,
                        generation: *generation,
                        script: script.clone(),
                    });
                }
            }
            SearchEventKind::StagnationReset => {
                *self.resets.entry(event.worker).or_default() += 1;
                self.history.remove(&event.worker);
            }
        }
    }

    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a SearchEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    #[must_use]
    pub fn total_resets(&self) -> u64 {
        self.resets.values().sum()
    }
}
