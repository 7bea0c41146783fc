//! Deduplicated, score-ranked population store.

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore};
use std::collections::HashSet;
use tracing::trace;

use crate::Score;
use crate::agent::Agent;
use crate::config::MazeBotsConfig;

/// Evaluated agent together with its identity string.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub agent: Agent,
    pub identity: String,
}

impl ArchiveEntry {
    #[must_use]
    pub fn new(agent: Agent) -> Self {
        let identity = agent.identity();
        Self { agent, identity }
    }

    fn rank_key(&self) -> OrderedFloat<Score> {
        OrderedFloat(self.agent.score())
    }
}

/// Agents ordered by descending score, at most `capacity` of them, no two
/// sharing an identity string.
#[derive(Debug, Clone)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    identities: HashSet<String>,
    capacity: usize,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(MazeBotsConfig::default().archive_capacity)
    }
}

impl Archive {
    /// Create an archive holding only the seed agent.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut archive = Self {
            entries: Vec::with_capacity(capacity.min(4_096) + 1),
            identities: HashSet::new(),
            capacity: capacity.max(1),
        };
        archive.reset();
        archive
    }

    #[must_use]
    pub fn from_config(config: &MazeBotsConfig) -> Self {
        Self::new(config.archive_capacity)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest scoring entry.
    #[must_use]
    pub fn best(&self) -> Option<&ArchiveEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn get(&self, rank: usize) -> Option<&ArchiveEntry> {
        self.entries.get(rank)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchiveEntry> + '_ {
        self.entries.iter()
    }

    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    /// Uniformly random member.
    pub fn choose(&self, rng: &mut dyn RngCore) -> Option<&Agent> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.entries.len());
        self.entries.get(index).map(|entry| &entry.agent)
    }

    /// Insert `agent` at its rank and return that rank.
    ///
    /// Returns `None` when the identity is already present or when the agent
    /// ranks below a full archive and is evicted straight away. Ties go after
    /// existing entries with the same score.
    pub fn insert(&mut self, agent: Agent) -> Option<usize> {
        let entry = ArchiveEntry::new(agent);
        if self.identities.contains(&entry.identity) {
            return None;
        }
        let key = entry.rank_key();
        let rank = match self.entries.first() {
            Some(front) if key > front.rank_key() => 0,
            _ => self
                .entries
                .partition_point(|existing| existing.rank_key() >= key),
        };
        self.identities.insert(entry.identity.clone());
        self.entries.insert(rank, entry);

        while self.entries.len() > self.capacity {
            if let Some(lost) = self.entries.pop() {
                self.identities.remove(&lost.identity);
            }
        }
        (rank < self.entries.len()).then_some(rank)
    }

    /// Drop everything and start again from the seed agent.
    pub fn reset(&mut self) {
        trace!(dropped = self.entries.len(), "archive reset");
        self.entries.clear();
        self.identities.clear();
        let seed = ArchiveEntry::new(Agent::seed());
        self.identities.insert(seed.identity.clone());
        self.entries.push(seed);
    }

    /// Verify ordering, capacity and identity uniqueness.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.entries.len() > self.capacity {
            return Err(format!(
                "{} entries exceed capacity {}",
                self.entries.len(),
                self.capacity
            ));
        }
        if let Some(rank) = self
            .entries
            .windows(2)
            .position(|pair| pair[0].rank_key() < pair[1].rank_key())
        {
            return Err(format!("entries {rank} and {} are out of order", rank + 1));
        }
        if self.identities.len() != self.entries.len() {
            return Err(format!(
                "{} identities tracked for {} entries",
                self.identities.len(),
                self.entries.len()
            ));
        }
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| !self.identities.contains(&entry.identity))
        {
            return Err(format!("identity {} is not indexed", entry.identity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Generation;
    use crate::fitness::Evaluator;
    use crate::maze::Maze;
    use crate::mutation::Mutator;
    use crate::script::Script;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn scored(codes: &[i64], score: Score) -> Agent {
        let mut agent = Agent::new(Script::from_codes(codes).expect("script"), Generation(1));
        agent.add_score(score - agent.score());
        agent
    }

    fn scores(archive: &Archive) -> Vec<Score> {
        archive.iter().map(|entry| entry.agent.score()).collect()
    }

    #[test]
    fn starts_with_seed_agent() {
        let archive = Archive::new(10);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.best().expect("best").identity, "F");
        assert!(archive.contains("F"));
    }

    #[test]
    fn better_agent_moves_to_front() {
        let mut archive = Archive::new(10);
        archive.insert(scored(&[-1, -1, -1], -3.0));
        let rank = archive.insert(scored(&[0], 4.5));
        assert_eq!(rank, Some(0));
        assert_eq!(scores(&archive), vec![4.5, -1.0, -3.0]);
        assert_eq!(archive.best().expect("best").identity, "G0");
    }

    #[test]
    fn binary_search_places_middle_scores() {
        let mut archive = Archive::new(10);
        archive.insert(scored(&[-2], 10.0));
        archive.insert(scored(&[-3], 2.0));
        archive.insert(scored(&[-2, -2], -7.0));
        assert_eq!(archive.insert(scored(&[-3, -3], 5.0)), Some(1));
        assert_eq!(scores(&archive), vec![10.0, 5.0, 2.0, -1.0, -7.0]);
    }

    #[test]
    fn ties_rank_after_existing_entries() {
        let mut archive = Archive::new(10);
        assert_eq!(archive.insert(scored(&[-2], -1.0)), Some(1));
        assert_eq!(archive.get(0).expect("seed").identity, "F");
        assert_eq!(archive.insert(scored(&[-3], -1.0)), Some(2));
    }

    #[test]
    fn duplicate_identity_is_ignored() {
        let mut archive = Archive::new(10);
        assert_eq!(archive.insert(scored(&[-1, -2], 3.0)), Some(0));
        assert_eq!(archive.insert(scored(&[-1, -2], 9.0)), None);
        assert_eq!(archive.insert(Agent::seed()), None);
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.best().expect("best").agent.score(), 3.0);
    }

    #[test]
    fn evicts_lowest_scores_past_capacity() {
        let mut archive = Archive::new(3);
        archive.insert(scored(&[-1, -1], -2.0));
        archive.insert(scored(&[-1, -1, -1], -3.0));
        // Worse than every entry of a full archive: evicted immediately.
        assert_eq!(archive.insert(scored(&[-1, -1, -1, -1], -4.0)), None);
        assert!(!archive.contains("FFFF"));
        assert_eq!(archive.insert(scored(&[-2], -2.0)), Some(2));
        assert_eq!(archive.len(), 3);
        assert!(!archive.contains("FFF"));
        assert_eq!(scores(&archive), vec![-1.0, -2.0, -2.0]);
        archive.check_invariants().expect("invariants");
    }

    #[test]
    fn reset_restores_seed_only() {
        let mut archive = Archive::new(5);
        archive.insert(scored(&[-1, -2], 1.0));
        archive.insert(scored(&[-3], 0.5));
        archive.reset();
        assert_eq!(archive.len(), 1);
        assert!(!archive.contains("R"));
        assert!(archive.contains("F"));
    }

    #[test]
    fn invariants_hold_under_search_pressure() {
        let mut rng = SmallRng::seed_from_u64(0xA11CE);
        let mut maze = Maze::new(12, 8).expect("maze");
        let evaluator = Evaluator::new(40);
        let mutator = Mutator::default();
        let mut archive = Archive::new(25);
        for _ in 0..1_500 {
            let parent = archive.choose(&mut rng).expect("parent").clone();
            let mut child = mutator.mutate(&parent, &mut rng);
            if child.script().is_empty() || archive.contains(&child.identity()) {
                continue;
            }
            evaluator.evaluate(&mut maze, &mut child);
            archive.insert(child);
            archive.check_invariants().expect("invariants");
        }
        assert_eq!(archive.len(), 25);
    }
}
