//! Structural mutation that keeps jump targets pointing at their instructions.

use rand::{Rng, RngCore};

use crate::agent::Agent;
use crate::config::MazeBotsConfig;
use crate::script::{Instruction, Script};

/// Elementary script edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Replace one instruction with a random one.
    Point,
    /// Insert a random instruction next to the chosen position.
    Insert,
    /// Remove the chosen instruction.
    Delete,
    /// Copy a run starting at the chosen position to a random destination.
    Duplicate,
}

impl Edit {
    pub const ALL: [Self; 4] = [Self::Point, Self::Insert, Self::Delete, Self::Duplicate];

    fn random(rng: &mut dyn RngCore) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Sample an instruction uniformly from forward, left, right and jump; jump
/// targets are drawn from `0..jump_range`.
pub fn random_instruction(rng: &mut dyn RngCore, jump_range: usize) -> Instruction {
    match rng.random_range(0..4) {
        0 => Instruction::Forward,
        1 => Instruction::TurnLeft,
        2 => Instruction::TurnRight,
        _ => Instruction::Jump(rng.random_range(0..jump_range.max(1))),
    }
}

/// Overwrite the instruction at `position`.
pub fn point_mutation(script: &mut [Instruction], position: usize, inst: Instruction) {
    if let Some(slot) = script.get_mut(position) {
        *slot = inst;
    }
}

/// Insert `inst` before or after `position`.
///
/// Existing jump targets strictly greater than `position` are incremented;
/// the inserted instruction is kept as given.
pub fn insert(script: &mut Vec<Instruction>, position: usize, inst: Instruction, before: bool) {
    for slot in script.iter_mut() {
        if let Instruction::Jump(target) = slot
            && *target > position
        {
            *target += 1;
        }
    }
    let index = if before { position } else { position + 1 };
    script.insert(index.min(script.len()), inst);
}

/// Remove the instruction at `position`, decrementing every jump target at or
/// past it.
///
/// Decrementing code `0` yields code `-1`, so deleting index 0 turns every
/// jump to 0 into a forward.
pub fn delete(script: &mut Vec<Instruction>, position: usize) {
    if position >= script.len() {
        return;
    }
    script.remove(position);
    for slot in script.iter_mut() {
        if let Instruction::Jump(target) = *slot
            && target >= position
        {
            *slot = match target.checked_sub(1) {
                Some(shifted) => Instruction::Jump(shifted),
                None => Instruction::Forward,
            };
        }
    }
}

/// Copy `script[position..position + len]` and insert it at `destination`.
/// Copied jump targets keep their absolute values.
pub fn duplicate(script: &mut Vec<Instruction>, position: usize, len: usize, destination: usize) {
    let end = (position + len).min(script.len());
    if position >= end {
        return;
    }
    let run = script[position..end].to_vec();
    let destination = destination.min(script.len());
    script.splice(destination..destination, run);
}

/// Produces descendants with a geometric number of edits.
#[derive(Debug, Clone, Copy)]
pub struct Mutator {
    continue_probability: f64,
}

impl Default for Mutator {
    fn default() -> Self {
        Self::new(MazeBotsConfig::default().continue_probability)
    }
}

impl Mutator {
    /// `continue_probability` is the chance of another edit after each edit.
    #[must_use]
    pub fn new(continue_probability: f64) -> Self {
        Self {
            continue_probability: continue_probability.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn from_config(config: &MazeBotsConfig) -> Self {
        Self::new(config.continue_probability)
    }

    /// Build a child of `parent`. The child may have an empty script; callers
    /// must discard it before evaluation.
    pub fn mutate(&self, parent: &Agent, rng: &mut dyn RngCore) -> Agent {
        let mut script = parent.script().instructions().to_vec();
        loop {
            if script.is_empty() {
                break;
            }
            Self::apply(Edit::random(rng), &mut script, rng);
            if !rng.random_bool(self.continue_probability) {
                break;
            }
        }
        Agent::new(Script::new(script), parent.generation().next())
    }

    /// Apply one edit at a uniformly random position of a non-empty script.
    pub fn apply(edit: Edit, script: &mut Vec<Instruction>, rng: &mut dyn RngCore) {
        if script.is_empty() {
            return;
        }
        let len = script.len();
        let position = rng.random_range(0..len);
        match edit {
            Edit::Point => {
                let inst = random_instruction(rng, len);
                point_mutation(script, position, inst);
            }
            Edit::Insert => {
                let before = rng.random_bool(0.5);
                let inst = random_instruction(rng, len + 1);
                insert(script, position, inst, before);
            }
            Edit::Delete => delete(script, position),
            Edit::Duplicate => {
                let run = rng.random_range(1..=len - position);
                let destination = rng.random_range(0..len);
                duplicate(script, position, run, destination);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Generation;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::script::Instruction::{Forward as F, Jump as G, TurnLeft as L, TurnRight as R};

    #[test]
    fn insert_before_leaves_lower_targets() {
        let mut script = vec![F, F, G(0)];
        insert(&mut script, 1, L, true);
        assert_eq!(script, vec![F, L, F, G(0)]);
    }

    #[test]
    fn insert_shifts_targets_past_position() {
        let mut script = vec![F, L, G(2), G(1)];
        insert(&mut script, 1, R, false);
        assert_eq!(script, vec![F, L, R, G(3), G(1)]);
    }

    #[test]
    fn inserted_jump_is_not_rebased() {
        let mut script = vec![F, G(1)];
        insert(&mut script, 0, G(2), true);
        assert_eq!(script, vec![G(2), F, G(2)]);
    }

    #[test]
    fn insert_after_last_appends() {
        let mut script = vec![F, R];
        insert(&mut script, 1, L, false);
        assert_eq!(script, vec![F, R, L]);
    }

    #[test]
    fn delete_shifts_targets_down() {
        let mut script = vec![F, L, R, G(2), G(0), G(1)];
        delete(&mut script, 1);
        assert_eq!(script, vec![F, R, G(1), G(0), G(0)]);
    }

    #[test]
    fn deleting_root_turns_jumps_to_zero_into_forward() {
        let mut script = vec![G(0), F, G(0)];
        delete(&mut script, 0);
        assert_eq!(script, vec![F, F]);

        let mut script = vec![L, G(0), G(1), G(2)];
        delete(&mut script, 0);
        assert_eq!(script, vec![F, G(0), G(1)]);
        assert_eq!(Script::new(script).identity(), "FG0G1");
    }

    #[test]
    fn deleting_past_root_keeps_jumps_to_zero() {
        let mut script = vec![F, G(0), L];
        delete(&mut script, 2);
        assert_eq!(script, vec![F, G(0)]);
    }

    #[test]
    fn duplicate_copies_run_verbatim() {
        let mut script = vec![F, G(0), L, R];
        duplicate(&mut script, 1, 2, 0);
        assert_eq!(script, vec![G(0), L, F, G(0), L, R]);
    }

    #[test]
    fn duplicate_clamps_run_to_script_end() {
        let mut script = vec![F, L];
        duplicate(&mut script, 1, 5, 1);
        assert_eq!(script, vec![F, L, L]);
    }

    #[test]
    fn child_advances_generation_and_pays_length() {
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        let parent = Agent::new(Script::new(vec![F, L, R, G(1)]), Generation(4));
        for _ in 0..100 {
            let child = Mutator::default().mutate(&parent, &mut rng);
            assert_eq!(child.generation(), Generation(5));
            assert_eq!(child.score(), -(child.script().len() as f64));
        }
        assert_eq!(parent.script().len(), 4);
    }

    #[test]
    fn single_edit_without_continuation() {
        let mut rng = SmallRng::seed_from_u64(99);
        let parent = Agent::new(Script::new(vec![F, F, F, F, F]), Generation(0));
        let mutator = Mutator::new(0.0);
        for _ in 0..200 {
            let child = mutator.mutate(&parent, &mut rng);
            let len = child.script().len();
            // One edit changes the length by at most the duplicated run.
            assert!((4..=10).contains(&len), "len {len}");
        }
    }

    #[test]
    fn mutation_eventually_empties_single_instruction_scripts() {
        let mut rng = SmallRng::seed_from_u64(7);
        let parent = Agent::seed();
        let mutator = Mutator::new(0.0);
        let empties = (0..400)
            .filter(|_| mutator.mutate(&parent, &mut rng).script().is_empty())
            .count();
        assert!(empties > 0);
    }

    #[test]
    fn random_instruction_covers_every_kind() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..200 {
            match random_instruction(&mut rng, 3) {
                F => seen[0] = true,
                L => seen[1] = true,
                R => seen[2] = true,
                G(target) => {
                    assert!(target < 3);
                    seen[3] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
