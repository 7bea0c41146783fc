//! Scripted agents and the instruction interpreter.

use serde::{Deserialize, Serialize};

use crate::Score;
use crate::maze::{Cell, Maze};
use crate::script::{Instruction, Script};

/// Lineage depth of an agent (0 for the seed).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(pub u32);

impl Generation {
    /// Advances to the next lineage generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Facing direction; turning left steps backwards through the cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Heading {
    Up,
    Right,
    #[default]
    Down,
    Left,
}

impl Heading {
    const CYCLE: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    #[must_use]
    pub const fn turn_left(self) -> Self {
        Self::CYCLE[(self.index() + 3) % 4]
    }

    #[must_use]
    pub const fn turn_right(self) -> Self {
        Self::CYCLE[(self.index() + 1) % 4]
    }

    /// Cell offset of one step in this direction (y grows downwards).
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    /// Whether the maze blocks a step from `cell` in this direction.
    #[must_use]
    pub fn blocked(self, maze: &Maze, cell: Cell) -> bool {
        match self {
            Self::Up => maze.top_border(cell.x, cell.y),
            Self::Right => maze.right_border(cell.x, cell.y),
            Self::Down => maze.bottom_border(cell.x, cell.y),
            Self::Left => maze.left_border(cell.x, cell.y),
        }
    }
}

/// What a single interpreter step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Forward into the next cell.
    Moved,
    /// Forward into a border; the pointer skips the following instruction.
    Bumped,
    Turned,
    Jumped,
    /// The script is empty, nothing to execute.
    Halted,
}

impl StepOutcome {
    /// Whether the executed instruction was a forward, blocked or not.
    #[must_use]
    pub const fn was_forward(self) -> bool {
        matches!(self, Self::Moved | Self::Bumped)
    }
}

/// Script plus interpreter state.
///
/// The script never changes after construction; mutation always builds a new agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    script: Script,
    position: Cell,
    heading: Heading,
    at: usize,
    score: Score,
    generation: Generation,
}

impl Agent {
    /// Create an agent whose score starts at the length penalty `-len(script)`.
    #[must_use]
    pub fn new(script: Script, generation: Generation) -> Self {
        let score = -(script.len() as Score);
        Self {
            script,
            position: Cell::default(),
            heading: Heading::default(),
            at: 0,
            score,
            generation,
        }
    }

    /// Generation-zero agent that only moves forward.
    #[must_use]
    pub fn seed() -> Self {
        Self::new(Script::new(vec![Instruction::Forward]), Generation(0))
    }

    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    #[must_use]
    pub const fn position(&self) -> Cell {
        self.position
    }

    #[must_use]
    pub const fn heading(&self) -> Heading {
        self.heading
    }

    /// Index of the next instruction to execute.
    #[must_use]
    pub const fn at(&self) -> usize {
        self.at
    }

    #[must_use]
    pub const fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Identity string of the script.
    #[must_use]
    pub fn identity(&self) -> String {
        self.script.identity()
    }

    /// Move back to the maze centre facing down at instruction 0. The score is kept.
    pub fn reset(&mut self, maze: &Maze) {
        self.position = maze.center();
        self.heading = Heading::default();
        self.at = 0;
    }

    /// Instruction that the next [`step`](Self::step) executes.
    #[must_use]
    pub fn current_instruction(&self) -> Option<Instruction> {
        self.script.get(self.at)
    }

    pub(crate) fn add_score(&mut self, delta: Score) {
        self.score += delta;
    }

    /// Execute the instruction at the pointer against `maze`.
    pub fn step(&mut self, maze: &Maze) -> StepOutcome {
        let Some(inst) = self.current_instruction() else {
            return StepOutcome::Halted;
        };
        match inst {
            Instruction::Forward => {
                if self.heading.blocked(maze, self.position) {
                    self.advance(2);
                    StepOutcome::Bumped
                } else {
                    let (dx, dy) = self.heading.offset();
                    self.position = Cell::new(self.position.x + dx, self.position.y + dy);
                    self.advance(1);
                    StepOutcome::Moved
                }
            }
            Instruction::TurnLeft => {
                self.heading = self.heading.turn_left();
                self.advance(1);
                StepOutcome::Turned
            }
            Instruction::TurnRight => {
                self.heading = self.heading.turn_right();
                self.advance(1);
                StepOutcome::Turned
            }
            Instruction::Jump(target) => {
                self.at = target % self.script.len();
                StepOutcome::Jumped
            }
        }
    }

    fn advance(&mut self, steps: usize) {
        self.at = (self.at + steps) % self.script.len();
    }
}
