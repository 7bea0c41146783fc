//! Exploration scoring with early stopping.

use crate::Score;
use crate::agent::{Agent, StepOutcome};
use crate::config::MazeBotsConfig;
use crate::maze::Maze;

/// Reward for entering a cell for the first time.
pub const NEW_CELL_REWARD: Score = 1.0;
/// Penalty for a forward step that ends in an already visited cell.
pub const FORWARD_REVISIT_PENALTY: Score = 0.25;
/// Penalty for any other instruction that leaves the agent on a visited cell.
pub const IDLE_REVISIT_PENALTY: Score = 0.1;

/// Result of a full evaluation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub score: Score,
    /// Instructions executed before the run was cut off.
    pub ticks: u64,
    pub cells_visited: usize,
}

/// Runs agents until they stop improving.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    patience: u32,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(MazeBotsConfig::default().patience)
    }
}

impl Evaluator {
    /// `patience` is the number of consecutive ticks allowed without a new best score.
    #[must_use]
    pub const fn new(patience: u32) -> Self {
        Self { patience }
    }

    #[must_use]
    pub const fn from_config(config: &MazeBotsConfig) -> Self {
        Self::new(config.patience)
    }

    #[must_use]
    pub const fn patience(&self) -> u32 {
        self.patience
    }

    /// Place `agent` at the start of a fresh trial: visited cells are cleared,
    /// the agent is reset and its starting cell counts as explored.
    pub fn attach(maze: &mut Maze, agent: &mut Agent) {
        maze.clear_visited();
        agent.reset(maze);
        let start = agent.position();
        maze.visit(start.x, start.y);
    }

    /// Execute one instruction and apply the exploration reward or penalty.
    pub fn step(maze: &mut Maze, agent: &mut Agent) -> StepOutcome {
        let outcome = agent.step(maze);
        let cell = agent.position();
        if !maze.is_visited(cell.x, cell.y) {
            agent.add_score(NEW_CELL_REWARD);
            maze.visit(cell.x, cell.y);
        } else if outcome.was_forward() {
            agent.add_score(-FORWARD_REVISIT_PENALTY);
        } else {
            agent.add_score(-IDLE_REVISIT_PENALTY);
        }
        outcome
    }

    /// Run `agent` from a fresh start until `patience` ticks pass without a
    /// strictly better score.
    pub fn run(&self, maze: &mut Maze, agent: &mut Agent) -> Evaluation {
        Self::attach(maze, agent);
        let patience = u64::from(self.patience);
        let mut best = Score::NEG_INFINITY;
        let mut best_tick = 0_u64;
        let mut tick = 0_u64;
        while tick - best_tick < patience {
            if Self::step(maze, agent) == StepOutcome::Halted {
                break;
            }
            if agent.score() > best {
                best = agent.score();
                best_tick = tick;
            }
            tick += 1;
        }
        Evaluation {
            score: agent.score(),
            ticks: tick,
            cells_visited: maze.visited_count(),
        }
    }

    /// Final cumulative score of `agent`.
    pub fn evaluate(&self, maze: &mut Maze, agent: &mut Agent) -> Score {
        self.run(maze, agent).score
    }
}
