//! Core types shared across the MazeBots workspace.
//!
//! A [`Maze`] is built from user-drawn wall segments, a [`Script`] drives an
//! [`Agent`] through it, the [`Evaluator`] scores how much of the maze the
//! agent explores, a [`Mutator`] derives new scripts, and an [`Archive`] keeps
//! the best distinct scripts found so far.

pub mod agent;
pub mod archive;
pub mod config;
pub mod fitness;
pub mod maze;
pub mod mutation;
pub mod script;

pub use agent::{Agent, Generation, Heading, StepOutcome};
pub use archive::{Archive, ArchiveEntry};
pub use config::{ConfigError, MAX_GRID_CELLS, MazeBotsConfig};
pub use fitness::{Evaluation, Evaluator};
pub use maze::{Cell, Maze, WallSegment};
pub use mutation::{Edit, Mutator};
pub use script::{Instruction, Script, ScriptError};

/// Cumulative exploration score of an agent.
pub type Score = f64;
