//! Static configuration for a MazeBots search.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when validating a [`MazeBotsConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Largest grid, in cells, whose wall and cell keys fit the `i32` coordinate space.
pub const MAX_GRID_CELLS: u64 = i32::MAX as u64;

/// Tunables shared by the maze, the evaluator, the archive and the workers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MazeBotsConfig {
    /// Number of grid columns.
    pub grid_width: u32,
    /// Number of grid rows.
    pub grid_height: u32,
    /// Maximum number of agents retained by each worker's archive.
    pub archive_capacity: usize,
    /// Ticks an evaluation may run without improving its best score.
    pub patience: u32,
    /// Probability of applying another edit after each mutation edit.
    pub continue_probability: f64,
    /// Attempts between progress events.
    pub progress_interval: u64,
    /// Attempts without a new best before a worker resets its archive.
    pub stagnation_threshold: u64,
    /// Number of independent workers.
    pub workers: usize,
    /// Capacity of the event channel shared by all workers.
    pub event_capacity: usize,
    /// Optional RNG seed for reproducible searches.
    pub rng_seed: Option<u64>,
}

impl Default for MazeBotsConfig {
    fn default() -> Self {
        Self {
            grid_width: 40,
            grid_height: 25,
            archive_capacity: 1_000,
            patience: 200,
            continue_probability: 0.7,
            progress_interval: 100,
            stagnation_threshold: 1_000_000,
            workers: 8,
            event_capacity: 1_024,
            rng_seed: None,
        }
    }
}

impl MazeBotsConfig {
    /// Ensure every value is usable by the search.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::InvalidConfig(
                "grid_width and grid_height must be non-zero",
            ));
        }
        if u64::from(self.grid_width) * u64::from(self.grid_height) > MAX_GRID_CELLS {
            return Err(ConfigError::InvalidConfig(
                "grid_width * grid_height must not exceed i32::MAX cells",
            ));
        }
        if self.archive_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "archive_capacity must be non-zero",
            ));
        }
        if self.patience == 0 {
            return Err(ConfigError::InvalidConfig("patience must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.continue_probability) {
            return Err(ConfigError::InvalidConfig(
                "continue_probability must be in [0, 1)",
            ));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::InvalidConfig(
                "progress_interval must be non-zero",
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidConfig("workers must be non-zero"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidConfig("event_capacity must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = MazeBotsConfig::default();
        assert_eq!(config.grid_width, 40);
        assert_eq!(config.grid_height, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_certain_continuation() {
        let config = MazeBotsConfig {
            continue_probability: 1.0,
            ..MazeBotsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_empty_grid() {
        let config = MazeBotsConfig {
            grid_height: 0,
            ..MazeBotsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_grids_past_the_cell_limit() {
        let oversized = MazeBotsConfig {
            grid_width: 50_000,
            grid_height: 50_000,
            ..MazeBotsConfig::default()
        };
        assert!(oversized.validate().is_err());
        let largest = MazeBotsConfig {
            grid_width: i32::MAX as u32,
            grid_height: 1,
            ..MazeBotsConfig::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: MazeBotsConfig =
            serde_json::from_str(r#"{"workers": 2, "rng_seed": 7}"#).expect("config");
        assert_eq!(config.workers, 2);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.archive_capacity, 1_000);
    }
}
