//! Crate error type.
//!
//! Invalid configuration values are never reported here: they fall back to
//! documented defaults (see [`crate::config::RescueConfig::normalized`]).
//! Errors are reserved for conditions that make a run impossible.

use thiserror::Error;

use crate::validation::ValidationError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RescueError>;

/// Errors raised by world construction, configuration loading, robot
/// placement and worker pool creation.
#[derive(Debug, Error)]
pub enum RescueError {
    /// Grid dimensions are zero or negative.
    #[error("grid dimensions must be positive, got {x}x{y}x{z}")]
    EmptyGrid { x: i32, y: i32, z: i32 },

    /// No free cell with a free neighbour is available for a robot.
    #[error(
        "cannot place robot {robot}: no free cell with a free neighbour is available \
         (reduce obstacle density or enlarge the grid)"
    )]
    NoRobotPlacement { robot: usize },

    /// The problem instance failed structural validation.
    #[error("invalid rescue problem: {}", summarize(.0))]
    InvalidProblem(Vec<ValidationError>),

    /// A configuration source cannot be used at all.
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A line of a `KEY = VALUE` configuration file is malformed.
    #[error("configuration line {line}: {message}")]
    ConfigParse { line: usize, message: String },

    /// A JSON configuration document is malformed.
    #[error("invalid JSON configuration: {0}")]
    ConfigJson(#[from] serde_json::Error),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {worker}: {source}")]
    PoolSpawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
