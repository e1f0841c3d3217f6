//! Multi-robot rescue planning on a 3-D occupancy grid.
//!
//! Assigns detected survivors to rescue robots with a genetic algorithm,
//! scoring candidate plans by sampled path cost, risk and coverage, and
//! optionally evaluating each generation on a persistent worker pool.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Node`, `Path`, `Survivor`
//! - **`world`**: The `WorldModel` trait, the dense `Grid`, world generation
//!   and robot placement
//! - **`pathfinding`**: Exact A* search and the sampled cost estimate
//! - **`ga`**: Mission encoding, operators, fitness, generational driver
//! - **`parallel`**: Worker pool and the sequential/pooled evaluators
//! - **`baseline`**: Exact-path comparison solver and the final report
//! - **`config`**: `KEY = VALUE` / JSON run configuration
//! - **`validation`**: Problem integrity checks
//! - **`mission`**: The end-to-end pipeline
//!
//! # References
//!
//! - Hart, Nilsson & Raphael (1968), "A Formal Basis for the Heuristic
//!   Determination of Minimum Cost Paths"
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//!   Machine Learning"
//! - Murphy (2014), "Disaster Robotics"

pub mod baseline;
pub mod config;
pub mod error;
pub mod ga;
pub mod mission;
pub mod models;
pub mod parallel;
pub mod pathfinding;
pub mod validation;
pub mod world;

pub use config::RescueConfig;
pub use error::{RescueError, Result};
pub use mission::{MissionOutcome, RescueMission};
