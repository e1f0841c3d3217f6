//! Run configuration.
//!
//! Two on-disk formats are accepted:
//!
//! ```text
//! # rescue.conf
//! GRID_X = 20
//! GRID_Y = 20
//! GRID_Z = 3
//! OBSTACLE_DENSITY = 0.2
//! ROBOT_COUNT = 4
//! POPULATION_SIZE = 100
//! GENERATIONS = 100
//! ```
//!
//! and the equivalent JSON object with snake_case field names. Missing keys
//! take their defaults, unknown keys are ignored, and out-of-range values
//! are replaced by [`RescueConfig::normalized`] rather than rejected.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RescueError, Result};
use crate::ga::GaConfig;
use crate::world::WorldGenerator;

const DEFAULT_MUTATION_RATE: f64 = 0.1;
const DEFAULT_ELITISM_PERCENT: i64 = 10;
const DEFAULT_POOL_SIZE: i64 = 4;
const DEFAULT_MAX_PER_ROBOT: i64 = 20;
const MIN_WORKER_TIMEOUT_MS: u64 = 100;

/// Every knob of a rescue run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueConfig {
    pub grid_x: i32,
    pub grid_y: i32,
    pub grid_z: i32,
    pub obstacle_density: f64,
    pub heat_threshold: f32,
    pub co2_threshold: f32,
    pub robot_count: usize,
    pub population_size: usize,
    pub generations: usize,
    /// Per-robot mutation probability; outside `[0, 1]` falls back to 0.1.
    pub mutation_rate: f64,
    /// Outside `0..=100` falls back to 10.
    pub elitism_percent: i64,
    /// Worker threads; below 1 becomes 1.
    pub pool_size: i64,
    /// Below 1 falls back to 20.
    pub max_survivors_per_robot: i64,
    /// RNG seed for world generation and evolution; `None` uses OS entropy.
    pub seed: Option<u64>,
    /// Longest wait for a single pooled fitness result.
    pub worker_timeout_ms: u64,
    /// Score on a worker pool.
    pub parallel: bool,
    /// Compute the baseline comparison.
    pub baseline: bool,
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            grid_x: 10,
            grid_y: 10,
            grid_z: 3,
            obstacle_density: 0.2,
            heat_threshold: 0.7,
            co2_threshold: 0.7,
            robot_count: 4,
            population_size: 100,
            generations: 100,
            mutation_rate: DEFAULT_MUTATION_RATE,
            elitism_percent: DEFAULT_ELITISM_PERCENT,
            pool_size: DEFAULT_POOL_SIZE,
            max_survivors_per_robot: DEFAULT_MAX_PER_ROBOT,
            seed: None,
            worker_timeout_ms: 30_000,
            parallel: true,
            baseline: true,
        }
    }
}

impl RescueConfig {
    /// Loads a configuration file, choosing the format by extension
    /// (`.json` for JSON; `.conf`, `.cfg`, `.txt`, `.ini` or none for
    /// `KEY = VALUE`). The result is normalized.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match ext.as_deref() {
            Some("json") => Self::from_json_str(&text)?,
            None | Some("conf" | "cfg" | "txt" | "ini") => Self::from_kv_str(&text)?,
            Some(other) => {
                return Err(RescueError::InvalidConfig {
                    field: "path".to_string(),
                    reason: format!("unsupported extension `{other}`"),
                });
            }
        };
        Ok(config.normalized())
    }

    /// Parses a JSON object. Missing fields take defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parses `KEY = VALUE` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped; only the first
    /// whitespace-separated token of a value is read. A line without `=` is
    /// an error; an unparsable value keeps the default and logs a warning.
    pub fn from_kv_str(text: &str) -> Result<Self> {
        let mut config = Self::default();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(RescueError::ConfigParse {
                    line: i + 1,
                    message: format!("expected KEY = VALUE, got `{line}`"),
                });
            };
            let key = key.trim();
            let value = value.split_whitespace().next().unwrap_or("");
            let line_no = i + 1;
            match key {
                "GRID_X" => set(&mut config.grid_x, key, value, line_no),
                "GRID_Y" => set(&mut config.grid_y, key, value, line_no),
                "GRID_Z" => set(&mut config.grid_z, key, value, line_no),
                "OBSTACLE_DENSITY" => set(&mut config.obstacle_density, key, value, line_no),
                "HEAT_THRESHOLD" => set(&mut config.heat_threshold, key, value, line_no),
                "CO2_THRESHOLD" => set(&mut config.co2_threshold, key, value, line_no),
                "ROBOT_COUNT" => set(&mut config.robot_count, key, value, line_no),
                "POPULATION_SIZE" => set(&mut config.population_size, key, value, line_no),
                "GENERATIONS" => set(&mut config.generations, key, value, line_no),
                "MUTATION_RATE" => set(&mut config.mutation_rate, key, value, line_no),
                "ELITISM_PERCENT" => set(&mut config.elitism_percent, key, value, line_no),
                "POOL_SIZE" => set(&mut config.pool_size, key, value, line_no),
                "MAX_SURVIVORS_PER_ROBOT" => {
                    set(&mut config.max_survivors_per_robot, key, value, line_no)
                }
                "WORKER_TIMEOUT_MS" => set(&mut config.worker_timeout_ms, key, value, line_no),
                "PARALLEL" => set(&mut config.parallel, key, value, line_no),
                "BASELINE" => set(&mut config.baseline, key, value, line_no),
                "SEED" => {
                    let mut seed = 0u64;
                    let parsed = set(&mut seed, key, value, line_no);
                    if parsed {
                        config.seed = Some(seed);
                    }
                    parsed
                }
                _ => false,
            };
        }
        Ok(config)
    }

    /// Replaces out-of-range values by their documented fallbacks.
    pub fn normalized(mut self) -> Self {
        if !self.mutation_rate.is_finite() || !(0.0..=1.0).contains(&self.mutation_rate) {
            warn!(value = self.mutation_rate, "mutation rate out of range; using 0.1");
            self.mutation_rate = DEFAULT_MUTATION_RATE;
        }
        if !(0..=100).contains(&self.elitism_percent) {
            warn!(value = self.elitism_percent, "elitism percent out of range; using 10");
            self.elitism_percent = DEFAULT_ELITISM_PERCENT;
        }
        if self.pool_size < 1 {
            warn!(value = self.pool_size, "pool size below 1; using 1");
            self.pool_size = 1;
        }
        if self.worker_timeout_ms < MIN_WORKER_TIMEOUT_MS {
            warn!(
                value = self.worker_timeout_ms,
                "worker timeout below 100 ms; using 100"
            );
            self.worker_timeout_ms = MIN_WORKER_TIMEOUT_MS;
        }
        if self.max_survivors_per_robot < 1 {
            warn!(
                value = self.max_survivors_per_robot,
                "max survivors per robot below 1; using 20"
            );
            self.max_survivors_per_robot = DEFAULT_MAX_PER_ROBOT;
        }
        if !self.obstacle_density.is_finite() {
            self.obstacle_density = 0.0;
        }
        self
    }

    /// Per-robot survivor cap.
    pub fn max_per_robot(&self) -> usize {
        usize::try_from(self.max_survivors_per_robot)
            .ok()
            .filter(|&cap| cap > 0)
            .unwrap_or(DEFAULT_MAX_PER_ROBOT as usize)
    }

    /// GA parameters of this configuration.
    pub fn to_ga_config(&self) -> GaConfig {
        let c = self.clone().normalized();
        GaConfig {
            population_size: c.population_size,
            generations: c.generations,
            mutation_rate: c.mutation_rate,
            elitism_percent: c.elitism_percent as usize,
            max_per_robot: c.max_per_robot(),
            parallel: c.parallel,
            pool_size: c.pool_size as usize,
            result_timeout: Duration::from_millis(c.worker_timeout_ms),
            seed: c.seed,
            ..GaConfig::default()
        }
    }

    /// World generator of this configuration.
    pub fn world_generator(&self) -> WorldGenerator {
        WorldGenerator::new()
            .with_obstacle_density(self.obstacle_density)
            .with_thresholds(self.heat_threshold, self.co2_threshold)
    }
}

/// Parses `value` into `slot`; returns whether it parsed.
fn set<T: FromStr>(slot: &mut T, key: &str, value: &str, line: usize) -> bool {
    match value.parse() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => {
            warn!(key, value, line, "unparsable configuration value; keeping default");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# disaster zone
GRID_X = 20
GRID_Y=15
GRID_Z = 2   

OBSTACLE_DENSITY = 0.3
ROBOT_COUNT = 6
POPULATION_SIZE = 50
GENERATIONS = 40
MUTATION_RATE = 0.2 # per robot
POOL_SIZE = 8
SEED = 7
COLOR = red
";

    #[test]
    fn test_defaults() {
        let c = RescueConfig::default();
        assert_eq!(c.mutation_rate, 0.1);
        assert_eq!(c.elitism_percent, 10);
        assert_eq!(c.pool_size, 4);
        assert_eq!(c.max_survivors_per_robot, 20);
        assert_eq!(c.seed, None);
    }

    #[test]
    fn test_kv_parsing() {
        let c = RescueConfig::from_kv_str(SAMPLE).unwrap();
        assert_eq!((c.grid_x, c.grid_y, c.grid_z), (20, 15, 2));
        assert_eq!(c.obstacle_density, 0.3);
        assert_eq!(c.robot_count, 6);
        assert_eq!(c.population_size, 50);
        assert_eq!(c.generations, 40);
        assert_eq!(c.mutation_rate, 0.2);
        assert_eq!(c.pool_size, 8);
        assert_eq!(c.seed, Some(7));
        assert_eq!(c.elitism_percent, 10);
    }

    #[test]
    fn test_kv_malformed_line() {
        let err = RescueConfig::from_kv_str("GRID_X = 4\nGRID_Y 4\n").unwrap_err();
        assert!(matches!(err, RescueError::ConfigParse { line: 2, .. }));
    }

    #[test]
    fn test_kv_unparsable_value_keeps_default() {
        let c = RescueConfig::from_kv_str("POPULATION_SIZE = lots").unwrap();
        assert_eq!(c.population_size, 100);
    }

    #[test]
    fn test_normalized_fallbacks() {
        let c = RescueConfig {
            mutation_rate: 1.5,
            elitism_percent: 120,
            pool_size: 0,
            max_survivors_per_robot: -3,
            ..RescueConfig::default()
        }
        .normalized();
        assert_eq!(c.mutation_rate, 0.1);
        assert_eq!(c.elitism_percent, 10);
        assert_eq!(c.pool_size, 1);
        assert_eq!(c.max_survivors_per_robot, 20);

        let nan = RescueConfig {
            mutation_rate: f64::NAN,
            ..RescueConfig::default()
        }
        .normalized();
        assert_eq!(nan.mutation_rate, 0.1);
    }

    #[test]
    fn test_zero_worker_timeout_raised() {
        let c = RescueConfig::from_kv_str("WORKER_TIMEOUT_MS = 0\n")
            .unwrap()
            .normalized();
        assert_eq!(c.worker_timeout_ms, 100);
        assert_eq!(c.to_ga_config().result_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_json_partial() {
        let c = RescueConfig::from_json_str(r#"{"robot_count": 2, "seed": 9, "parallel": false}"#)
            .unwrap();
        assert_eq!(c.robot_count, 2);
        assert_eq!(c.seed, Some(9));
        assert!(!c.parallel);
        assert_eq!(c.grid_x, 10);
    }

    #[test]
    fn test_json_round_trip() {
        let c = RescueConfig::from_kv_str(SAMPLE).unwrap();
        let text = serde_json::to_string(&c).unwrap();
        assert_eq!(RescueConfig::from_json_str(&text).unwrap(), c);
    }

    #[test]
    fn test_to_ga_config() {
        let c = RescueConfig {
            pool_size: -1,
            worker_timeout_ms: 250,
            seed: Some(3),
            ..RescueConfig::default()
        };
        let ga = c.to_ga_config();
        assert_eq!(ga.pool_size, 1);
        assert_eq!(ga.result_timeout, Duration::from_millis(250));
        assert_eq!(ga.seed, Some(3));
        assert_eq!(ga.max_per_robot, 20);
        assert_eq!(ga.elitism_percent, 10);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = std::env::temp_dir().join(format!("u-rescue-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let kv = dir.join("rescue.conf");
        std::fs::write(&kv, "ROBOT_COUNT = 3\nPOOL_SIZE = 0\n").unwrap();
        let c = RescueConfig::load(&kv).unwrap();
        assert_eq!(c.robot_count, 3);
        assert_eq!(c.pool_size, 1);

        let json = dir.join("rescue.json");
        std::fs::write(&json, r#"{"generations": 5}"#).unwrap();
        assert_eq!(RescueConfig::load(&json).unwrap().generations, 5);

        let toml = dir.join("rescue.toml");
        std::fs::write(&toml, "").unwrap();
        assert!(matches!(
            RescueConfig::load(&toml),
            Err(RescueError::InvalidConfig { .. })
        ));

        assert!(matches!(
            RescueConfig::load(dir.join("missing.conf")),
            Err(RescueError::ConfigIo(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
