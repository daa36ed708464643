//! Configuration loading and typed config structures for a Bastion world.
//!
//! The canonical configuration lives in `bastion-config.yaml`. Every section
//! and field has a default matching the standard world rules, so an empty
//! file (or no file at all) describes a valid world.

use std::collections::BTreeMap;
use std::path::Path;

use bastion_combat::{CombatConfig, CombatError};
use bastion_conquest::{ConquestConfig, ConquestError};
use bastion_types::{UnitStats, UnitType};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The combat section is inconsistent.
    #[error("combat config: {source}")]
    Combat {
        /// The underlying validation error.
        #[from]
        source: CombatError,
    },

    /// The conquest section is inconsistent.
    #[error("conquest config: {source}")]
    Conquest {
        /// The underlying validation error.
        #[from]
        source: ConquestError,
    },

    /// Any other inconsistent value.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level world configuration.
///
/// Mirrors the structure of `bastion-config.yaml`. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// World identity, speed and randomness.
    #[serde(default)]
    pub world: WorldSettings,

    /// Modifier pipeline, support effects, siege and plunder tunables.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Allegiance rates and conquest windows.
    #[serde(default)]
    pub conquest: ConquestConfig,

    /// Command admission thresholds.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Sliding-window rate limits.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Unit stat overrides and additions on top of the standard table.
    #[serde(default)]
    pub units: BTreeMap<UnitType, UnitStats>,
}

impl WorldConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.world.speed.is_finite() || self.world.speed <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: "world.speed must be positive".to_owned(),
            });
        }
        if self.rate_limits.window_seconds <= 0 {
            return Err(ConfigError::Invalid {
                reason: "rate_limits.window_seconds must be positive".to_owned(),
            });
        }
        self.combat.validate()?;
        self.conquest.validate()?;
        Ok(())
    }
}

/// How per-command random number generators are seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngMode {
    /// Derived from the world seed and the command sequence; replayable.
    #[default]
    Seeded,
    /// Drawn from OS entropy.
    Entropy,
}

/// World-level settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldSettings {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for replayable resolution.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// World speed multiplier (siege thresholds scale with it).
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// RNG seeding mode.
    #[serde(default)]
    pub rng: RngMode,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            speed: default_speed(),
            rng: RngMode::default(),
        }
    }
}

/// Command admission thresholds, in population.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Attacks below this population are rejected.
    #[serde(default = "default_min_attack_population")]
    pub min_attack_population: u64,

    /// Attacks below this population are flagged as fakes in reports.
    #[serde(default = "default_fake_attack_population")]
    pub fake_attack_population: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_attack_population: default_min_attack_population(),
            fake_attack_population: default_fake_attack_population(),
        }
    }
}

/// Sliding-window rate limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: i64,

    /// Commands one player may send inside the window.
    #[serde(default = "default_per_player")]
    pub per_player: u32,

    /// Commands one player may send to one target inside the window.
    #[serde(default = "default_per_target")]
    pub per_target: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            per_player: default_per_player(),
            per_target: default_per_target(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "bastion".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_speed() -> f64 {
    1.0
}

const fn default_min_attack_population() -> u64 {
    1
}

const fn default_fake_attack_population() -> u64 {
    100
}

const fn default_window_seconds() -> i64 {
    60
}

const fn default_per_player() -> u32 {
    30
}

const fn default_per_target() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_the_default_world() {
        let config = WorldConfig::parse("{}").unwrap();
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn sections_override_independently() {
        let yaml = r"
world:
  name: test-world
  speed: 2.0
  rng: entropy
rate_limits:
  per_player: 1
combat:
  luck:
    min: 0
    max: 0
conquest:
  drop_min: 25
  drop_max: 25
units:
  militia:
    attack: 0
    defense: { infantry: 15, cavalry: 45, ranged: 25 }
    speed: 30
    carry: 0
    population: 0
    class: infantry
    role: line
";
        let config = WorldConfig::parse(yaml).unwrap();

        assert_eq!(config.world.name, "test-world");
        assert_eq!(config.world.rng, RngMode::Entropy);
        assert_eq!(config.rate_limits.per_player, 1);
        assert_eq!(config.rate_limits.window_seconds, 60);
        assert!(config.combat.luck.max.abs() < f64::EPSILON);
        assert!(config.units.contains_key("militia"));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn non_positive_speed_is_rejected() {
        let result = WorldConfig::parse("world:\n  speed: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn nested_section_errors_are_surfaced() {
        let result = WorldConfig::parse("conquest:\n  drop_min: 50\n  drop_max: 10\n");
        assert!(matches!(result, Err(ConfigError::Conquest { .. })));

        let result = WorldConfig::parse("combat:\n  luck:\n    min: 0.5\n    max: 0.1\n");
        assert!(matches!(result, Err(ConfigError::Combat { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let result = WorldConfig::parse("world: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
