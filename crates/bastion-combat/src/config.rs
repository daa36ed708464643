//! Tunable parameters for combat resolution.
//!
//! These structs are deserialized from the `combat` section of the world
//! configuration file. Every field has a default matching the standard
//! world rules, so a partial YAML section is always valid.

use serde::Deserialize;

use crate::error::CombatError;

/// All combat tunables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CombatConfig {
    /// Overstack defense penalty.
    #[serde(default)]
    pub overstack: OverstackConfig,

    /// Wall growth rates.
    #[serde(default)]
    pub wall: WallConfig,

    /// Night, terrain and weather factors.
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Morale toggle.
    #[serde(default)]
    pub morale: MoraleConfig,

    /// Luck bounds.
    #[serde(default)]
    pub luck: LuckConfig,

    /// Banner, mantlet and healer parameters.
    #[serde(default)]
    pub support: SupportConfig,

    /// Loot limits.
    #[serde(default)]
    pub plunder: PlunderConfig,
}

impl CombatConfig {
    /// Check internal consistency of the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), CombatError> {
        if self.overstack.enabled && self.overstack.threshold_population == 0 {
            return Err(invalid("overstack.threshold_population must be positive"));
        }
        if !(0.0..=1.0).contains(&self.overstack.min_multiplier) {
            return Err(invalid("overstack.min_multiplier must be within [0, 1]"));
        }
        if self.wall.low_growth <= 1.0 || self.wall.high_growth <= 1.0 {
            return Err(invalid("wall growth rates must be greater than 1"));
        }
        if self.luck.min > self.luck.max {
            return Err(invalid("luck.min must not exceed luck.max"));
        }
        if self.luck.min <= -1.0 {
            return Err(invalid("luck.min must be greater than -1"));
        }
        if self.environment.night.start_hour > 23 || self.environment.night.end_hour > 23 {
            return Err(invalid("night window hours must be within 0..=23"));
        }
        if !(0.0..=1.0).contains(&self.support.mantlet_reduction) {
            return Err(invalid("support.mantlet_reduction must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.support.healer_max_rate) {
            return Err(invalid("support.healer_max_rate must be within [0, 1]"));
        }
        if let Some(factor) = self.plunder.diminishing_factor {
            if !(0.0..=1.0).contains(&factor) {
                return Err(invalid("plunder.diminishing_factor must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> CombatError {
    CombatError::InvalidConfig {
        reason: reason.to_owned(),
    }
}

/// Overstack penalty parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverstackConfig {
    /// Whether the penalty applies at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Defending population above which the penalty starts.
    #[serde(default = "default_overstack_threshold")]
    pub threshold_population: u64,

    /// Penalty per unit of excess ratio.
    #[serde(default = "default_overstack_penalty_rate")]
    pub penalty_rate: f64,

    /// Lowest multiplier the penalty can produce.
    #[serde(default = "default_overstack_min_multiplier")]
    pub min_multiplier: f64,
}

impl Default for OverstackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_population: default_overstack_threshold(),
            penalty_rate: default_overstack_penalty_rate(),
            min_multiplier: default_overstack_min_multiplier(),
        }
    }
}

/// Wall defense growth.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WallConfig {
    /// Per-level growth up to the breakpoint.
    #[serde(default = "default_wall_low_growth")]
    pub low_growth: f64,

    /// Per-level growth above the breakpoint.
    #[serde(default = "default_wall_high_growth")]
    pub high_growth: f64,

    /// Last level that uses `low_growth`.
    #[serde(default = "default_wall_breakpoint")]
    pub breakpoint: u32,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            low_growth: default_wall_low_growth(),
            high_growth: default_wall_high_growth(),
            breakpoint: default_wall_breakpoint(),
        }
    }
}

/// Environmental modifiers, each independently toggleable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnvironmentConfig {
    /// Night defense bonus.
    #[serde(default)]
    pub night: NightConfig,

    /// Terrain factors.
    #[serde(default)]
    pub terrain: SideFactors,

    /// Weather factors.
    #[serde(default)]
    pub weather: SideFactors,
}

/// Night bonus window.
///
/// The window covers hours `start_hour..end_hour` and wraps past midnight
/// when `start_hour > end_hour`. Equal hours mean an empty window.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NightConfig {
    /// Whether the night bonus applies.
    #[serde(default)]
    pub enabled: bool,

    /// First hour of the window (inclusive).
    #[serde(default)]
    pub start_hour: u32,

    /// Hour the window ends (exclusive).
    #[serde(default = "default_night_end_hour")]
    pub end_hour: u32,

    /// Defense multiplier during the window.
    #[serde(default = "default_night_defense_factor")]
    pub defense_factor: f64,

    /// World timezone offset from UTC, in hours.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl Default for NightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: 0,
            end_hour: default_night_end_hour(),
            defense_factor: default_night_defense_factor(),
            utc_offset_hours: 0,
        }
    }
}

/// Separate offense and defense multipliers behind a toggle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SideFactors {
    /// Whether the factors apply.
    #[serde(default)]
    pub enabled: bool,

    /// Offense multiplier.
    #[serde(default = "default_one")]
    pub offense_factor: f64,

    /// Defense multiplier.
    #[serde(default = "default_one")]
    pub defense_factor: f64,
}

impl Default for SideFactors {
    fn default() -> Self {
        Self {
            enabled: false,
            offense_factor: 1.0,
            defense_factor: 1.0,
        }
    }
}

/// Morale toggle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoraleConfig {
    /// Whether morale scales offense.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MoraleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Luck bounds, as fractional offsets (`-0.25` means 25% bad luck).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LuckConfig {
    /// Lowest luck offset.
    #[serde(default = "default_luck_min")]
    pub min: f64,

    /// Highest luck offset.
    #[serde(default = "default_luck_max")]
    pub max: f64,
}

impl Default for LuckConfig {
    fn default() -> Self {
        Self {
            min: default_luck_min(),
            max: default_luck_max(),
        }
    }
}

/// One banner aura tier.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BannerTier {
    /// Minimum banner units present to reach the tier.
    pub min_units: u32,
    /// Defense multiplier granted.
    pub multiplier: f64,
}

/// Support unit effects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupportConfig {
    /// Banner tiers, any order; the highest satisfied tier wins.
    #[serde(default = "default_banner_tiers")]
    pub banner_tiers: Vec<BannerTier>,

    /// Fraction of ranged damage a mantlet-protected force ignores.
    #[serde(default = "default_mantlet_reduction")]
    pub mantlet_reduction: f64,

    /// Recovery rate contributed by each surviving healer.
    #[serde(default = "default_healer_rate_per_unit")]
    pub healer_rate_per_unit: f64,

    /// Upper bound on the recovery rate.
    #[serde(default = "default_healer_max_rate")]
    pub healer_max_rate: f64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            banner_tiers: default_banner_tiers(),
            mantlet_reduction: default_mantlet_reduction(),
            healer_rate_per_unit: default_healer_rate_per_unit(),
            healer_max_rate: default_healer_max_rate(),
        }
    }
}

/// Loot limits applied after vault and hiding-place protection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlunderConfig {
    /// Fraction of the available amount that can be taken.
    #[serde(default)]
    pub diminishing_factor: Option<f64>,

    /// Absolute per-resource cap.
    #[serde(default)]
    pub cap_per_resource: Option<u64>,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_one() -> f64 {
    1.0
}

const fn default_overstack_threshold() -> u64 {
    30_000
}

const fn default_overstack_penalty_rate() -> f64 {
    0.5
}

const fn default_overstack_min_multiplier() -> f64 {
    0.5
}

const fn default_wall_low_growth() -> f64 {
    1.037
}

const fn default_wall_high_growth() -> f64 {
    1.05
}

const fn default_wall_breakpoint() -> u32 {
    10
}

const fn default_night_end_hour() -> u32 {
    8
}

const fn default_night_defense_factor() -> f64 {
    2.0
}

const fn default_luck_min() -> f64 {
    -0.25
}

const fn default_luck_max() -> f64 {
    0.25
}

fn default_banner_tiers() -> Vec<BannerTier> {
    vec![
        BannerTier {
            min_units: 1,
            multiplier: 1.15,
        },
        BannerTier {
            min_units: 5,
            multiplier: 1.20,
        },
        BannerTier {
            min_units: 10,
            multiplier: 1.25,
        },
    ]
}

const fn default_mantlet_reduction() -> f64 {
    0.4
}

const fn default_healer_rate_per_unit() -> f64 {
    0.05
}

const fn default_healer_max_rate() -> f64 {
    0.15
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CombatConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.overstack.enabled);
        assert_eq!(config.wall.breakpoint, 10);
        assert_eq!(config.support.banner_tiers.len(), 3);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r"
luck:
  min: -0.1
environment:
  night:
    enabled: true
    start_hour: 22
    end_hour: 6
";
        let config: Result<CombatConfig, _> = serde_yml::from_str(yaml);
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert!((config.luck.min - -0.1).abs() < f64::EPSILON);
        assert!((config.luck.max - 0.25).abs() < f64::EPSILON);
        assert!(config.environment.night.enabled);
        assert_eq!(config.environment.night.start_hour, 22);
        assert!((config.environment.night.defense_factor - 2.0).abs() < f64::EPSILON);
        assert!(!config.environment.terrain.enabled);
    }

    #[test]
    fn inverted_luck_range_is_rejected() {
        let mut config = CombatConfig::default();
        config.luck.min = 0.3;
        assert!(matches!(
            config.validate(),
            Err(CombatError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_overstack_threshold_rejected_only_when_enabled() {
        let mut config = CombatConfig::default();
        config.overstack.threshold_population = 0;
        assert!(config.validate().is_err());
        config.overstack.enabled = false;
        assert!(config.validate().is_ok());
    }
}
