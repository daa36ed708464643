//! The combat modifier pipeline.
//!
//! Base offense and defense pass through an ordered list of named stages.
//! Each stage multiplies one or both sides and feeds its output to the
//! next; the order changes the audit trail and must match the default
//! order exactly:
//!
//! | # | Stage        | Side    |
//! |---|--------------|---------|
//! | 1 | `Overstack`  | defense |
//! | 2 | `Wall`       | defense |
//! | 3 | `BannerAura` | defense |
//! | 4 | `Night`      | defense |
//! | 5 | `Terrain`    | both    |
//! | 6 | `Weather`    | both    |
//! | 7 | `Morale`     | offense |
//! | 8 | `Luck`       | offense |
//!
//! The pipeline is pure: luck is sampled beforehand with [`sample_luck`]
//! and passed in through [`ModifierContext`].

use bastion_types::{ModifierStage, StageRecord};
use chrono::{DateTime, Timelike};
use rand::Rng;

use crate::config::{CombatConfig, LuckConfig, NightConfig, OverstackConfig, SideFactors, WallConfig};

/// Lower morale bound.
pub const MORALE_MIN: f64 = 0.5;

/// Upper morale bound.
pub const MORALE_MAX: f64 = 1.5;

/// Constant term of the morale formula.
const MORALE_BASE: f64 = 0.3;

/// Battle-specific inputs to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierContext {
    /// Total population of the merged defending force.
    pub defender_population: u64,
    /// Wall level at battle time.
    pub wall_level: u32,
    /// Banner aura multiplier of the defenders (1 without banners).
    pub banner_multiplier: f64,
    /// Local hour of the battle, if known.
    pub battle_hour: Option<u32>,
    /// Attacking player's points.
    pub attacker_points: u64,
    /// Defending player's points.
    pub defender_points: u64,
    /// Pre-sampled luck offset.
    pub luck: f64,
}

/// Final values and audit trail of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// Offense after every stage.
    pub offense: f64,
    /// Defense after every stage.
    pub defense: f64,
    /// One record per stage, in application order.
    pub records: Vec<StageRecord>,
}

/// An ordered list of modifier stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierPipeline {
    stages: Vec<ModifierStage>,
}

impl Default for ModifierPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl ModifierPipeline {
    /// The standard stage order.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                ModifierStage::Overstack,
                ModifierStage::Wall,
                ModifierStage::BannerAura,
                ModifierStage::Night,
                ModifierStage::Terrain,
                ModifierStage::Weather,
                ModifierStage::Morale,
                ModifierStage::Luck,
            ],
        }
    }

    /// A pipeline with a custom stage list.
    pub const fn with_stages(stages: Vec<ModifierStage>) -> Self {
        Self { stages }
    }

    /// Stages in application order.
    pub fn stages(&self) -> &[ModifierStage] {
        &self.stages
    }

    /// Run every stage over the base values.
    pub fn apply(
        &self,
        base_offense: f64,
        base_defense: f64,
        ctx: &ModifierContext,
        config: &CombatConfig,
    ) -> PipelineOutcome {
        let mut offense = base_offense;
        let mut defense = base_defense;
        let mut records = Vec::with_capacity(self.stages.len());

        for &stage in &self.stages {
            let (offense_multiplier, defense_multiplier) = stage_multipliers(stage, ctx, config);
            offense *= offense_multiplier;
            defense *= defense_multiplier;
            records.push(StageRecord {
                stage,
                offense_multiplier,
                defense_multiplier,
                offense_after: offense,
                defense_after: defense,
            });
        }

        PipelineOutcome {
            offense,
            defense,
            records,
        }
    }
}

/// `(offense, defense)` multipliers of a single stage.
pub fn stage_multipliers(
    stage: ModifierStage,
    ctx: &ModifierContext,
    config: &CombatConfig,
) -> (f64, f64) {
    match stage {
        ModifierStage::Overstack => (
            1.0,
            overstack_multiplier(ctx.defender_population, &config.overstack),
        ),
        ModifierStage::Wall => (1.0, wall_multiplier(ctx.wall_level, &config.wall)),
        ModifierStage::BannerAura => (1.0, ctx.banner_multiplier),
        ModifierStage::Night => (
            1.0,
            night_multiplier(ctx.battle_hour, &config.environment.night),
        ),
        ModifierStage::Terrain => side_factors(&config.environment.terrain),
        ModifierStage::Weather => side_factors(&config.environment.weather),
        ModifierStage::Morale => {
            if config.morale.enabled {
                (morale(ctx.defender_points, ctx.attacker_points), 1.0)
            } else {
                (1.0, 1.0)
            }
        }
        ModifierStage::Luck => (luck_multiplier(ctx.luck), 1.0),
    }
}

/// Overstack defense multiplier.
///
/// `max(min_multiplier, 1 - penalty_rate * excess)` with
/// `excess = max(0, (population - threshold) / threshold)`.
#[allow(clippy::cast_precision_loss)]
pub fn overstack_multiplier(defender_population: u64, config: &OverstackConfig) -> f64 {
    if !config.enabled || config.threshold_population == 0 {
        return 1.0;
    }
    let threshold = config.threshold_population as f64;
    let excess = ((defender_population as f64 - threshold) / threshold).max(0.0);
    (1.0 - config.penalty_rate * excess)
        .max(config.min_multiplier)
        .min(1.0)
}

/// Wall defense multiplier for a level.
///
/// Up to the breakpoint: `low_growth^level`; above it:
/// `low_growth^breakpoint * high_growth^(level - breakpoint)`.
pub fn wall_multiplier(level: u32, config: &WallConfig) -> f64 {
    if level <= config.breakpoint {
        config.low_growth.powf(f64::from(level))
    } else {
        config.low_growth.powf(f64::from(config.breakpoint))
            * config
                .high_growth
                .powf(f64::from(level.saturating_sub(config.breakpoint)))
    }
}

/// Whether an hour falls in the (possibly wrapping) night window.
pub const fn is_night(hour: u32, config: &NightConfig) -> bool {
    let (start, end) = (config.start_hour, config.end_hour);
    if start < end {
        hour >= start && hour < end
    } else if start > end {
        hour >= start || hour < end
    } else {
        false
    }
}

/// Night defense multiplier; 1 when disabled, outside the window, or the hour is unknown.
pub fn night_multiplier(hour: Option<u32>, config: &NightConfig) -> f64 {
    match hour {
        Some(h) if config.enabled && is_night(h, config) => config.defense_factor,
        _ => 1.0,
    }
}

/// `(offense, defense)` factors of a toggleable environment modifier.
pub const fn side_factors(config: &SideFactors) -> (f64, f64) {
    if config.enabled {
        (config.offense_factor, config.defense_factor)
    } else {
        (1.0, 1.0)
    }
}

/// Morale: `clamp(0.3 + defender_points / attacker_points, 0.5, 1.5)`.
///
/// Zero attacker points are treated as one point.
#[allow(clippy::cast_precision_loss)]
pub fn morale(defender_points: u64, attacker_points: u64) -> f64 {
    let attacker = attacker_points.max(1) as f64;
    (MORALE_BASE + defender_points as f64 / attacker).clamp(MORALE_MIN, MORALE_MAX)
}

/// Draw a luck offset uniformly from `[min, max]`.
pub fn sample_luck(rng: &mut impl Rng, config: &LuckConfig) -> f64 {
    if config.max > config.min {
        rng.random_range(config.min..=config.max)
    } else {
        config.min
    }
}

/// Offense multiplier for a luck offset.
pub fn luck_multiplier(luck: f64) -> f64 {
    (1.0 + luck).max(0.0)
}

/// Local hour of a unix timestamp in a world with the given UTC offset.
pub fn battle_hour(timestamp: i64, utc_offset_hours: i32) -> Option<u32> {
    let shifted = timestamp.checked_add(i64::from(utc_offset_hours).checked_mul(3600)?)?;
    DateTime::from_timestamp(shifted, 0).map(|dt| dt.hour())
}
