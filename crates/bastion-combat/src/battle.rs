//! One engagement: support effects, modifier pipeline, power, casualties.
//!
//! This is the pure core of battle resolution. Siege, conquest and plunder
//! consume its [`EngagementOutcome`] afterwards.

use bastion_types::{ArmyComposition, BattleWinner, SideOutcome, StageRecord};
use tracing::debug;

use crate::casualties::calculate_casualties;
use crate::config::CombatConfig;
use crate::error::CombatError;
use crate::modifiers::{ModifierContext, ModifierPipeline, battle_hour};
use crate::power::{
    calculate_defensive_power, calculate_offensive_power, get_class_shares, power_ratio,
};
use crate::stats::{UnitStatSource, total_population};
use crate::support::{BannerAura, apply_healer_recovery, banner_aura, mantlet_protection};

/// Inputs to a single engagement.
#[derive(Debug, Clone, Copy)]
pub struct EngagementInput<'a> {
    /// The attacking army.
    pub attackers: &'a ArmyComposition,
    /// Garrison and stationed support, already merged.
    pub defenders: &'a ArmyComposition,
    /// Wall level at battle time.
    pub wall_level: u32,
    /// Battle timestamp, unix seconds.
    pub fought_at: i64,
    /// Attacking player's points.
    pub attacker_points: u64,
    /// Defending player's points.
    pub defender_points: u64,
    /// Pre-sampled luck offset.
    pub luck: f64,
}

/// Result of an engagement.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementOutcome {
    /// Who won.
    pub winner: BattleWinner,
    /// Final offense / final defense.
    pub ratio: f64,
    /// Offense before modifiers.
    pub base_offense: f64,
    /// Defense before modifiers.
    pub base_defense: f64,
    /// Offense after modifiers.
    pub offense: f64,
    /// Defense after modifiers.
    pub defense: f64,
    /// Pipeline audit trail.
    pub modifiers: Vec<StageRecord>,
    /// Banner aura of the defenders.
    pub banner: BannerAura,
    /// Attacker ledger after healing.
    pub attacker: SideOutcome,
    /// Defender ledger after healing.
    pub defender: SideOutcome,
}

/// Resolve one engagement.
///
/// # Errors
///
/// Returns [`CombatError::UnknownUnit`] if either army contains a unit type
/// missing from `stats`.
pub fn resolve_engagement(
    input: &EngagementInput<'_>,
    pipeline: &ModifierPipeline,
    config: &CombatConfig,
    stats: &impl UnitStatSource,
) -> Result<EngagementOutcome, CombatError> {
    let attacker_shares = get_class_shares(input.attackers, stats)?;
    let defender_shares = get_class_shares(input.defenders, stats)?;

    // Mantlets shield the force they travel with.
    let attacker_shield = mantlet_protection(input.attackers, stats, &config.support);
    let defender_shield = mantlet_protection(input.defenders, stats, &config.support);

    let base_offense =
        calculate_offensive_power(input.attackers, &defender_shares, stats, defender_shield)?;
    let base_defense =
        calculate_defensive_power(input.defenders, input.attackers, stats, attacker_shield)?;

    let banner = banner_aura(input.defenders, stats, &config.support);
    let ctx = ModifierContext {
        defender_population: total_population(input.defenders, stats)?,
        wall_level: input.wall_level,
        banner_multiplier: banner.multiplier,
        battle_hour: battle_hour(input.fought_at, config.environment.night.utc_offset_hours),
        attacker_points: input.attacker_points,
        defender_points: input.defender_points,
        luck: input.luck,
    };
    let modified = pipeline.apply(base_offense, base_defense, &ctx, config);

    let ratio = power_ratio(modified.offense, modified.defense);
    let mut casualties = calculate_casualties(ratio, input.attackers, input.defenders);
    apply_healer_recovery(&mut casualties.attacker, stats, &config.support);
    apply_healer_recovery(&mut casualties.defender, stats, &config.support);

    debug!(
        base_offense,
        base_defense,
        offense = modified.offense,
        defense = modified.defense,
        ratio,
        winner = ?casualties.winner,
        attacker_infantry_share = attacker_shares.infantry,
        banner_tier = banner.tier,
        "Engagement resolved"
    );

    Ok(EngagementOutcome {
        winner: casualties.winner,
        ratio,
        base_offense,
        base_defense,
        offense: modified.offense,
        defense: modified.defense,
        modifiers: modified.records,
        banner,
        attacker: casualties.attacker,
        defender: casualties.defender,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::stats::standard_unit_table;

    fn input<'a>(
        attackers: &'a ArmyComposition,
        defenders: &'a ArmyComposition,
    ) -> EngagementInput<'a> {
        EngagementInput {
            attackers,
            defenders,
            wall_level: 0,
            fought_at: 12 * 3600,
            attacker_points: 1000,
            defender_points: 700,
            luck: 0.0,
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn hundred_axes_against_hundred_spears() {
        let table = standard_unit_table();
        let axes = ArmyComposition::new().with("axe", 100);
        let spears = ArmyComposition::new().with("spear", 100);
        let config = CombatConfig::default();
        let outcome = resolve_engagement(
            &input(&axes, &spears),
            &ModifierPipeline::standard(),
            &config,
            &table,
        )
        .unwrap();

        // Base: 100 * 40 offense vs 100 * 15 defense, morale 1.0.
        assert!((outcome.base_offense - 4000.0).abs() < 1e-9);
        assert!((outcome.base_defense - 1500.0).abs() < 1e-9);
        assert!((outcome.ratio - 4000.0 / 1500.0).abs() < 1e-9);
        assert_eq!(outcome.winner, BattleWinner::AttackerWin);

        let factor = 1.0 / outcome.ratio.powf(1.5);
        let lost = (100.0 * factor).ceil() as u32;
        assert_eq!(outcome.attacker.survivors.get("axe"), 100 - lost);
        assert_eq!(outcome.defender.survivors.get("spear"), 0);
        assert_eq!(outcome.defender.losses.get("spear"), 100);
        assert!(outcome.attacker.is_conserved());
        assert!(outcome.defender.is_conserved());
    }

    #[test]
    fn banner_raises_defense_before_environment() {
        let table = standard_unit_table();
        let axes = ArmyComposition::new().with("axe", 100);
        let plain = ArmyComposition::new().with("spear", 100);
        let bannered = ArmyComposition::new().with("spear", 100).with("banner", 1);
        let config = CombatConfig::default();
        let pipeline = ModifierPipeline::standard();

        let a = resolve_engagement(&input(&axes, &plain), &pipeline, &config, &table).unwrap();
        let b = resolve_engagement(&input(&axes, &bannered), &pipeline, &config, &table).unwrap();
        assert_eq!(b.banner.tier, 1);
        assert!(b.defense >= a.defense * 1.15);
    }

    #[test]
    fn unknown_units_fail_the_engagement() {
        let table = standard_unit_table();
        let attackers = ArmyComposition::new().with("dragon", 1);
        let defenders = ArmyComposition::new();
        let result = resolve_engagement(
            &input(&attackers, &defenders),
            &ModifierPipeline::standard(),
            &CombatConfig::default(),
            &table,
        );
        assert!(matches!(result, Err(CombatError::UnknownUnit(_))));
    }

    #[test]
    fn empty_sides_are_a_defender_hold() {
        let table = standard_unit_table();
        let empty = ArmyComposition::new();
        let result = resolve_engagement(
            &input(&empty, &empty),
            &ModifierPipeline::standard(),
            &CombatConfig::default(),
            &table,
        )
        .unwrap();
        assert_eq!(result.winner, BattleWinner::DefenderHold);
    }
}
