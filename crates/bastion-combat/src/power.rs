//! Offensive and defensive power of army compositions.
//!
//! Power is class-weighted: an attacker's value depends on what it is
//! fighting (via `bonus_vs` multipliers), and a defender's value depends on
//! which classes are attacking (via per-class defense values). Both weights
//! come from the opposing side's [`ClassShares`].

use bastion_types::{ArmyComposition, BattleWinner, ClassShares, CombatClass};

use crate::error::CombatError;
use crate::stats::UnitStatSource;

/// Smallest defense value used as a divisor.
pub const DEFENSE_EPSILON: f64 = 1e-6;

/// Per-unit-type sum of a village garrison and its stationed support.
pub fn merge_defending_forces(
    garrison: &ArmyComposition,
    support: &ArmyComposition,
) -> ArmyComposition {
    garrison.merged(support)
}

/// Fraction of the composition's unit count in each combat class.
///
/// An empty composition yields all-zero shares.
///
/// # Errors
///
/// Returns [`CombatError::UnknownUnit`] for unit types missing from `stats`.
#[allow(clippy::cast_precision_loss)]
pub fn get_class_shares(
    composition: &ArmyComposition,
    stats: &impl UnitStatSource,
) -> Result<ClassShares, CombatError> {
    let mut counts = [0u64; 3];
    let mut total: u64 = 0;
    for (unit, count) in composition.iter() {
        let unit_stats = stats.require(unit)?;
        let slot = class_index(unit_stats.class);
        if let Some(c) = counts.get_mut(slot) {
            *c = c.saturating_add(u64::from(count));
        }
        total = total.saturating_add(u64::from(count));
    }

    if total == 0 {
        return Ok(ClassShares::ZERO);
    }

    let share = |slot: usize| counts.get(slot).copied().unwrap_or(0) as f64 / total as f64;
    Ok(ClassShares {
        infantry: share(0),
        cavalry: share(1),
        ranged: share(2),
    })
}

const fn class_index(class: CombatClass) -> usize {
    match class {
        CombatClass::Infantry => 0,
        CombatClass::Cavalry => 1,
        CombatClass::Ranged => 2,
    }
}

/// Offensive power of `attackers` against a defender with `defender_shares`.
///
/// Each unit type contributes `count * attack * weight`, where `weight` is
/// the defender's class mix applied to the unit's `bonus_vs` multipliers
/// (1 against an empty defence). Ranged attackers are scaled down by
/// `ranged_reduction`, the defender's mantlet protection.
///
/// # Errors
///
/// Returns [`CombatError::UnknownUnit`] for unit types missing from `stats`.
pub fn calculate_offensive_power(
    attackers: &ArmyComposition,
    defender_shares: &ClassShares,
    stats: &impl UnitStatSource,
    ranged_reduction: f64,
) -> Result<f64, CombatError> {
    let has_defenders = defender_shares.sum() > 0.0;
    let mut power = 0.0;
    for (unit, count) in attackers.iter() {
        let unit_stats = stats.require(unit)?;
        let weight = if has_defenders {
            CombatClass::ALL
                .iter()
                .map(|&class| defender_shares.get(class) * unit_stats.bonus_vs.get(class))
                .sum()
        } else {
            1.0
        };
        let mut value = f64::from(count) * f64::from(unit_stats.attack) * weight;
        if unit_stats.class == CombatClass::Ranged {
            value *= 1.0 - ranged_reduction;
        }
        power += value;
    }
    Ok(power.max(0.0))
}

/// Defensive power of `defenders` against `attacker_composition`.
///
/// Each unit type contributes `count * sum(share_c * defense_c)` over the
/// attacker's class shares. Against an empty attacking force the mean of
/// the three defense values is used. Ranged defenders are scaled down by
/// `ranged_reduction`, the attacker's mantlet protection.
///
/// # Errors
///
/// Returns [`CombatError::UnknownUnit`] for unit types missing from `stats`.
pub fn calculate_defensive_power(
    defenders: &ArmyComposition,
    attacker_composition: &ArmyComposition,
    stats: &impl UnitStatSource,
    ranged_reduction: f64,
) -> Result<f64, CombatError> {
    let shares = get_class_shares(attacker_composition, stats)?;
    let has_attackers = shares.sum() > 0.0;
    let mut power = 0.0;
    for (unit, count) in defenders.iter() {
        let unit_stats = stats.require(unit)?;
        let per_unit: f64 = if has_attackers {
            CombatClass::ALL
                .iter()
                .map(|&class| shares.get(class) * f64::from(unit_stats.defense.against(class)))
                .sum()
        } else {
            CombatClass::ALL
                .iter()
                .map(|&class| f64::from(unit_stats.defense.against(class)))
                .sum::<f64>()
                / 3.0
        };
        let mut value = f64::from(count) * per_unit;
        if unit_stats.class == CombatClass::Ranged {
            value *= 1.0 - ranged_reduction;
        }
        power += value;
    }
    Ok(power.max(0.0))
}

/// Offense divided by defense, with defense floored at [`DEFENSE_EPSILON`].
pub fn power_ratio(offense: f64, defense: f64) -> f64 {
    offense.max(0.0) / defense.max(DEFENSE_EPSILON)
}

/// `AttackerWin` when `ratio >= 1`, otherwise `DefenderHold`.
pub fn determine_winner(ratio: f64) -> BattleWinner {
    if ratio >= 1.0 {
        BattleWinner::AttackerWin
    } else {
        BattleWinner::DefenderHold
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::stats::standard_unit_table;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn class_shares_sum_to_one() {
        let table = standard_unit_table();
        let army = ArmyComposition::new().with("axe", 50).with("light", 30).with("marcher", 20);
        let shares = get_class_shares(&army, &table).unwrap();
        assert!(close(shares.infantry, 0.5));
        assert!(close(shares.cavalry, 0.3));
        assert!(close(shares.ranged, 0.2));
        assert!(close(shares.sum(), 1.0));
    }

    #[test]
    fn empty_army_has_zero_shares_and_power() {
        let table = standard_unit_table();
        let empty = ArmyComposition::new();
        assert_eq!(get_class_shares(&empty, &table).unwrap(), ClassShares::ZERO);
        let offense = calculate_offensive_power(&empty, &ClassShares::ZERO, &table, 0.0).unwrap();
        assert!(close(offense, 0.0));
    }

    #[test]
    fn offense_uses_bonus_against_defender_mix() {
        let table = standard_unit_table();
        let lights = ArmyComposition::new().with("light", 10);
        let all_ranged = ClassShares {
            infantry: 0.0,
            cavalry: 0.0,
            ranged: 1.0,
        };
        let offense = calculate_offensive_power(&lights, &all_ranged, &table, 0.0).unwrap();
        assert!(close(offense, 10.0 * 130.0 * 1.2));

        let all_infantry = ClassShares {
            infantry: 1.0,
            cavalry: 0.0,
            ranged: 0.0,
        };
        let offense = calculate_offensive_power(&lights, &all_infantry, &table, 0.0).unwrap();
        assert!(close(offense, 1300.0));
    }

    #[test]
    fn defense_weights_by_attacker_classes() {
        let table = standard_unit_table();
        let spears = ArmyComposition::new().with("spear", 100);
        let axes = ArmyComposition::new().with("axe", 100);
        let lights = ArmyComposition::new().with("light", 100);
        let vs_infantry = calculate_defensive_power(&spears, &axes, &table, 0.0).unwrap();
        let vs_cavalry = calculate_defensive_power(&spears, &lights, &table, 0.0).unwrap();
        assert!(close(vs_infantry, 1500.0));
        assert!(close(vs_cavalry, 4500.0));
    }

    #[test]
    fn defense_against_nothing_uses_mean_values() {
        let table = standard_unit_table();
        let spears = ArmyComposition::new().with("spear", 3);
        let defense =
            calculate_defensive_power(&spears, &ArmyComposition::new(), &table, 0.0).unwrap();
        assert!(close(defense, 3.0 * (15.0 + 45.0 + 20.0) / 3.0));
    }

    #[test]
    fn ranged_reduction_scales_only_ranged_units() {
        let table = standard_unit_table();
        let mixed = ArmyComposition::new().with("axe", 10).with("marcher", 10);
        let shares = ClassShares {
            infantry: 1.0,
            cavalry: 0.0,
            ranged: 0.0,
        };
        let full = calculate_offensive_power(&mixed, &shares, &table, 0.0).unwrap();
        let reduced = calculate_offensive_power(&mixed, &shares, &table, 0.4).unwrap();
        let marcher = 10.0 * 120.0 * 1.2;
        assert!(close(full - reduced, marcher * 0.4));
    }

    #[test]
    fn ratio_floors_defense() {
        assert!(power_ratio(10.0, 0.0).is_finite());
        assert!(power_ratio(10.0, 0.0) > 1.0);
        assert!(close(power_ratio(0.0, 0.0), 0.0));
    }

    #[test]
    fn winner_threshold_is_inclusive() {
        assert_eq!(determine_winner(1.0), BattleWinner::AttackerWin);
        assert_eq!(determine_winner(0.999), BattleWinner::DefenderHold);
        assert_eq!(determine_winner(0.0), BattleWinner::DefenderHold);
    }

    #[test]
    fn merge_passes_through_one_sided_types() {
        let garrison = ArmyComposition::new().with("spear", 10);
        let support = ArmyComposition::new().with("heavy", 4);
        let merged = merge_defending_forces(&garrison, &support);
        assert_eq!(merged.get("spear"), 10);
        assert_eq!(merged.get("heavy"), 4);
    }
}
