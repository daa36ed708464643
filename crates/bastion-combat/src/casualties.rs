//! Casualties from the power ratio.
//!
//! The losing side is destroyed entirely. The winning side suffers
//! proportional attrition: `1 / ratio^1.5` of each unit type when the
//! attacker wins, `ratio^1.5` when the defender holds. Losses round up, so
//! a winner always pays at least one unit per type unless the other side
//! was empty.

use bastion_types::{ArmyComposition, BattleWinner, SideOutcome};

use crate::power::determine_winner;

/// Exponent of the attrition curve.
pub const ATTRITION_EXPONENT: f64 = 1.5;

/// Casualties of both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct CasualtyReport {
    /// Winner implied by the ratio.
    pub winner: BattleWinner,
    /// Fraction of each unit type the winner lost.
    pub winner_loss_factor: f64,
    /// Attacker ledger.
    pub attacker: SideOutcome,
    /// Defender ledger.
    pub defender: SideOutcome,
}

/// Loss factor of the winning side for a given ratio.
pub fn winner_loss_factor(ratio: f64) -> f64 {
    let factor = match determine_winner(ratio) {
        BattleWinner::AttackerWin => 1.0 / ratio.powf(ATTRITION_EXPONENT),
        BattleWinner::DefenderHold => ratio.max(0.0).powf(ATTRITION_EXPONENT),
    };
    if factor.is_nan() {
        1.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Compute survivors and losses of both sides for the given ratio.
pub fn calculate_casualties(
    ratio: f64,
    attackers: &ArmyComposition,
    defenders: &ArmyComposition,
) -> CasualtyReport {
    let winner = determine_winner(ratio);
    let factor = winner_loss_factor(ratio);

    let (attacker, defender) = match winner {
        BattleWinner::AttackerWin => (apply_attrition(attackers, factor), wipe_out(defenders)),
        BattleWinner::DefenderHold => (wipe_out(attackers), apply_attrition(defenders, factor)),
    };

    CasualtyReport {
        winner,
        winner_loss_factor: factor,
        attacker,
        defender,
    }
}

/// Lose `ceil(count * factor)` of each unit type, never more than `count`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_attrition(army: &ArmyComposition, factor: f64) -> SideOutcome {
    let mut survivors = ArmyComposition::new();
    let mut losses = ArmyComposition::new();
    for (unit, count) in army.iter() {
        let raw = (f64::from(count) * factor).ceil().clamp(0.0, f64::from(count));
        let lost = (raw as u32).min(count);
        losses.set(unit.as_str(), lost);
        survivors.set(unit.as_str(), count.saturating_sub(lost));
    }
    SideOutcome {
        original: army.clone(),
        survivors,
        losses,
        recovered: ArmyComposition::new(),
    }
}

/// Every unit lost.
pub fn wipe_out(army: &ArmyComposition) -> SideOutcome {
    let mut survivors = ArmyComposition::new();
    for (unit, _) in army.iter() {
        survivors.set(unit.as_str(), 0);
    }
    SideOutcome {
        original: army.clone(),
        survivors,
        losses: army.clone(),
        recovered: ArmyComposition::new(),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;

    fn expected_survivors(count: u32, factor: f64) -> u32 {
        let lost = (f64::from(count) * factor).ceil();
        count.saturating_sub(lost as u32)
    }

    #[test]
    fn attacker_win_wipes_defender_and_attrits_attacker() {
        let attackers = ArmyComposition::new().with("axe", 100).with("light", 37);
        let defenders = ArmyComposition::new().with("spear", 80).with("sword", 15);
        let ratio = 2.0;
        let report = calculate_casualties(ratio, &attackers, &defenders);

        assert_eq!(report.winner, BattleWinner::AttackerWin);
        assert_eq!(report.defender.survivors.get("spear"), 0);
        assert_eq!(report.defender.survivors.get("sword"), 0);
        assert_eq!(report.defender.losses.get("spear"), 80);
        assert_eq!(report.defender.losses.get("sword"), 15);

        let factor = 1.0 / 2.0_f64.powf(1.5);
        assert_eq!(report.attacker.survivors.get("axe"), expected_survivors(100, factor));
        assert_eq!(report.attacker.survivors.get("light"), expected_survivors(37, factor));
        assert_eq!(report.attacker.survivors.get("axe"), 64);
        assert!(report.attacker.is_conserved());
        assert!(report.defender.is_conserved());
    }

    #[test]
    fn defender_hold_wipes_attacker_and_attrits_defender() {
        let attackers = ArmyComposition::new().with("axe", 40);
        let defenders = ArmyComposition::new().with("spear", 100);
        let ratio = 0.5;
        let report = calculate_casualties(ratio, &attackers, &defenders);

        assert_eq!(report.winner, BattleWinner::DefenderHold);
        assert_eq!(report.attacker.survivors.get("axe"), 0);
        assert_eq!(report.attacker.losses.get("axe"), 40);

        let factor = 0.5_f64.powf(1.5);
        assert_eq!(report.defender.survivors.get("spear"), expected_survivors(100, factor));
        assert_eq!(report.defender.survivors.get("spear"), 64);
        assert!(report.attacker.is_conserved());
        assert!(report.defender.is_conserved());
    }

    #[test]
    fn exact_tie_goes_to_attacker_with_total_losses() {
        let attackers = ArmyComposition::new().with("axe", 10);
        let defenders = ArmyComposition::new().with("spear", 10);
        let report = calculate_casualties(1.0, &attackers, &defenders);
        assert_eq!(report.winner, BattleWinner::AttackerWin);
        assert_eq!(report.attacker.survivors.get("axe"), 0);
        assert_eq!(report.defender.survivors.get("spear"), 0);
    }

    #[test]
    fn empty_defence_still_costs_one_unit_per_type() {
        let attackers = ArmyComposition::new().with("axe", 100).with("light", 3);
        let ratio = crate::power::power_ratio(4_000.0, 0.0);
        let report = calculate_casualties(ratio, &attackers, &ArmyComposition::new());

        let factor = 1.0 / ratio.powf(1.5);
        assert_eq!(report.attacker.survivors.get("axe"), expected_survivors(100, factor));
        assert_eq!(report.attacker.survivors.get("axe"), 99);
        assert_eq!(report.attacker.losses.get("light"), 1);
        assert!(report.attacker.is_conserved());
    }

    #[test]
    fn empty_attack_is_a_hold_without_defender_losses() {
        let defenders = ArmyComposition::new().with("spear", 10);
        let report = calculate_casualties(0.0, &ArmyComposition::new(), &defenders);
        assert_eq!(report.winner, BattleWinner::DefenderHold);
        assert_eq!(report.defender.survivors.get("spear"), 10);
    }

    #[test]
    fn conservation_holds_across_ratios() {
        let attackers = ArmyComposition::new().with("axe", 997).with("light", 13).with("ram", 1);
        let defenders = ArmyComposition::new().with("spear", 311).with("archer", 7);
        for step in 1..=60 {
            let ratio = f64::from(step) * 0.05;
            let report = calculate_casualties(ratio, &attackers, &defenders);
            assert!(report.attacker.is_conserved(), "attacker at ratio {ratio}");
            assert!(report.defender.is_conserved(), "defender at ratio {ratio}");
        }
    }

    #[test]
    fn loss_factor_is_bounded() {
        assert!((winner_loss_factor(4.0) - 0.125).abs() < 1e-12);
        assert!((winner_loss_factor(0.25) - 0.125).abs() < 1e-12);
        assert!(winner_loss_factor(f64::INFINITY).abs() < f64::EPSILON);
    }
}
