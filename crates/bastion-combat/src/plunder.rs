//! Lootable resources and their distribution under carry capacity.
//!
//! Protection first: each resource keeps the larger of the hiding-place
//! amount and the vault percentage. What is left may be further limited by
//! a diminishing factor and a per-resource cap. The winning army then
//! carries away as much as it can, split as evenly as the stockpile allows.

use bastion_types::{ArmyComposition, Resource, Resources};

use crate::error::CombatError;
use crate::stats::UnitStatSource;

/// Per-resource breakdown of a village stockpile before looting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootAssessment {
    /// Amount shielded by the hiding place or vault.
    pub protected: Resources,
    /// Amount above the protected floor.
    pub available: Resources,
    /// Amount the attacker may take.
    pub lootable: Resources,
}

/// Compute protected, available and lootable amounts for each resource.
///
/// `protected = max(hidden, ceil(amount * vault_percent / 100))`,
/// `available = amount - protected` (never negative), and
/// `lootable = min(floor(available * diminishing), cap)`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn calculate_available_loot(
    resources: &Resources,
    hidden_per_resource: u64,
    vault_percent: f64,
    cap: Option<u64>,
    diminishing_factor: Option<f64>,
) -> LootAssessment {
    let vault = vault_percent.clamp(0.0, 100.0);

    let protected = Resources::from_fn(|r| {
        let amount = resources.get(r);
        let vaulted = (amount as f64 * vault / 100.0).ceil() as u64;
        hidden_per_resource.max(vaulted)
    });
    let available = resources.saturating_sub(&protected);
    let lootable = Resources::from_fn(|r| {
        let mut amount = available.get(r);
        if let Some(factor) = diminishing_factor {
            let scaled = (amount as f64 * factor.clamp(0.0, 1.0)).floor() as u64;
            amount = scaled.min(amount);
        }
        if let Some(limit) = cap {
            amount = amount.min(limit);
        }
        amount
    });

    LootAssessment {
        protected,
        available,
        lootable,
    }
}

/// Split `carry_capacity` across resources without exceeding any lootable amount.
///
/// Water-filling: resources are visited from the smallest lootable amount
/// up (ties in canonical order), each taking at most an even share of the
/// capacity still remaining. The last resource visited absorbs rounding.
/// The result depends only on the inputs.
pub fn distribute_plunder(lootable: &Resources, carry_capacity: u64) -> Resources {
    if lootable.total() <= carry_capacity {
        return *lootable;
    }

    let mut order: Vec<Resource> = Resource::ALL.to_vec();
    order.sort_by_key(|&r| lootable.get(r));

    let mut taken = Resources::default();
    let mut remaining = carry_capacity;
    let mut slots = order.len();

    for &resource in &order {
        let share = remaining
            .checked_div(u64::try_from(slots).unwrap_or(1))
            .unwrap_or(0);
        let take = lootable.get(resource).min(share);
        taken.set(resource, take);
        remaining = remaining.saturating_sub(take);
        slots = slots.saturating_sub(1);
    }

    taken
}

/// Total loot an army can carry. Siege and conquest units carry nothing.
///
/// # Errors
///
/// Returns [`CombatError::UnknownUnit`] for unit types missing from `stats`.
pub fn calculate_carry_capacity(
    units: &ArmyComposition,
    stats: &impl UnitStatSource,
) -> Result<u64, CombatError> {
    let mut total: u64 = 0;
    for (unit, count) in units.iter() {
        let carry = stats.require(unit)?.effective_carry();
        total = total.saturating_add(u64::from(count).saturating_mul(u64::from(carry)));
    }
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::stats::standard_unit_table;

    #[test]
    fn protection_takes_the_larger_of_hidden_and_vault() {
        let stock = Resources::new(1000, 100, 0);
        let assessment = calculate_available_loot(&stock, 150, 20.0, None, None);
        assert_eq!(assessment.protected.wood, 200);
        assert_eq!(assessment.protected.clay, 150);
        assert_eq!(assessment.protected.iron, 150);
        assert_eq!(assessment.available, Resources::new(800, 0, 0));
        assert_eq!(assessment.lootable, Resources::new(800, 0, 0));
    }

    #[test]
    fn vault_rounds_up() {
        let stock = Resources::new(101, 0, 0);
        let assessment = calculate_available_loot(&stock, 0, 10.0, None, None);
        assert_eq!(assessment.protected.wood, 11);
        assert_eq!(assessment.lootable.wood, 90);
    }

    #[test]
    fn lootable_plus_protected_never_exceeds_total() {
        let stock = Resources::new(12_345, 678, 9);
        for vault in [0.0, 7.5, 33.0, 99.0] {
            for hidden in [0, 10, 700] {
                let a = calculate_available_loot(&stock, hidden, vault, None, None);
                for r in Resource::ALL {
                    if a.protected.get(r) < stock.get(r) {
                        assert!(a.lootable.get(r) + a.protected.get(r) <= stock.get(r));
                    } else {
                        assert_eq!(a.lootable.get(r), 0);
                    }
                }
            }
        }
    }

    #[test]
    fn diminishing_factor_and_cap_reduce_lootable() {
        let stock = Resources::new(1000, 1000, 1000);
        let a = calculate_available_loot(&stock, 0, 0.0, Some(300), Some(0.5));
        assert_eq!(a.available, Resources::new(1000, 1000, 1000));
        assert_eq!(a.lootable, Resources::new(300, 300, 300));
        let b = calculate_available_loot(&stock, 0, 0.0, None, Some(0.25));
        assert_eq!(b.lootable, Resources::new(250, 250, 250));
    }

    #[test]
    fn everything_fits_when_capacity_allows() {
        let lootable = Resources::new(10, 20, 30);
        assert_eq!(distribute_plunder(&lootable, 1000), lootable);
    }

    #[test]
    fn distribution_respects_capacity_and_per_resource_limits() {
        let lootable = Resources::new(100, 5000, 5000);
        let taken = distribute_plunder(&lootable, 1000);
        assert_eq!(taken.total(), 1000);
        assert_eq!(taken.wood, 100);
        assert_eq!(taken.clay, 450);
        assert_eq!(taken.iron, 450);
    }

    #[test]
    fn rounding_remainder_goes_to_last_visited_resource() {
        let lootable = Resources::new(500, 500, 500);
        let taken = distribute_plunder(&lootable, 100);
        assert_eq!(taken, Resources::new(33, 33, 34));
    }

    #[test]
    fn distribution_is_deterministic() {
        let lootable = Resources::new(777, 31, 4096);
        let first = distribute_plunder(&lootable, 999);
        for _ in 0..50 {
            assert_eq!(distribute_plunder(&lootable, 999), first);
        }
        assert!(first.total() <= 999);
    }

    #[test]
    fn zero_capacity_takes_nothing() {
        let lootable = Resources::new(10, 10, 10);
        assert_eq!(distribute_plunder(&lootable, 0), Resources::default());
    }

    #[test]
    fn carry_capacity_skips_siege_and_nobles() {
        let table = standard_unit_table();
        let army = ArmyComposition::new()
            .with("axe", 100)
            .with("light", 10)
            .with("ram", 5)
            .with("snob", 1);
        assert_eq!(calculate_carry_capacity(&army, &table).unwrap(), 100 * 10 + 10 * 80);
    }
}
