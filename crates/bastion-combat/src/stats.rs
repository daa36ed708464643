//! Unit stat lookup and the standard unit table.
//!
//! Combat math never hardcodes unit numbers; every value comes through a
//! [`UnitStatSource`]. The standard table below is what a world uses when
//! its configuration does not override anything.

use std::collections::BTreeMap;

use bastion_types::{
    ArmyComposition, ClassWeights, CombatClass, DefenseValues, SiegeWeapon, SupportEffect,
    UnitRole, UnitStats, UnitType,
};

use crate::error::CombatError;

/// Lookup of static unit stats by unit-type id.
pub trait UnitStatSource {
    /// Stats for a unit type, or `None` if the table does not know it.
    fn unit_stats(&self, unit: &str) -> Option<&UnitStats>;

    /// Stats for a unit type, failing on unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::UnknownUnit`] when the id is not in the table.
    fn require(&self, unit: &UnitType) -> Result<&UnitStats, CombatError> {
        self.unit_stats(unit.as_str())
            .ok_or_else(|| CombatError::UnknownUnit(unit.clone()))
    }
}

impl UnitStatSource for BTreeMap<UnitType, UnitStats> {
    fn unit_stats(&self, unit: &str) -> Option<&UnitStats> {
        self.get(unit)
    }
}

/// Total population cost of a composition.
///
/// # Errors
///
/// Returns [`CombatError::UnknownUnit`] for unit types missing from `stats`.
pub fn total_population(
    units: &ArmyComposition,
    stats: &impl UnitStatSource,
) -> Result<u64, CombatError> {
    let mut total: u64 = 0;
    for (unit, count) in units.iter() {
        let unit_stats = stats.require(unit)?;
        total = total.saturating_add(u64::from(count).saturating_mul(u64::from(unit_stats.population)));
    }
    Ok(total)
}

/// Number of units in `units` whose stats satisfy `predicate`.
///
/// Unknown unit types are not counted.
pub fn count_matching(
    units: &ArmyComposition,
    stats: &impl UnitStatSource,
    predicate: impl Fn(&UnitStats) -> bool,
) -> u64 {
    units
        .iter()
        .filter(|(unit, _)| stats.unit_stats(unit.as_str()).is_some_and(&predicate))
        .map(|(_, count)| u64::from(count))
        .sum()
}

/// Shorthand for building a table entry.
#[allow(clippy::too_many_arguments)]
const fn unit(
    attack: u32,
    defense: (u32, u32, u32),
    speed: f64,
    carry: u32,
    population: u32,
    class: CombatClass,
    role: UnitRole,
    bonus_vs: ClassWeights,
) -> UnitStats {
    UnitStats {
        attack,
        defense: DefenseValues {
            infantry: defense.0,
            cavalry: defense.1,
            ranged: defense.2,
        },
        speed,
        carry,
        population,
        class,
        role,
        bonus_vs,
        support_effect: None,
        siege_weapon: None,
    }
}

const fn bonus(infantry: f64, cavalry: f64, ranged: f64) -> ClassWeights {
    ClassWeights {
        infantry,
        cavalry,
        ranged,
    }
}

/// The standard unit table.
///
/// Light cavalry rides down ranged units, mounted archers outshoot
/// infantry, and spear-armed infantry holds against cavalry.
pub fn standard_unit_table() -> BTreeMap<UnitType, UnitStats> {
    use CombatClass::{Cavalry, Infantry, Ranged};
    use UnitRole::{Conquest, Line, Scout, Siege, Support};

    let n = ClassWeights::NEUTRAL;
    let mut table = BTreeMap::new();
    let mut put = |id: &str, stats: UnitStats| {
        table.insert(UnitType::from(id), stats);
    };

    put("spear", unit(10, (15, 45, 20), 18.0, 25, 1, Infantry, Line, bonus(1.0, 1.2, 1.0)));
    put("sword", unit(25, (50, 15, 40), 22.0, 15, 1, Infantry, Line, n));
    put("axe", unit(40, (10, 5, 10), 18.0, 10, 1, Infantry, Line, n));
    put("archer", unit(15, (50, 40, 5), 18.0, 10, 1, Ranged, Line, bonus(1.1, 1.0, 1.0)));
    put("spy", unit(0, (2, 1, 2), 9.0, 0, 2, Cavalry, Scout, n));
    put("light", unit(130, (30, 40, 30), 10.0, 80, 4, Cavalry, Line, bonus(1.0, 1.0, 1.2)));
    put("marcher", unit(120, (40, 30, 50), 10.0, 50, 5, Ranged, Line, bonus(1.2, 1.0, 1.0)));
    put("heavy", unit(150, (200, 80, 180), 11.0, 50, 6, Cavalry, Line, bonus(1.0, 1.0, 1.1)));
    put("knight", unit(150, (250, 400, 150), 10.0, 100, 10, Cavalry, Line, n));
    put("snob", unit(30, (100, 50, 100), 35.0, 0, 100, Infantry, Conquest, n));

    let mut ram = unit(2, (20, 50, 20), 30.0, 0, 5, Infantry, Siege, n);
    ram.siege_weapon = Some(SiegeWeapon::Ram);
    put("ram", ram);

    let mut catapult = unit(100, (100, 50, 100), 30.0, 0, 8, Infantry, Siege, n);
    catapult.siege_weapon = Some(SiegeWeapon::Catapult);
    put("catapult", catapult);

    let mut banner = unit(0, (10, 10, 10), 18.0, 0, 2, Infantry, Support, n);
    banner.support_effect = Some(SupportEffect::Banner);
    put("banner", banner);

    let mut mantlet = unit(0, (40, 40, 40), 30.0, 0, 4, Infantry, Support, n);
    mantlet.support_effect = Some(SupportEffect::Mantlet);
    put("mantlet", mantlet);

    let mut healer = unit(0, (5, 5, 5), 18.0, 0, 2, Infantry, Support, n);
    healer.support_effect = Some(SupportEffect::Healer);
    put("healer", healer);

    table
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_marks_special_units() {
        let table = standard_unit_table();
        assert_eq!(table.len(), 15);
        assert_eq!(
            table.unit_stats("ram").and_then(|s| s.siege_weapon),
            Some(SiegeWeapon::Ram)
        );
        assert_eq!(
            table.unit_stats("healer").and_then(|s| s.support_effect),
            Some(SupportEffect::Healer)
        );
        assert_eq!(table.unit_stats("snob").map(|s| s.role), Some(UnitRole::Conquest));
    }

    #[test]
    fn population_sums_counts_times_cost() {
        let table = standard_unit_table();
        let army = ArmyComposition::new().with("axe", 100).with("light", 10).with("snob", 1);
        assert_eq!(total_population(&army, &table).unwrap(), 100 + 40 + 100);
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let table = standard_unit_table();
        let army = ArmyComposition::new().with("dragon", 1);
        assert!(matches!(
            total_population(&army, &table),
            Err(CombatError::UnknownUnit(_))
        ));
    }

    #[test]
    fn count_matching_ignores_unknown_units() {
        let table = standard_unit_table();
        let army = ArmyComposition::new().with("ram", 3).with("catapult", 2).with("dragon", 9);
        let siege = count_matching(&army, &table, |s| s.role == UnitRole::Siege);
        assert_eq!(siege, 5);
    }
}
