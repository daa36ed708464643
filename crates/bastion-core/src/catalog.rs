//! The unit stat table a world resolves battles against.

use std::collections::BTreeMap;

use bastion_combat::UnitStatSource;
use bastion_combat::stats::standard_unit_table;
use bastion_types::{UnitStats, UnitType};

use crate::config::WorldConfig;

/// Unit stats for one world: the standard table plus configured overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCatalog {
    units: BTreeMap<UnitType, UnitStats>,
}

impl UnitCatalog {
    /// The standard unit table.
    pub fn standard() -> Self {
        Self {
            units: standard_unit_table(),
        }
    }

    /// Standard table with `overrides` replacing or adding entries.
    pub fn with_overrides(overrides: &BTreeMap<UnitType, UnitStats>) -> Self {
        let mut units = standard_unit_table();
        for (unit, stats) in overrides {
            units.insert(unit.clone(), stats.clone());
        }
        Self { units }
    }

    /// Catalog described by a world configuration.
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::with_overrides(&config.units)
    }

    /// Number of unit types known.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl UnitStatSource for UnitCatalog {
    fn unit_stats(&self, unit: &str) -> Option<&UnitStats> {
        self.units.get(unit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use bastion_types::{ClassWeights, CombatClass, DefenseValues, UnitRole};

    use super::*;

    #[test]
    fn overrides_replace_standard_entries() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            UnitType::from("axe"),
            UnitStats {
                attack: 45,
                defense: DefenseValues {
                    infantry: 10,
                    cavalry: 5,
                    ranged: 10,
                },
                speed: 18.0,
                carry: 10,
                population: 1,
                class: CombatClass::Infantry,
                role: UnitRole::Line,
                bonus_vs: ClassWeights::NEUTRAL,
                support_effect: None,
                siege_weapon: None,
            },
        );
        let catalog = UnitCatalog::with_overrides(&overrides);
        assert_eq!(catalog.unit_stats("axe").map(|s| s.attack), Some(45));
        assert_eq!(catalog.unit_stats("spear").map(|s| s.attack), Some(10));
        assert_eq!(catalog.len(), UnitCatalog::standard().len());
    }

    #[test]
    fn unknown_units_are_absent() {
        assert!(UnitCatalog::standard().unit_stats("dragon").is_none());
    }
}
