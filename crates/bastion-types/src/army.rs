//! Army compositions and the per-unit stat record they resolve against.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CombatClass, SiegeWeapon, SupportEffect, UnitRole};

/// Identifier of a unit type (e.g. `"axe"`, `"snob"`).
///
/// Resolved to [`UnitStats`] through the unit stat table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitType(pub String);

impl UnitType {
    /// Create a unit type identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UnitType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitType {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl core::fmt::Display for UnitType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from unit type to a non-negative count.
///
/// Backed by a [`BTreeMap`] so iteration order, and with it every sum and
/// report built from a composition, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ArmyComposition(pub BTreeMap<UnitType, u32>);

impl ArmyComposition {
    /// Create an empty composition.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert, replacing any existing count for `unit`.
    #[must_use]
    pub fn with(mut self, unit: &str, count: u32) -> Self {
        self.set(unit, count);
        self
    }

    /// Count for a unit type (zero when absent).
    pub fn get(&self, unit: &str) -> u32 {
        self.0.get(unit).copied().unwrap_or(0)
    }

    /// Set the count for a unit type.
    pub fn set(&mut self, unit: &str, count: u32) {
        self.0.insert(UnitType::from(unit), count);
    }

    /// Add `count` units of a type, saturating at `u32::MAX`.
    pub fn add(&mut self, unit: &UnitType, count: u32) {
        let entry = self.0.entry(unit.clone()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Iterate `(unit type, count)` pairs in unit-type order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitType, u32)> {
        self.0.iter().map(|(unit, &count)| (unit, count))
    }

    /// Total number of units across all types.
    pub fn total_units(&self) -> u64 {
        self.0.values().map(|&c| u64::from(c)).sum()
    }

    /// `true` if the composition holds no units (zero-count entries are ignored).
    pub fn is_empty(&self) -> bool {
        self.total_units() == 0
    }

    /// Per-type sum of two compositions.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (unit, count) in other.iter() {
            out.add(unit, count);
        }
        out
    }

    /// Copy of this composition with zero-count entries dropped.
    #[must_use]
    pub fn without_empty(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|&(_, &count)| count > 0)
                .map(|(unit, &count)| (unit.clone(), count))
                .collect(),
        )
    }
}

impl FromIterator<(UnitType, u32)> for ArmyComposition {
    fn from_iter<I: IntoIterator<Item = (UnitType, u32)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (unit, count) in iter {
            out.add(&unit, count);
        }
        out
    }
}

/// Defense values of a unit against each attacking combat class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DefenseValues {
    /// Defense against infantry.
    pub infantry: u32,
    /// Defense against cavalry.
    pub cavalry: u32,
    /// Defense against ranged units.
    pub ranged: u32,
}

impl DefenseValues {
    /// Defense against the given attacking class.
    pub const fn against(&self, class: CombatClass) -> u32 {
        match class {
            CombatClass::Infantry => self.infantry,
            CombatClass::Cavalry => self.cavalry,
            CombatClass::Ranged => self.ranged,
        }
    }
}

/// Per-class multipliers, used both for attack bonuses and class shares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClassWeights {
    /// Weight for infantry.
    pub infantry: f64,
    /// Weight for cavalry.
    pub cavalry: f64,
    /// Weight for ranged.
    pub ranged: f64,
}

impl ClassWeights {
    /// All weights equal to 1 (no class bonus).
    pub const NEUTRAL: Self = Self {
        infantry: 1.0,
        cavalry: 1.0,
        ranged: 1.0,
    };

    /// All weights zero.
    pub const ZERO: Self = Self {
        infantry: 0.0,
        cavalry: 0.0,
        ranged: 0.0,
    };

    /// Weight for a class.
    pub const fn get(&self, class: CombatClass) -> f64 {
        match class {
            CombatClass::Infantry => self.infantry,
            CombatClass::Cavalry => self.cavalry,
            CombatClass::Ranged => self.ranged,
        }
    }

    /// Mutable weight for a class.
    pub const fn get_mut(&mut self, class: CombatClass) -> &mut f64 {
        match class {
            CombatClass::Infantry => &mut self.infantry,
            CombatClass::Cavalry => &mut self.cavalry,
            CombatClass::Ranged => &mut self.ranged,
        }
    }

    /// Sum of the three weights.
    pub fn sum(&self) -> f64 {
        self.infantry + self.cavalry + self.ranged
    }
}

impl Default for ClassWeights {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Fraction of an army's unit count in each combat class.
///
/// Shares sum to 1 for a non-empty army and are all zero for an empty one.
pub type ClassShares = ClassWeights;

/// Static stats of one unit type, as supplied by the unit stat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitStats {
    /// Attack value per unit.
    pub attack: u32,
    /// Defense values per attacking class.
    pub defense: DefenseValues,
    /// Minutes per field at world speed 1.
    pub speed: f64,
    /// Resources one unit can carry.
    pub carry: u32,
    /// Population (farm) cost per unit.
    pub population: u32,
    /// Class the unit attacks as.
    pub class: CombatClass,
    /// Battlefield role.
    pub role: UnitRole,
    /// Attack multiplier against defenders of each class.
    #[serde(default)]
    pub bonus_vs: ClassWeights,
    /// Support effect granted by this unit, if any.
    #[serde(default)]
    pub support_effect: Option<SupportEffect>,
    /// Siege weapon kind, if any.
    #[serde(default)]
    pub siege_weapon: Option<SiegeWeapon>,
}

impl UnitStats {
    /// Carry capacity that counts towards plunder.
    ///
    /// Siege and conquest units never carry loot regardless of the table value.
    pub const fn effective_carry(&self) -> u32 {
        match self.role {
            UnitRole::Siege | UnitRole::Conquest => 0,
            UnitRole::Line | UnitRole::Scout | UnitRole::Support => self.carry,
        }
    }
}
