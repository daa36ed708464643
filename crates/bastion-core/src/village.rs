//! Mutable combat state of one village.

use std::collections::BTreeMap;

use bastion_conquest::{AllegianceState, RegenBonuses};
use bastion_types::{ArmyComposition, Building, PlayerId, Resources, VillageId};
use serde::{Deserialize, Serialize};

/// Everything battle resolution reads from and writes to a village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillageCombatState {
    /// Village id.
    pub id: VillageId,
    /// Owning player; `None` for barbarian villages.
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Owner's player points, used for morale.
    #[serde(default)]
    pub owner_points: u64,
    /// Wall level.
    #[serde(default)]
    pub wall_level: u32,
    /// Levels of the other buildings.
    #[serde(default)]
    pub buildings: BTreeMap<Building, u32>,
    /// Troops owned by the village.
    #[serde(default)]
    pub garrison: ArmyComposition,
    /// Troops stationed here by other villages.
    #[serde(default)]
    pub support: ArmyComposition,
    /// Conquest state.
    pub allegiance: AllegianceState,
    /// Regeneration multipliers.
    #[serde(default)]
    pub regen_bonuses: RegenBonuses,
    /// Stockpile.
    #[serde(default)]
    pub resources: Resources,
    /// Amount of each resource the hiding place protects.
    #[serde(default)]
    pub hiding_place_capacity: u64,
    /// Percentage of each resource the vault protects.
    #[serde(default)]
    pub vault_percent: f64,
}

impl VillageCombatState {
    /// A fresh, empty village.
    pub fn new(id: VillageId, owner: Option<PlayerId>, now: i64) -> Self {
        Self {
            id,
            owner,
            owner_points: 0,
            wall_level: 0,
            buildings: BTreeMap::new(),
            garrison: ArmyComposition::new(),
            support: ArmyComposition::new(),
            allegiance: AllegianceState::new(now),
            regen_bonuses: RegenBonuses::default(),
            resources: Resources::default(),
            hiding_place_capacity: 0,
            vault_percent: 0.0,
        }
    }

    /// Garrison and stationed support as one defending force.
    pub fn defending_force(&self) -> ArmyComposition {
        bastion_combat::power::merge_defending_forces(&self.garrison, &self.support)
    }

    /// Level of a building; the wall is tracked separately.
    pub fn building_level(&self, building: Building) -> u32 {
        if building == Building::Wall {
            self.wall_level
        } else {
            self.buildings.get(&building).copied().unwrap_or(0)
        }
    }

    /// Split surviving defenders back into garrison and support.
    ///
    /// For each unit type the support share is
    /// `floor(survivors * support / (garrison + support))`; the garrison
    /// keeps the rest. The split is a pure function of its inputs.
    pub fn split_defender_survivors(&mut self, survivors: &ArmyComposition) {
        let mut garrison = ArmyComposition::new();
        let mut support = ArmyComposition::new();
        for (unit, alive) in survivors.iter() {
            let own = u64::from(self.garrison.get(unit.as_str()));
            let stationed = u64::from(self.support.get(unit.as_str()));
            let total = own.saturating_add(stationed);
            let support_alive = u64::from(alive)
                .saturating_mul(stationed)
                .checked_div(total)
                .unwrap_or(0);
            let support_alive = u32::try_from(support_alive).unwrap_or(alive).min(alive);
            garrison.set(unit.as_str(), alive.saturating_sub(support_alive));
            support.set(unit.as_str(), support_alive);
        }
        self.garrison = garrison.without_empty();
        self.support = support.without_empty();
    }

    /// Station a supporting army in the village.
    pub fn station_support(&mut self, units: &ArmyComposition) {
        self.support = self.support.merged(units).without_empty();
    }
}
