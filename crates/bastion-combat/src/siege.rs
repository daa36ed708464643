//! Wall and building damage from siege units.
//!
//! Rams knock down wall levels, catapults knock down the targeted
//! building. The number of siege units needed per level grows with the
//! level and shrinks with world speed.

use std::collections::BTreeMap;

use bastion_types::{ArmyComposition, Building, SiegeWeapon};

use crate::config::WallConfig;
use crate::modifiers::wall_multiplier;
use crate::stats::{UnitStatSource, count_matching};

/// Wall multiplier under the standard growth rates.
///
/// The defense bonus and siege damage share this curve.
pub fn calculate_wall_multiplier(level: u32) -> f64 {
    wall_multiplier(level, &WallConfig::default())
}

/// Units needed to drop one level: `max(1, ceil(base / speed))`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn units_per_level(base: f64, world_speed: f64) -> u64 {
    let speed = if world_speed.is_finite() && world_speed > 0.0 {
        world_speed
    } else {
        1.0
    };
    ((base / speed).ceil() as u64).max(1)
}

/// Rams needed per wall level: `max(1, ceil((2 + level * 0.5) / speed))`.
pub fn rams_per_level(wall_level: u32, world_speed: f64) -> u64 {
    units_per_level(2.0 + f64::from(wall_level) * 0.5, world_speed)
}

/// Catapults needed per building level: `max(1, ceil((8 + level * 2) / speed))`.
pub fn catapults_per_level(building_level: u32, world_speed: f64) -> u64 {
    units_per_level(8.0 + f64::from(building_level) * 2.0, world_speed)
}

/// Wall level after a ram strike. Zero rams leave the wall untouched.
pub fn apply_ram_damage(wall_level: u32, ram_count: u64, world_speed: f64) -> u32 {
    if ram_count == 0 {
        return wall_level;
    }
    let drop = ram_count / rams_per_level(wall_level, world_speed);
    let drop = u32::try_from(drop).unwrap_or(u32::MAX);
    wall_level.saturating_sub(drop)
}

/// Building level after a catapult strike. Only a winning attack does damage.
pub fn apply_catapult_damage(
    building_level: u32,
    catapult_count: u64,
    world_speed: f64,
    attacker_won: bool,
) -> u32 {
    if !attacker_won || catapult_count == 0 {
        return building_level;
    }
    let drop = catapult_count / catapults_per_level(building_level, world_speed);
    let drop = u32::try_from(drop).unwrap_or(u32::MAX);
    building_level.saturating_sub(drop)
}

/// Wall and building levels after siege.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiegeOutcome {
    /// Wall level before siege.
    pub wall_before: u32,
    /// Wall level after rams (and catapults aimed at the wall).
    pub wall_after: u32,
    /// Changed buildings: `(before, after)`.
    pub building_damage: BTreeMap<Building, (u32, u32)>,
}

/// The attacking army around a battle.
#[derive(Debug, Clone, Copy)]
pub struct SiegeForce<'a> {
    /// Army as it arrived.
    pub sent: &'a ArmyComposition,
    /// Army after casualties.
    pub survivors: &'a ArmyComposition,
}

/// Apply the attacker's siege weapons to the village.
///
/// Rams strike the wall as they arrived, whatever the outcome. Surviving
/// catapults strike `catapult_target` when the attacker won; a wall target
/// takes the hit after the rams.
pub fn resolve_siege(
    force: SiegeForce<'_>,
    stats: &impl UnitStatSource,
    wall_level: u32,
    buildings: &BTreeMap<Building, u32>,
    catapult_target: Option<Building>,
    world_speed: f64,
    attacker_won: bool,
) -> SiegeOutcome {
    let rams = count_matching(force.sent, stats, |s| {
        s.siege_weapon == Some(SiegeWeapon::Ram)
    });
    let catapults = count_matching(force.survivors, stats, |s| {
        s.siege_weapon == Some(SiegeWeapon::Catapult)
    });

    let mut wall_after = apply_ram_damage(wall_level, rams, world_speed);
    let mut building_damage = BTreeMap::new();

    match catapult_target {
        Some(Building::Wall) => {
            wall_after = apply_catapult_damage(wall_after, catapults, world_speed, attacker_won);
        }
        Some(target) => {
            let before = buildings.get(&target).copied().unwrap_or(0);
            let after = apply_catapult_damage(before, catapults, world_speed, attacker_won);
            if after != before {
                building_damage.insert(target, (before, after));
            }
        }
        None => {}
    }

    SiegeOutcome {
        wall_before: wall_level,
        wall_after,
        building_damage,
    }
}
