//! Enumeration types shared by every Bastion crate.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Unit classification
// ---------------------------------------------------------------------------

/// The combat class a unit fights as.
///
/// Defense values are split by the class of the attacking unit, and attack
/// bonuses are keyed by the class of the defending unit. Together these form
/// the rock-paper-scissors matchups of the combat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CombatClass {
    /// Foot soldiers.
    Infantry,
    /// Mounted units.
    Cavalry,
    /// Bow and crossbow units.
    Ranged,
}

impl CombatClass {
    /// All combat classes in canonical order.
    pub const ALL: [Self; 3] = [Self::Infantry, Self::Cavalry, Self::Ranged];
}

/// The battlefield role of a unit, independent of its combat class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum UnitRole {
    /// Regular fighting unit.
    Line,
    /// Intelligence unit.
    Scout,
    /// Rams and catapults. Never carries loot.
    Siege,
    /// Nobles. Reduce allegiance and never carry loot.
    Conquest,
    /// Non-fighting support unit with a [`SupportEffect`].
    Support,
}

/// Special effect granted by a support unit's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SupportEffect {
    /// Tiered defense aura for the defending force.
    Banner,
    /// Shields a force that also contains siege units from ranged damage.
    Mantlet,
    /// Recovers a share of lost units after battle.
    Healer,
}

/// Which siege weapon a unit is, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SiegeWeapon {
    /// Damages the wall.
    Ram,
    /// Damages a targeted building.
    Catapult,
}

// ---------------------------------------------------------------------------
// Commands and outcomes
// ---------------------------------------------------------------------------

/// The type tag of a troop-movement command.
///
/// Declaration order is the tie-break priority used by the scheduler:
/// support arrives before an attack scheduled for the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Reinforce the target village.
    Support,
    /// Attack the target village.
    Attack,
}

impl CommandKind {
    /// Sort priority; lower resolves first.
    pub const fn priority(self) -> u8 {
        match self {
            Self::Support => 0,
            Self::Attack => 1,
        }
    }
}

/// Binary outcome of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum BattleWinner {
    /// The attacker's modified power met or exceeded the defender's.
    AttackerWin,
    /// The defender held the village.
    DefenderHold,
}

/// Why an allegiance reduction did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum AllegianceBlock {
    /// The village is in its post-capture cooldown (`ERR_CONQUEST_COOLDOWN`).
    ConquestCooldown,
    /// The attacker did not win the battle.
    AttackerLost,
    /// No noble survived the battle.
    NoNoblePresent,
}

impl AllegianceBlock {
    /// Stable reason code for reports.
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConquestCooldown => "ERR_CONQUEST_COOLDOWN",
            Self::AttackerLost => "attacker_lost",
            Self::NoNoblePresent => "no_noble_present",
        }
    }
}

/// Phase of a village's conquest state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ConquestPhase {
    /// No window active; allegiance regenerates normally.
    Stable,
    /// Anti-snipe floor active and regeneration paused.
    AntiSnipe,
    /// Recently captured; further allegiance reduction is blocked.
    CapturedCooldown,
}

// ---------------------------------------------------------------------------
// Resources and buildings
// ---------------------------------------------------------------------------

/// A lootable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Timber.
    Wood,
    /// Clay.
    Clay,
    /// Iron.
    Iron,
}

impl Resource {
    /// All resources in canonical (distribution) order.
    pub const ALL: [Self; 3] = [Self::Wood, Self::Clay, Self::Iron];
}

/// A village building that catapults can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Building {
    /// Village headquarters.
    Headquarters,
    /// Infantry production.
    Barracks,
    /// Cavalry production.
    Stable,
    /// Siege production.
    Workshop,
    /// Noble production.
    Academy,
    /// Unit research.
    Smithy,
    /// Troop assembly point.
    RallyPoint,
    /// Trade.
    Market,
    /// Wood production.
    TimberCamp,
    /// Clay production.
    ClayPit,
    /// Iron production.
    IronMine,
    /// Population capacity.
    Farm,
    /// Resource storage.
    Warehouse,
    /// Hidden resource storage.
    HidingPlace,
    /// Defensive wall. Catapults aimed here reduce the wall level.
    Wall,
}
