//! Core value types: resources, commands, and the battle result record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::army::ArmyComposition;
use crate::enums::{AllegianceBlock, BattleWinner, Building, CommandKind, Resource};
use crate::ids::{CommandId, PlayerId, VillageId};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Amounts of each lootable resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Resources {
    /// Wood amount.
    pub wood: u64,
    /// Clay amount.
    pub clay: u64,
    /// Iron amount.
    pub iron: u64,
}

impl Resources {
    /// Construct from the three amounts.
    pub const fn new(wood: u64, clay: u64, iron: u64) -> Self {
        Self { wood, clay, iron }
    }

    /// Build by evaluating `f` for every resource.
    pub fn from_fn(mut f: impl FnMut(Resource) -> u64) -> Self {
        Self {
            wood: f(Resource::Wood),
            clay: f(Resource::Clay),
            iron: f(Resource::Iron),
        }
    }

    /// Amount of one resource.
    pub const fn get(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Clay => self.clay,
            Resource::Iron => self.iron,
        }
    }

    /// Set the amount of one resource.
    pub const fn set(&mut self, resource: Resource, amount: u64) {
        match resource {
            Resource::Wood => self.wood = amount,
            Resource::Clay => self.clay = amount,
            Resource::Iron => self.iron = amount,
        }
    }

    /// Sum of all resources.
    pub const fn total(&self) -> u64 {
        self.wood.saturating_add(self.clay).saturating_add(self.iron)
    }

    /// Per-resource saturating subtraction.
    #[must_use]
    pub fn saturating_sub(&self, other: &Self) -> Self {
        Self::from_fn(|r| self.get(r).saturating_sub(other.get(r)))
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A scheduled troop movement.
///
/// Created at submission and consumed once resolved. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Command {
    /// Unique command id.
    pub id: CommandId,
    /// Arrival time at the target, unix seconds.
    pub arrival: i64,
    /// Monotonic submission sequence number (tie-break).
    pub sequence: u64,
    /// Attack or support.
    pub kind: CommandKind,
    /// Village the troops were sent from.
    pub origin: VillageId,
    /// Village the troops arrive at.
    pub target: VillageId,
    /// Player who issued the command.
    pub player: PlayerId,
    /// Attacker's player points at submission, used for morale.
    #[serde(default)]
    pub attacker_points: u64,
    /// Building the catapults aim at, if any.
    #[serde(default)]
    pub catapult_target: Option<Building>,
    /// The travelling army.
    pub units: ArmyComposition,
}

// ---------------------------------------------------------------------------
// Battle results
// ---------------------------------------------------------------------------

/// Named stage of the combat modifier pipeline.
///
/// Declaration order is the default application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ModifierStage {
    /// Defense penalty for an overstacked village.
    Overstack,
    /// Defense bonus from the wall.
    Wall,
    /// Defense bonus from banner support units.
    BannerAura,
    /// Defense bonus for battles during the night window.
    Night,
    /// Terrain factors for both sides.
    Terrain,
    /// Weather factors for both sides.
    Weather,
    /// Offense scaling by relative player size.
    Morale,
    /// Random offense scaling.
    Luck,
}

/// Audit record of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StageRecord {
    /// The stage applied.
    pub stage: ModifierStage,
    /// Multiplier applied to offense (1 when untouched).
    pub offense_multiplier: f64,
    /// Multiplier applied to defense (1 when untouched).
    pub defense_multiplier: f64,
    /// Offense after this stage.
    pub offense_after: f64,
    /// Defense after this stage.
    pub defense_after: f64,
}

/// Per-unit-type ledger of one side of a battle.
///
/// For every unit type, `losses + survivors == original`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SideOutcome {
    /// Units that entered the battle.
    pub original: ArmyComposition,
    /// Units alive after the battle (including recovered units).
    pub survivors: ArmyComposition,
    /// Units lost for good.
    pub losses: ArmyComposition,
    /// Units restored by healers; already counted in `survivors`.
    pub recovered: ArmyComposition,
}

impl SideOutcome {
    /// `true` if `losses + survivors == original` for every unit type.
    pub fn is_conserved(&self) -> bool {
        self.original.iter().all(|(unit, count)| {
            let lost = u64::from(self.losses.get(unit.as_str()));
            let alive = u64::from(self.survivors.get(unit.as_str()));
            lost.saturating_add(alive) == u64::from(count)
        })
    }
}

/// Allegiance change caused by a battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AllegianceOutcome {
    /// Allegiance before the battle.
    pub before: f64,
    /// Allegiance after the battle (post-capture value when captured).
    pub after: f64,
    /// Reduction caused by nobles, before any capture reset.
    pub delta: f64,
    /// Why the reduction was suppressed, if it was.
    pub blocked: Option<AllegianceBlock>,
}

/// Outcome of resolving one attack command. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BattleResult {
    /// The resolved command.
    pub command_id: CommandId,
    /// The attacked village.
    pub village_id: VillageId,
    /// Attacking player.
    pub attacker: PlayerId,
    /// Owner of the village at battle time.
    pub defender: Option<PlayerId>,
    /// Battle timestamp, unix seconds.
    pub fought_at: i64,
    /// Attacker unit ledger.
    pub attacker_side: SideOutcome,
    /// Merged defender (garrison plus support) unit ledger.
    pub defender_side: SideOutcome,
    /// Who won.
    pub winner: BattleWinner,
    /// Final offense divided by final defense.
    pub ratio: f64,
    /// Offense after all modifiers.
    pub offense: f64,
    /// Defense after all modifiers.
    pub defense: f64,
    /// Every pipeline stage, in application order.
    pub modifiers: Vec<StageRecord>,
    /// Wall level before the battle.
    pub wall_before: u32,
    /// Wall level after siege damage.
    pub wall_after: u32,
    /// Building levels changed by catapults: `(before, after)`.
    pub building_damage: BTreeMap<Building, (u32, u32)>,
    /// Allegiance change.
    pub allegiance: AllegianceOutcome,
    /// Whether the village changed hands.
    pub captured: bool,
    /// Resources taken.
    pub loot: Resources,
    /// Whether the attack was below the fake-attack population threshold.
    pub fake: bool,
}
