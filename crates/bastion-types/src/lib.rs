//! Shared type definitions for the Bastion battle resolution engine.
//!
//! Every other crate in the workspace builds on these types. Report-facing
//! types derive `ts-rs` bindings so battle reports can be rendered by a
//! TypeScript client without hand-maintained mirrors.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for villages, players, commands, worlds
//! - [`enums`] -- Unit classes and roles, command kinds, outcomes, resources
//! - [`army`] -- [`ArmyComposition`] and the [`UnitStats`] record
//! - [`structs`] -- Resources, commands, and the [`BattleResult`] record

pub mod army;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use army::{ArmyComposition, ClassShares, ClassWeights, DefenseValues, UnitStats, UnitType};
pub use enums::{
    AllegianceBlock, BattleWinner, Building, CombatClass, CommandKind, ConquestPhase, Resource,
    SiegeWeapon, SupportEffect, UnitRole,
};
pub use ids::{CommandId, PlayerId, VillageId};
pub use structs::{
    AllegianceOutcome, BattleResult, Command, ModifierStage, Resources, SideOutcome, StageRecord,
};
