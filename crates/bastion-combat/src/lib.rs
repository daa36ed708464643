//! Combat mathematics for the Bastion battle resolution engine.
//!
//! Everything here is a pure function of its inputs. Randomness enters only
//! through a caller-supplied RNG ([`modifiers::sample_luck`]) so a seeded
//! resolution is reproducible.
//!
//! # Modules
//!
//! - [`battle`] -- [`resolve_engagement`], the power/modifier/casualty core
//! - [`casualties`] -- Winner attrition and loser wipe-out
//! - [`config`] -- [`CombatConfig`] and its per-concern sections
//! - [`error`] -- [`CombatError`]
//! - [`modifiers`] -- The ordered [`ModifierPipeline`] and stage formulas
//! - [`plunder`] -- Lootable stock and carry distribution
//! - [`power`] -- Class shares and offensive/defensive power
//! - [`siege`] -- Ram damage to walls, catapult damage to buildings
//! - [`stats`] -- [`UnitStatSource`] and the standard unit table
//! - [`support`] -- Banner aura, mantlet protection, healer recovery

pub mod battle;
pub mod casualties;
pub mod config;
pub mod error;
pub mod modifiers;
pub mod plunder;
pub mod power;
pub mod siege;
pub mod stats;
pub mod support;

pub use battle::{EngagementInput, EngagementOutcome, resolve_engagement};
pub use config::CombatConfig;
pub use error::CombatError;
pub use modifiers::{ModifierContext, ModifierPipeline};
pub use stats::UnitStatSource;
