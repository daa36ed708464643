//! Configuration, command scheduling and battle resolution for Bastion.
//!
//! This crate wires the pure combat and conquest crates into a running
//! world: it loads `bastion-config.yaml`, admits commands, resolves them
//! per village under a single-writer lock, and hands results to a report
//! sink.
//!
//! # Modules
//!
//! - [`catalog`] -- [`UnitCatalog`]: standard unit table plus overrides
//! - [`config`] -- [`WorldConfig`] loading and validation
//! - [`ports`] -- [`VillageStore`] and [`ReportSink`] seams with in-memory
//!   implementations
//! - [`registry`] -- [`VillageRegistry`], one async mutex per village
//! - [`resolver`] -- [`resolve_battle`] and [`apply_support`]
//! - [`rng`] -- Seeded or entropy RNG per command
//! - [`scheduler`] -- Ordering, validation and rate limiting
//! - [`tick`] -- [`TickDriver`], parallel per-village resolution
//! - [`village`] -- [`VillageCombatState`]
//!
//! [`UnitCatalog`]: catalog::UnitCatalog
//! [`WorldConfig`]: config::WorldConfig
//! [`VillageStore`]: ports::VillageStore
//! [`ReportSink`]: ports::ReportSink
//! [`VillageRegistry`]: registry::VillageRegistry
//! [`resolve_battle`]: resolver::resolve_battle
//! [`apply_support`]: resolver::apply_support
//! [`TickDriver`]: tick::TickDriver
//! [`VillageCombatState`]: village::VillageCombatState

pub mod catalog;
pub mod config;
pub mod ports;
pub mod registry;
pub mod resolver;
pub mod rng;
pub mod scheduler;
pub mod tick;
pub mod village;
