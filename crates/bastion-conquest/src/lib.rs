//! Conquest and allegiance state machine for the Bastion engine.
//!
//! Each village carries an [`AllegianceState`]. Battles reduce it through
//! surviving nobles, a capture resets it and opens the cooldown and
//! anti-snipe windows, and passive regeneration restores it over time.
//!
//! # Modules
//!
//! - [`config`] -- [`ConquestConfig`]: drop range, regeneration, windows
//! - [`error`] -- [`ConquestError`]
//! - [`state`] -- [`AllegianceState`] and its transitions

pub mod config;
pub mod error;
pub mod state;

pub use config::{ConquestConfig, MAX_ALLEGIANCE};
pub use error::ConquestError;
pub use state::{AllegianceState, RegenBonuses, check_capture_conditions};
