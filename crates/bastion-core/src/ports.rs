//! Seams to the systems around the engine: village persistence and report
//! delivery.
//!
//! Resolution never performs I/O itself. The tick driver loads villages
//! through a [`VillageStore`] before resolving and saves them afterwards,
//! and hands every outcome to a [`ReportSink`].

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use bastion_types::{BattleResult, VillageId};
use tracing::info;

use crate::resolver::Reinforcement;
use crate::village::VillageCombatState;

/// Errors from a village store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No state is stored for the village.
    #[error("village {0} not found")]
    NotFound(VillageId),

    /// The backing store failed.
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// Persistence of village combat state.
pub trait VillageStore: Send + Sync {
    /// Load a village.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown villages.
    fn load(&self, id: VillageId) -> Result<VillageCombatState, StoreError>;

    /// Persist a village, replacing any stored state.
    fn save(&self, state: &VillageCombatState) -> Result<(), StoreError>;
}

/// A [`VillageStore`] backed by a map in memory.
#[derive(Debug, Default)]
pub struct InMemoryVillageStore {
    villages: Mutex<BTreeMap<VillageId, VillageCombatState>>,
}

impl InMemoryVillageStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given villages.
    pub fn with_villages(villages: impl IntoIterator<Item = VillageCombatState>) -> Self {
        Self {
            villages: Mutex::new(villages.into_iter().map(|v| (v.id, v)).collect()),
        }
    }

    /// Copies of every stored village, in id order.
    pub fn all(&self) -> Vec<VillageCombatState> {
        self.villages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl VillageStore for InMemoryVillageStore {
    fn load(&self, id: VillageId) -> Result<VillageCombatState, StoreError> {
        self.villages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn save(&self, state: &VillageCombatState) -> Result<(), StoreError> {
        self.villages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state.id, state.clone());
        Ok(())
    }
}

/// One resolved command, as delivered to players.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleReport {
    /// An attack was fought.
    Battle(Box<BattleResult>),
    /// Support arrived and was stationed.
    Reinforcement(Reinforcement),
}

/// Consumer of resolved commands.
pub trait ReportSink: Send + Sync {
    /// Deliver one report.
    fn emit(&self, report: BattleReport);
}

/// Keeps every report in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    reports: Mutex<Vec<BattleReport>>,
}

impl CollectingReportSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of the reports received so far.
    pub fn reports(&self) -> Vec<BattleReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Battle results received so far.
    pub fn battles(&self) -> Vec<BattleResult> {
        self.reports()
            .into_iter()
            .filter_map(|report| match report {
                BattleReport::Battle(result) => Some(*result),
                BattleReport::Reinforcement(_) => None,
            })
            .collect()
    }
}

impl ReportSink for CollectingReportSink {
    fn emit(&self, report: BattleReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}

/// Logs a one-line summary of each report.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn emit(&self, report: BattleReport) {
        match report {
            BattleReport::Battle(result) => info!(
                command_id = %result.command_id,
                village_id = %result.village_id,
                winner = ?result.winner,
                ratio = result.ratio,
                captured = result.captured,
                fake = result.fake,
                "Battle report"
            ),
            BattleReport::Reinforcement(r) => info!(
                command_id = %r.command_id,
                village_id = %r.village_id,
                units = r.units.total_units(),
                "Reinforcement report"
            ),
        }
    }
}
