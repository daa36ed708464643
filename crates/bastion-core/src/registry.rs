//! Per-village single-writer locking.
//!
//! Every read-modify-write of a village goes through the village's own
//! [`tokio::sync::Mutex`]. Different villages never contend with each
//! other; operations on one village are serialized.

use std::collections::BTreeMap;
use std::sync::Arc;

use bastion_conquest::ConquestConfig;
use bastion_types::VillageId;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::village::VillageCombatState;

/// Shared handle to one village's state.
pub type VillageHandle = Arc<Mutex<VillageCombatState>>;

/// Registry of live village states keyed by id.
#[derive(Debug, Default)]
pub struct VillageRegistry {
    villages: RwLock<BTreeMap<VillageId, VillageHandle>>,
}

impl VillageRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a village, returning its handle.
    pub async fn insert(&self, state: VillageCombatState) -> VillageHandle {
        let id = state.id;
        let handle = Arc::new(Mutex::new(state));
        self.villages.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    /// Register a village unless it already is, returning the live handle.
    ///
    /// The first registration wins; `state` is dropped when another caller
    /// got there first, so every caller shares one lock per village.
    pub async fn get_or_insert(&self, state: VillageCombatState) -> VillageHandle {
        let mut villages = self.villages.write().await;
        Arc::clone(
            villages
                .entry(state.id)
                .or_insert_with(|| Arc::new(Mutex::new(state))),
        )
    }

    /// Handle for a village, if registered.
    pub async fn get(&self, id: VillageId) -> Option<VillageHandle> {
        self.villages.read().await.get(&id).cloned()
    }

    /// Whether a village is registered.
    pub async fn contains(&self, id: VillageId) -> bool {
        self.villages.read().await.contains_key(&id)
    }

    /// Run `f` with exclusive access to a village.
    ///
    /// Returns `None` when the village is not registered.
    pub async fn with_village<T>(
        &self,
        id: VillageId,
        f: impl FnOnce(&mut VillageCombatState) -> T,
    ) -> Option<T> {
        let handle = self.get(id).await?;
        let mut state = handle.lock().await;
        Some(f(&mut state))
    }

    /// Clamp a proposed allegiance against a village's anti-snipe floor.
    pub async fn enforce_floor(&self, id: VillageId, proposed: f64, now: i64) -> Option<f64> {
        self.with_village(id, |v| v.allegiance.enforce_floor(proposed, now))
            .await
    }

    /// Bring every village's allegiance up to `now`.
    pub async fn regenerate_all(&self, now: i64, config: &ConquestConfig) {
        let handles: Vec<VillageHandle> = self.villages.read().await.values().cloned().collect();
        for handle in handles {
            let mut state = handle.lock().await;
            let bonuses = state.regen_bonuses;
            let allegiance = state.allegiance.regenerate_to(now, bonuses, config);
            debug!(village_id = %state.id, allegiance, "Allegiance regenerated");
        }
    }

    /// Copies of every village state, in id order.
    pub async fn snapshot(&self) -> Vec<VillageCombatState> {
        let handles: Vec<VillageHandle> = self.villages.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.lock().await.clone());
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_village_mutates_in_place() {
        let registry = VillageRegistry::new();
        let id = VillageId::new();
        registry.insert(VillageCombatState::new(id, None, 0)).await;

        let level = registry
            .with_village(id, |v| {
                v.wall_level = 3;
                v.wall_level
            })
            .await;
        assert_eq!(level, Some(3));
        assert!(registry.contains(id).await);
        assert!(registry.with_village(VillageId::new(), |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn get_or_insert_keeps_the_first_registration() {
        let registry = VillageRegistry::new();
        let id = VillageId::new();
        let mut first = VillageCombatState::new(id, None, 0);
        first.wall_level = 7;
        let a = registry.get_or_insert(first).await;
        let b = registry.get_or_insert(VillageCombatState::new(id, None, 0)).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.with_village(id, |v| v.wall_level).await, Some(7));
    }

    #[tokio::test]
    async fn concurrent_writers_are_serialized() {
        let registry = Arc::new(VillageRegistry::new());
        let id = VillageId::new();
        registry.insert(VillageCombatState::new(id, None, 0)).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..50 {
            let registry = Arc::clone(&registry);
            tasks.spawn(async move {
                registry
                    .with_village(id, |v| v.wall_level = v.wall_level.saturating_add(1))
                    .await;
            });
        }
        while tasks.join_next().await.is_some() {}

        let wall = registry.with_village(id, |v| v.wall_level).await;
        assert_eq!(wall, Some(50));
    }

    #[tokio::test]
    async fn floor_is_enforced_by_village_id() {
        let registry = VillageRegistry::new();
        let id = VillageId::new();
        let mut state = VillageCombatState::new(id, None, 0);
        state.allegiance.floor = 25.0;
        state.allegiance.anti_snipe_until = Some(100);
        registry.insert(state).await;

        let during = registry.enforce_floor(id, 10.0, 50).await;
        let after = registry.enforce_floor(id, 10.0, 100).await;
        assert!(during.is_some_and(|v| (v - 25.0).abs() < 1e-9));
        assert!(after.is_some_and(|v| (v - 10.0).abs() < 1e-9));
    }

    #[tokio::test]
    async fn regenerate_all_advances_every_village() {
        let registry = VillageRegistry::new();
        for _ in 0..3 {
            let mut state = VillageCombatState::new(VillageId::new(), None, 0);
            state.allegiance.allegiance = 10.0;
            registry.insert(state).await;
        }
        registry.regenerate_all(7_200, &ConquestConfig::default()).await;
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        assert!(
            snapshot
                .iter()
                .all(|v| (v.allegiance.allegiance - 12.0).abs() < 1e-9)
        );
    }
}
