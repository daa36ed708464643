//! The resolution tick: admit a batch of commands and resolve them.
//!
//! Each tick runs in four phases:
//!
//! 1. **Admission** -- sort, validate and rate-limit the batch.
//! 2. **Grouping** -- bucket admitted commands by target village, keeping
//!    resolution order inside each bucket.
//! 3. **Resolution** -- one task per village on a [`JoinSet`]. A task holds
//!    its village's lock for the whole queue, so villages resolve in
//!    parallel while each village sees its commands strictly in order.
//! 4. **Persist** -- every touched village is saved back to the store.
//!
//! A failing command is logged and counted; it never stops the rest of
//! the tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use bastion_types::{Command, CommandId, CommandKind, VillageId};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::ports::{BattleReport, ReportSink, StoreError, VillageStore};
use crate::registry::{VillageHandle, VillageRegistry};
use crate::resolver::{ResolveContext, apply_support, resolve_battle};
use crate::rng::command_rng;
use crate::scheduler::{RateLimiter, Rejection, admit_commands};

/// A command that was admitted but could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCommand {
    /// The command.
    pub command_id: CommandId,
    /// Its target.
    pub village_id: VillageId,
    /// What went wrong.
    pub reason: String,
}

/// Summary of one tick.
#[derive(Debug, Default)]
pub struct TickSummary {
    /// Commands that passed admission.
    pub admitted: usize,
    /// Commands turned away by admission.
    pub rejected: Vec<Rejection>,
    /// Attacks resolved.
    pub battles: usize,
    /// Support commands stationed.
    pub reinforcements: usize,
    /// Villages that changed hands.
    pub captures: usize,
    /// Admitted commands that failed to resolve.
    pub failed: Vec<FailedCommand>,
    /// Villages whose state could not be saved.
    pub unsaved: Vec<VillageId>,
}

impl TickSummary {
    fn absorb(&mut self, outcome: VillageOutcome) {
        self.battles = self.battles.saturating_add(outcome.battles);
        self.reinforcements = self.reinforcements.saturating_add(outcome.reinforcements);
        self.captures = self.captures.saturating_add(outcome.captures);
        self.failed.extend(outcome.failed);
        if let Some(village_id) = outcome.unsaved {
            self.unsaved.push(village_id);
        }
    }
}

/// What one village task accomplished.
#[derive(Debug, Default)]
struct VillageOutcome {
    battles: usize,
    reinforcements: usize,
    captures: usize,
    failed: Vec<FailedCommand>,
    unsaved: Option<VillageId>,
}

/// Drives resolution ticks for one world.
pub struct TickDriver {
    ctx: Arc<ResolveContext>,
    limiter: RateLimiter,
    registry: Arc<VillageRegistry>,
    store: Arc<dyn VillageStore>,
    sink: Arc<dyn ReportSink>,
}

impl TickDriver {
    /// Create a driver with an empty registry and rate-limit history.
    pub fn new(
        ctx: ResolveContext,
        store: Arc<dyn VillageStore>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let limiter = RateLimiter::new(ctx.config.rate_limits.clone());
        Self {
            ctx: Arc::new(ctx),
            limiter,
            registry: Arc::new(VillageRegistry::new()),
            store,
            sink,
        }
    }

    /// Villages loaded so far.
    pub fn registry(&self) -> &VillageRegistry {
        &self.registry
    }

    /// Resolve one batch of commands.
    pub async fn resolve_tick(&self, commands: Vec<Command>) -> TickSummary {
        let submitted = commands.len();
        let admission = admit_commands(
            commands,
            &self.limiter,
            &self.ctx.config.scheduler,
            &self.ctx.catalog,
        );
        let mut summary = TickSummary {
            admitted: admission.admitted.len(),
            rejected: admission.rejected,
            ..TickSummary::default()
        };

        let mut queues: BTreeMap<VillageId, Vec<Command>> = BTreeMap::new();
        for command in admission.admitted {
            queues.entry(command.target).or_default().push(command);
        }

        let mut tasks = JoinSet::new();
        for (village_id, queue) in queues {
            let handle = match self.village_handle(village_id).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(village_id = %village_id, error = %e, "Village unavailable");
                    summary.failed.extend(queue.iter().map(|c| FailedCommand {
                        command_id: c.id,
                        village_id,
                        reason: e.to_string(),
                    }));
                    continue;
                }
            };
            tasks.spawn(resolve_village_queue(
                handle,
                queue,
                Arc::clone(&self.ctx),
                Arc::clone(&self.store),
                Arc::clone(&self.sink),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.absorb(outcome),
                Err(e) => warn!(error = %e, "Village task did not complete"),
            }
        }

        info!(
            submitted,
            admitted = summary.admitted,
            rejected = summary.rejected.len(),
            battles = summary.battles,
            reinforcements = summary.reinforcements,
            captures = summary.captures,
            failed = summary.failed.len(),
            "Tick resolved"
        );
        summary
    }

    /// Registered handle, loading the village from the store on first use.
    ///
    /// Concurrent ticks may both load a new village; only the first
    /// registration is kept and both get the same handle.
    async fn village_handle(&self, id: VillageId) -> Result<VillageHandle, StoreError> {
        if let Some(handle) = self.registry.get(id).await {
            return Ok(handle);
        }
        let state = self.store.load(id)?;
        Ok(self.registry.get_or_insert(state).await)
    }
}

/// Resolve one village's queue in order, then persist the village.
async fn resolve_village_queue(
    handle: VillageHandle,
    queue: Vec<Command>,
    ctx: Arc<ResolveContext>,
    store: Arc<dyn VillageStore>,
    sink: Arc<dyn ReportSink>,
) -> VillageOutcome {
    let mut village = handle.lock().await;
    let mut outcome = VillageOutcome::default();

    for command in &queue {
        let resolved = match command.kind {
            CommandKind::Support => {
                apply_support(command, &mut village).map(BattleReport::Reinforcement)
            }
            CommandKind::Attack => {
                let mut rng = command_rng(ctx.config.world.rng, ctx.config.world.seed, command);
                resolve_battle(command, &mut village, &ctx, &mut rng)
                    .map(|result| BattleReport::Battle(Box::new(result)))
            }
        };
        match resolved {
            Ok(report) => {
                match &report {
                    BattleReport::Battle(result) => {
                        outcome.battles = outcome.battles.saturating_add(1);
                        if result.captured {
                            outcome.captures = outcome.captures.saturating_add(1);
                        }
                    }
                    BattleReport::Reinforcement(_) => {
                        outcome.reinforcements = outcome.reinforcements.saturating_add(1);
                    }
                }
                sink.emit(report);
            }
            Err(e) => {
                warn!(
                    command_id = %command.id,
                    village_id = %village.id,
                    error = %e,
                    "Command failed to resolve"
                );
                outcome.failed.push(FailedCommand {
                    command_id: command.id,
                    village_id: village.id,
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Err(e) = store.save(&village) {
        warn!(village_id = %village.id, error = %e, "Village state not saved");
        outcome.unsaved = Some(village.id);
    }
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::time::Duration;

    use bastion_types::{ArmyComposition, PlayerId};

    use super::*;
    use crate::config::WorldConfig;
    use crate::ports::{CollectingReportSink, InMemoryVillageStore};
    use crate::village::VillageCombatState;

    fn command(target: VillageId, arrival: i64, kind: CommandKind, units: ArmyComposition) -> Command {
        Command {
            id: CommandId::new(),
            arrival,
            sequence: u64::try_from(arrival).unwrap_or(0),
            kind,
            origin: VillageId::new(),
            target,
            player: PlayerId::new(),
            attacker_points: 500,
            catapult_target: None,
            units,
        }
    }

    fn driver(
        villages: Vec<VillageCombatState>,
    ) -> (TickDriver, Arc<InMemoryVillageStore>, Arc<CollectingReportSink>) {
        let store = Arc::new(InMemoryVillageStore::with_villages(villages));
        let sink = Arc::new(CollectingReportSink::new());
        let driver = TickDriver::new(
            ResolveContext::new(WorldConfig::default()),
            Arc::clone(&store) as Arc<dyn VillageStore>,
            Arc::clone(&sink) as Arc<dyn ReportSink>,
        );
        (driver, store, sink)
    }

    #[tokio::test]
    async fn support_lands_before_a_simultaneous_attack() {
        let village = VillageCombatState::new(VillageId::new(), Some(PlayerId::new()), 0);
        let id = village.id;
        let (driver, store, sink) = driver(vec![village]);

        let mut attack = command(id, 100, CommandKind::Attack, ArmyComposition::new().with("axe", 10));
        let mut support =
            command(id, 100, CommandKind::Support, ArmyComposition::new().with("spear", 500));
        attack.sequence = 1;
        support.sequence = 1;

        let summary = driver.resolve_tick(vec![attack, support]).await;
        assert_eq!(summary.admitted, 2);
        assert_eq!(summary.reinforcements, 1);
        assert_eq!(summary.battles, 1);

        let battles = sink.battles();
        assert_eq!(battles.len(), 1);
        assert_eq!(
            battles.first().map(|b| b.winner),
            Some(bastion_types::BattleWinner::DefenderHold)
        );

        let saved = store.load(id).unwrap();
        assert!(saved.support.get("spear") > 0);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_command() {
        let a = VillageCombatState::new(VillageId::new(), None, 0);
        let b = VillageCombatState::new(VillageId::new(), None, 0);
        let (a_id, b_id) = (a.id, b.id);
        let (driver, _store, sink) = driver(vec![a, b]);
        let missing = VillageId::new();

        let commands = vec![
            command(a_id, 10, CommandKind::Attack, ArmyComposition::new().with("axe", 10)),
            command(b_id, 11, CommandKind::Attack, ArmyComposition::new().with("light", 5)),
            command(missing, 12, CommandKind::Attack, ArmyComposition::new().with("axe", 5)),
            command(a_id, 13, CommandKind::Attack, ArmyComposition::new()),
        ];
        let summary = driver.resolve_tick(commands).await;

        assert_eq!(summary.admitted, 3);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.battles, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed.first().map(|f| f.village_id), Some(missing));
        assert_eq!(sink.battles().len(), 2);
    }

    #[tokio::test]
    async fn villages_stay_loaded_between_ticks() {
        let village = VillageCombatState::new(VillageId::new(), None, 0);
        let id = village.id;
        let (driver, _store, _sink) = driver(vec![village]);

        let first = command(id, 10, CommandKind::Support, ArmyComposition::new().with("spear", 5));
        let second = command(id, 20, CommandKind::Support, ArmyComposition::new().with("spear", 5));
        driver.resolve_tick(vec![first]).await;
        driver.resolve_tick(vec![second]).await;

        let spears = driver.registry().with_village(id, |v| v.support.get("spear")).await;
        assert_eq!(spears, Some(10));
    }

    /// Store whose loads take a while, widening the window between lookup
    /// and registration.
    struct SlowStore {
        inner: InMemoryVillageStore,
        delay: Duration,
    }

    impl VillageStore for SlowStore {
        fn load(&self, id: VillageId) -> Result<VillageCombatState, StoreError> {
            let state = self.inner.load(id);
            std::thread::sleep(self.delay);
            state
        }

        fn save(&self, state: &VillageCombatState) -> Result<(), StoreError> {
            self.inner.save(state)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ticks_share_one_village_lock() {
        for _ in 0..10 {
            let village = VillageCombatState::new(VillageId::new(), None, 0);
            let id = village.id;
            let store = SlowStore {
                inner: InMemoryVillageStore::with_villages(vec![village]),
                delay: Duration::from_millis(20),
            };
            let driver = Arc::new(TickDriver::new(
                ResolveContext::new(WorldConfig::default()),
                Arc::new(store),
                Arc::new(CollectingReportSink::new()),
            ));

            let mut ticks = JoinSet::new();
            for arrival in [10, 11] {
                let driver = Arc::clone(&driver);
                let cmd = command(id, arrival, CommandKind::Support, ArmyComposition::new().with("spear", 5));
                ticks.spawn(async move { driver.resolve_tick(vec![cmd]).await });
            }
            while let Some(summary) = ticks.join_next().await {
                assert_eq!(summary.unwrap().reinforcements, 1);
            }

            let spears = driver.registry().with_village(id, |v| v.support.get("spear")).await;
            assert_eq!(spears, Some(10));
        }
    }
}
