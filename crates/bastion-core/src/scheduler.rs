//! Command ordering, admission checks and rate limiting.
//!
//! Every command passes through here before resolution:
//!
//! 1. [`sort_commands`] puts a tick's commands in resolution order.
//! 2. [`validate_command`] rejects attacks that are too small.
//! 3. [`RateLimiter`] rejects players who send too much too fast.
//!
//! [`admit_commands`] runs all three and reports what was turned away.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use bastion_combat::stats::total_population;
use bastion_combat::{CombatError, UnitStatSource};
use bastion_types::{ArmyComposition, Command, CommandId, CommandKind, PlayerId, VillageId};
use tracing::{debug, warn};

use crate::config::{RateLimitConfig, SchedulerConfig};

/// Why a command was not admitted.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The attacking army is below the minimum population.
    #[error("attack population {population} is below the minimum of {minimum}")]
    MinPopulation {
        /// Population of the command's army.
        population: u64,
        /// Configured minimum.
        minimum: u64,
    },

    /// The player exceeded a rate limit.
    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited {
        /// Seconds until the oldest counted command leaves the window.
        retry_after: i64,
    },

    /// The army references a unit the world does not know.
    #[error("combat error: {source}")]
    Combat {
        /// The underlying lookup error.
        #[from]
        source: CombatError,
    },
}

impl SchedulerError {
    /// Stable code for client-facing rejections.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MinPopulation { .. } => "ERR_MIN_POP",
            Self::RateLimited { .. } => "ERR_RATE_LIMIT",
            Self::Combat { .. } => "ERR_UNKNOWN_UNIT",
        }
    }

    /// Retry hint for rate-limit rejections.
    pub const fn retry_after(&self) -> Option<i64> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            Self::MinPopulation { .. } | Self::Combat { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Sort commands into resolution order.
///
/// Arrival ascending, then sequence ascending, then support before attack.
/// The sort is stable, so fully tied commands keep their input order.
pub fn sort_commands(commands: &mut [Command]) {
    commands.sort_by(|a, b| {
        a.arrival
            .cmp(&b.arrival)
            .then(a.sequence.cmp(&b.sequence))
            .then(a.kind.priority().cmp(&b.kind.priority()))
    });
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject attacks whose population is below `min_attack_population`.
///
/// Support commands are never rejected for size.
pub fn validate_command(
    command: &Command,
    config: &SchedulerConfig,
    stats: &impl UnitStatSource,
) -> Result<(), SchedulerError> {
    let population = total_population(&command.units, stats)?;
    if command.kind == CommandKind::Attack && population < config.min_attack_population {
        return Err(SchedulerError::MinPopulation {
            population,
            minimum: config.min_attack_population,
        });
    }
    Ok(())
}

/// Whether an army is small enough to count as a fake attack.
///
/// Reporting only; fakes are resolved like any other attack.
pub fn is_fake_attack(
    units: &ArmyComposition,
    threshold: u64,
    stats: &impl UnitStatSource,
) -> Result<bool, CombatError> {
    Ok(total_population(units, stats)? < threshold)
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// Timestamps of recently admitted commands.
#[derive(Debug, Clone, Default)]
pub struct RateLimitHistory {
    per_player: BTreeMap<PlayerId, VecDeque<i64>>,
    per_target: BTreeMap<(PlayerId, VillageId), VecDeque<i64>>,
}

impl RateLimitHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands counted for a player inside the current window.
    pub fn player_count(&self, player: PlayerId) -> usize {
        self.per_player.get(&player).map_or(0, VecDeque::len)
    }

    /// Commands counted for a (player, target) pair inside the current window.
    pub fn target_count(&self, player: PlayerId, target: VillageId) -> usize {
        self.per_target.get(&(player, target)).map_or(0, VecDeque::len)
    }

    /// Whether no player or pair has an event on record.
    pub fn is_empty(&self) -> bool {
        self.per_player.is_empty() && self.per_target.is_empty()
    }

    /// Drop every event that has left the window at `now`, and the keys
    /// left without events.
    pub fn evict_expired(&mut self, now: i64, window: i64) {
        self.per_player.retain(|_, events| {
            prune(events, now, window);
            !events.is_empty()
        });
        self.per_target.retain(|_, events| {
            prune(events, now, window);
            !events.is_empty()
        });
    }
}

/// Check a command against both sliding windows and record it if allowed.
///
/// An event leaves the window once `now - event >= window_seconds`. When a
/// limit is hit, `retry_after` is the time until the oldest counted event
/// leaves, at least one second. History is only updated on success.
pub fn enforce_rate_limits(
    player: PlayerId,
    target: VillageId,
    now: i64,
    history: &mut RateLimitHistory,
    config: &RateLimitConfig,
) -> Result<(), SchedulerError> {
    let window = config.window_seconds;
    let no_events = VecDeque::new();

    prune_key(&mut history.per_player, &player, now, window);
    let player_events = history.per_player.get(&player).unwrap_or(&no_events);
    if let Some(retry_after) = retry_after(player_events, config.per_player, now, window) {
        return Err(SchedulerError::RateLimited { retry_after });
    }

    let pair = (player, target);
    prune_key(&mut history.per_target, &pair, now, window);
    let target_events = history.per_target.get(&pair).unwrap_or(&no_events);
    if let Some(retry_after) = retry_after(target_events, config.per_target, now, window) {
        return Err(SchedulerError::RateLimited { retry_after });
    }

    history.per_player.entry(player).or_default().push_back(now);
    history.per_target.entry(pair).or_default().push_back(now);
    Ok(())
}

/// Prune one key's events, removing the key once none are left.
fn prune_key<K: Ord>(map: &mut BTreeMap<K, VecDeque<i64>>, key: &K, now: i64, window: i64) {
    if let Some(events) = map.get_mut(key) {
        prune(events, now, window);
        if events.is_empty() {
            map.remove(key);
        }
    }
}

fn prune(events: &mut VecDeque<i64>, now: i64, window: i64) {
    while events
        .front()
        .is_some_and(|&at| now.saturating_sub(at) >= window)
    {
        events.pop_front();
    }
}

/// `None` when another event fits, otherwise the retry hint.
fn retry_after(events: &VecDeque<i64>, max: u32, now: i64, window: i64) -> Option<i64> {
    let max = usize::try_from(max).unwrap_or(usize::MAX);
    if events.len() < max {
        return None;
    }
    let wait = events.front().map_or(window, |&oldest| {
        oldest.saturating_add(window).saturating_sub(now)
    });
    Some(wait.max(1))
}

/// Shared rate-limit history.
///
/// The single lock makes each check-and-record atomic, so concurrent
/// commands for the same (player, target) pair never lose an update.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    history: Mutex<RateLimitHistory>,
}

impl RateLimiter {
    /// Create a limiter with empty history.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            history: Mutex::new(RateLimitHistory::new()),
        }
    }

    /// Check and record one command.
    pub fn check(&self, player: PlayerId, target: VillageId, now: i64) -> Result<(), SchedulerError> {
        // History is never left half-updated, so a poisoned lock is usable.
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        enforce_rate_limits(player, target, now, &mut history, &self.config)
    }

    /// Forget everything that has left the window at `now`.
    pub fn evict_expired(&self, now: i64) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.evict_expired(now, self.config.window_seconds);
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// A command turned away by admission.
#[derive(Debug)]
pub struct Rejection {
    /// The rejected command.
    pub command_id: CommandId,
    /// Who sent it.
    pub player: PlayerId,
    /// Why.
    pub error: SchedulerError,
}

/// Outcome of admitting one tick's commands.
#[derive(Debug, Default)]
pub struct Admission {
    /// Commands to resolve, in resolution order.
    pub admitted: Vec<Command>,
    /// Commands turned away.
    pub rejected: Vec<Rejection>,
}

/// Sort, validate and rate-limit a batch of commands.
///
/// Rate limits are counted at each command's arrival time. History that
/// has expired before the batch's earliest arrival is evicted first.
pub fn admit_commands(
    mut commands: Vec<Command>,
    limiter: &RateLimiter,
    config: &SchedulerConfig,
    stats: &impl UnitStatSource,
) -> Admission {
    sort_commands(&mut commands);
    if let Some(earliest) = commands.first() {
        limiter.evict_expired(earliest.arrival);
    }

    let mut admission = Admission::default();
    for command in commands {
        let checked = validate_command(&command, config, stats)
            .and_then(|()| limiter.check(command.player, command.target, command.arrival));
        match checked {
            Ok(()) => admission.admitted.push(command),
            Err(error) => {
                warn!(
                    command_id = %command.id,
                    player = %command.player,
                    code = error.code(),
                    retry_after = ?error.retry_after(),
                    "Command rejected"
                );
                admission.rejected.push(Rejection {
                    command_id: command.id,
                    player: command.player,
                    error,
                });
            }
        }
    }

    debug!(
        admitted = admission.admitted.len(),
        rejected = admission.rejected.len(),
        "Commands admitted"
    );
    admission
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use bastion_combat::stats::standard_unit_table;

    use super::*;

    fn command(arrival: i64, sequence: u64, kind: CommandKind) -> Command {
        Command {
            id: CommandId::new(),
            arrival,
            sequence,
            kind,
            origin: VillageId::new(),
            target: VillageId::new(),
            player: PlayerId::new(),
            attacker_points: 0,
            catapult_target: None,
            units: ArmyComposition::new().with("axe", 10),
        }
    }

    #[test]
    fn sort_orders_by_arrival_sequence_then_kind() {
        let a = command(20, 1, CommandKind::Attack);
        let b = command(10, 5, CommandKind::Attack);
        let c = command(10, 2, CommandKind::Attack);
        let d = command(10, 2, CommandKind::Support);
        let mut commands = vec![a.clone(), b.clone(), c.clone(), d.clone()];
        sort_commands(&mut commands);
        let ids: Vec<_> = commands.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![d.id, c.id, b.id, a.id]);
    }

    #[test]
    fn sort_is_stable_for_exact_duplicates() {
        let first = command(10, 1, CommandKind::Attack);
        let second = command(10, 1, CommandKind::Attack);
        let mut once = vec![first.clone(), second.clone()];
        sort_commands(&mut once);
        let mut twice = once.clone();
        sort_commands(&mut twice);
        assert_eq!(once.first().map(|c| c.id), Some(first.id));
        assert_eq!(once, twice);
    }

    #[test]
    fn one_per_minute_rejects_the_second_command() {
        let config = RateLimitConfig {
            window_seconds: 60,
            per_player: 1,
            per_target: 10,
        };
        let mut history = RateLimitHistory::new();
        let player = PlayerId::new();
        let target = VillageId::new();

        assert!(enforce_rate_limits(player, target, 1000, &mut history, &config).is_ok());
        let second = enforce_rate_limits(player, target, 1001, &mut history, &config);
        let retry = second.as_ref().err().and_then(SchedulerError::retry_after);
        assert_eq!(retry, Some(59));
        assert_eq!(second.err().map(|e| e.code()), Some("ERR_RATE_LIMIT"));
        // Rejections are not recorded.
        assert_eq!(history.player_count(player), 1);

        // Once the first event leaves the window the player may send again.
        assert!(enforce_rate_limits(player, target, 1060, &mut history, &config).is_ok());
    }

    #[test]
    fn per_target_limit_is_independent_of_other_targets() {
        let config = RateLimitConfig {
            window_seconds: 60,
            per_player: 10,
            per_target: 1,
        };
        let mut history = RateLimitHistory::new();
        let player = PlayerId::new();
        let first = VillageId::new();
        let second = VillageId::new();

        assert!(enforce_rate_limits(player, first, 0, &mut history, &config).is_ok());
        assert!(enforce_rate_limits(player, first, 1, &mut history, &config).is_err());
        assert!(enforce_rate_limits(player, second, 2, &mut history, &config).is_ok());
        assert_eq!(history.target_count(player, first), 1);
        assert_eq!(history.player_count(player), 2);
    }

    #[test]
    fn zero_limit_waits_a_full_window() {
        let config = RateLimitConfig {
            window_seconds: 30,
            per_player: 0,
            per_target: 0,
        };
        let mut history = RateLimitHistory::new();
        let result = enforce_rate_limits(PlayerId::new(), VillageId::new(), 0, &mut history, &config);
        assert_eq!(result.err().and_then(|e| e.retry_after()), Some(30));
        assert!(history.is_empty());
    }

    #[test]
    fn expired_players_are_forgotten() {
        let config = RateLimitConfig {
            window_seconds: 60,
            per_player: 1,
            per_target: 1,
        };
        let mut history = RateLimitHistory::new();
        let (player, target) = (PlayerId::new(), VillageId::new());

        enforce_rate_limits(player, target, 0, &mut history, &config).unwrap();
        assert!(enforce_rate_limits(PlayerId::new(), target, 1, &mut history, &config).is_ok());
        history.evict_expired(61, config.window_seconds);
        assert!(history.is_empty());

        // A returning player starts from a clean slate.
        enforce_rate_limits(player, target, 200, &mut history, &config).unwrap();
        assert_eq!(history.player_count(player), 1);
        assert_eq!(history.target_count(player, target), 1);
    }

    #[test]
    fn admission_evicts_history_older_than_the_batch() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let table = standard_unit_table();
        let config = SchedulerConfig::default();
        limiter.check(PlayerId::new(), VillageId::new(), 0).unwrap();

        let admission = admit_commands(vec![command(1_000, 1, CommandKind::Attack)], &limiter, &config, &table);
        assert_eq!(admission.admitted.len(), 1);
        let history = limiter.history.lock().unwrap();
        assert_eq!(history.per_player.len(), 1);
        assert_eq!(history.per_target.len(), 1);
    }

    #[test]
    fn minimum_population_applies_to_attacks_only() {
        let table = standard_unit_table();
        let config = SchedulerConfig {
            min_attack_population: 50,
            fake_attack_population: 100,
        };
        let attack = command(0, 0, CommandKind::Attack);
        let result = validate_command(&attack, &config, &table);
        assert_eq!(result.err().map(|e| e.code()), Some("ERR_MIN_POP"));

        let support = command(0, 0, CommandKind::Support);
        assert!(validate_command(&support, &config, &table).is_ok());
    }

    #[test]
    fn fake_detection_uses_population() {
        let table = standard_unit_table();
        let small = ArmyComposition::new().with("spy", 1);
        let big = ArmyComposition::new().with("light", 30);
        assert!(is_fake_attack(&small, 100, &table).unwrap());
        assert!(!is_fake_attack(&big, 100, &table).unwrap());
    }

    #[test]
    fn concurrent_checks_never_lose_updates() {
        let limiter = std::sync::Arc::new(RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            per_player: 5,
            per_target: 5,
        }));
        let player = PlayerId::new();
        let target = VillageId::new();
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = std::sync::Arc::clone(&limiter);
                std::thread::spawn(move || limiter.check(player, target, 0).is_ok())
            })
            .collect();
        let allowed = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|&ok| ok)
            .count();
        assert_eq!(allowed, 5);
    }

    #[test]
    fn admission_sorts_and_reports_rejections() {
        let table = standard_unit_table();
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let mut empty = command(5, 0, CommandKind::Attack);
        empty.units = ArmyComposition::new();
        let late = command(10, 1, CommandKind::Attack);
        let early = command(1, 2, CommandKind::Attack);

        let admission = admit_commands(
            vec![late.clone(), empty.clone(), early.clone()],
            &limiter,
            &SchedulerConfig::default(),
            &table,
        );
        let admitted: Vec<_> = admission.admitted.iter().map(|c| c.id).collect();
        assert_eq!(admitted, vec![early.id, late.id]);
        assert_eq!(admission.rejected.len(), 1);
        assert_eq!(
            admission.rejected.first().map(|r| (r.command_id, r.error.code())),
            Some((empty.id, "ERR_MIN_POP"))
        );
    }
}
