//! Per-village allegiance state and its transitions.
//!
//! [`AllegianceState`] is only ever changed through its methods, which keep
//! allegiance inside `[0, 100]` and never let it drop below the anti-snipe
//! floor while that window is open. Callers serialize access per village.

use bastion_types::{AllegianceBlock, AllegianceOutcome, ConquestPhase};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConquestConfig, MAX_ALLEGIANCE};

const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Regeneration multipliers from the village's buildings and research.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegenBonuses {
    /// Building multiplier.
    pub building: f64,
    /// Technology multiplier.
    pub tech: f64,
}

impl Default for RegenBonuses {
    fn default() -> Self {
        Self {
            building: 1.0,
            tech: 1.0,
        }
    }
}

/// Conquest state of one village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllegianceState {
    /// Current allegiance, `0..=100`.
    pub allegiance: f64,
    /// Lowest allegiance allowed while anti-snipe is active.
    pub floor: f64,
    /// End of the anti-snipe window, unix seconds.
    pub anti_snipe_until: Option<i64>,
    /// End of the post-capture cooldown, unix seconds.
    pub capture_cooldown_until: Option<i64>,
    /// When regeneration was last applied.
    pub last_regen_at: i64,
}

impl AllegianceState {
    /// A fully loyal village with no windows open.
    pub const fn new(now: i64) -> Self {
        Self {
            allegiance: MAX_ALLEGIANCE,
            floor: 0.0,
            anti_snipe_until: None,
            capture_cooldown_until: None,
            last_regen_at: now,
        }
    }

    /// Whether the anti-snipe window is open at `now`.
    pub fn is_anti_snipe_active(&self, now: i64) -> bool {
        self.anti_snipe_until.is_some_and(|until| now < until)
    }

    /// Whether the capture cooldown is running at `now`.
    pub fn is_cooldown_active(&self, now: i64) -> bool {
        self.capture_cooldown_until.is_some_and(|until| now < until)
    }

    /// Phase at `now`. Cooldown takes precedence over anti-snipe.
    pub fn phase(&self, now: i64) -> ConquestPhase {
        if self.is_cooldown_active(now) {
            ConquestPhase::CapturedCooldown
        } else if self.is_anti_snipe_active(now) {
            ConquestPhase::AntiSnipe
        } else {
            ConquestPhase::Stable
        }
    }

    /// Clamp a proposed allegiance to the valid range, and to the floor
    /// while anti-snipe is active.
    pub fn enforce_floor(&self, proposed: f64, now: i64) -> f64 {
        let bounded = proposed.clamp(0.0, MAX_ALLEGIANCE);
        if self.is_anti_snipe_active(now) {
            bounded.max(self.floor.clamp(0.0, MAX_ALLEGIANCE))
        } else {
            bounded
        }
    }

    /// Allegiance reduction from a battle.
    ///
    /// Blocked, with no change, while the capture cooldown runs, when the
    /// attacker lost, or when no noble survived. Otherwise each noble draws
    /// a drop uniformly from `[drop_min, drop_max]`; the result stays within
    /// `[0, current]` and respects the anti-snipe floor.
    pub fn reduce_allegiance(
        &mut self,
        nobles: u64,
        attacker_won: bool,
        now: i64,
        config: &ConquestConfig,
        rng: &mut impl Rng,
    ) -> AllegianceOutcome {
        let before = self.allegiance;
        let blocked = if self.is_cooldown_active(now) {
            Some(AllegianceBlock::ConquestCooldown)
        } else if !attacker_won {
            Some(AllegianceBlock::AttackerLost)
        } else if nobles == 0 {
            Some(AllegianceBlock::NoNoblePresent)
        } else {
            None
        };
        if let Some(reason) = blocked {
            debug!(reason = reason.code(), allegiance = before, "Allegiance unchanged");
            return AllegianceOutcome {
                before,
                after: before,
                delta: 0.0,
                blocked,
            };
        }

        let mut drop = 0.0;
        for _ in 0..nobles {
            drop += noble_drop(config, rng);
        }
        let proposed = (before - drop).clamp(0.0, before);
        let after = self.enforce_floor(proposed, now).min(before);
        self.allegiance = after;

        debug!(nobles, drop, before, after, "Allegiance reduced");
        AllegianceOutcome {
            before,
            after,
            delta: before - after,
            blocked: None,
        }
    }

    /// Whether the current allegiance allows capture.
    pub fn can_be_captured(&self) -> bool {
        check_capture_conditions(self.allegiance)
    }

    /// Reset after capture: restart allegiance, open the cooldown and the
    /// anti-snipe window, and raise the floor.
    pub fn apply_post_capture_allegiance(&mut self, now: i64, config: &ConquestConfig) {
        self.allegiance = config.post_capture_start.clamp(0.0, MAX_ALLEGIANCE);
        self.capture_cooldown_until = Some(now.saturating_add(config.capture_cooldown_seconds));
        self.anti_snipe_until = Some(now.saturating_add(config.anti_snipe_seconds));
        self.floor = config.anti_snipe_floor.clamp(0.0, MAX_ALLEGIANCE);
        self.last_regen_at = now;
        debug!(
            allegiance = self.allegiance,
            cooldown_until = ?self.capture_cooldown_until,
            anti_snipe_until = ?self.anti_snipe_until,
            "Post-capture allegiance applied"
        );
    }

    /// Regenerate for `elapsed_seconds`. Paused while anti-snipe is active.
    ///
    /// Returns the new allegiance.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply_regeneration(
        &mut self,
        elapsed_seconds: i64,
        bonuses: RegenBonuses,
        now: i64,
        config: &ConquestConfig,
    ) -> f64 {
        if self.is_anti_snipe_active(now) || elapsed_seconds <= 0 {
            return self.allegiance;
        }
        let hours = elapsed_seconds as f64 / SECONDS_PER_HOUR;
        let gain = config.regen_per_hour * hours * bonuses.building * bonuses.tech;
        self.allegiance = (self.allegiance + gain.max(0.0)).clamp(0.0, MAX_ALLEGIANCE);
        self.allegiance
    }

    /// Regenerate from `last_regen_at` up to `now`.
    ///
    /// Time spent inside an anti-snipe window is not banked.
    pub fn regenerate_to(&mut self, now: i64, bonuses: RegenBonuses, config: &ConquestConfig) -> f64 {
        let start = match self.anti_snipe_until {
            Some(until) if until > self.last_regen_at => until.min(now),
            _ => self.last_regen_at,
        };
        let elapsed = now.saturating_sub(start);
        if elapsed <= 0 {
            self.last_regen_at = self.last_regen_at.max(now);
            return self.allegiance;
        }
        let allegiance = self.apply_regeneration(elapsed, bonuses, now, config);
        self.last_regen_at = now;
        allegiance
    }
}

/// A village can be captured once its allegiance reaches zero.
pub fn check_capture_conditions(allegiance: f64) -> bool {
    allegiance <= 0.0
}

fn noble_drop(config: &ConquestConfig, rng: &mut impl Rng) -> f64 {
    if config.drop_max > config.drop_min {
        rng.random_range(config.drop_min..=config.drop_max)
    } else {
        config.drop_min
    }
}
