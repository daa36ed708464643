//! Allegiance rates and conquest windows.

use serde::Deserialize;

use crate::error::ConquestError;

/// Upper bound of the allegiance meter.
pub const MAX_ALLEGIANCE: f64 = 100.0;

/// Conquest tunables, the `conquest` section of the world configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConquestConfig {
    /// Smallest allegiance drop per surviving noble.
    #[serde(default = "default_drop_min")]
    pub drop_min: f64,

    /// Largest allegiance drop per surviving noble.
    #[serde(default = "default_drop_max")]
    pub drop_max: f64,

    /// Allegiance regained per hour outside anti-snipe windows.
    #[serde(default = "default_regen_per_hour")]
    pub regen_per_hour: f64,

    /// Allegiance a village starts with right after capture.
    #[serde(default = "default_post_capture_start")]
    pub post_capture_start: f64,

    /// Seconds after capture during which reduction is blocked.
    #[serde(default = "default_capture_cooldown_seconds")]
    pub capture_cooldown_seconds: i64,

    /// Length of the anti-snipe window opened by a capture.
    #[serde(default = "default_anti_snipe_seconds")]
    pub anti_snipe_seconds: i64,

    /// Allegiance floor held while the anti-snipe window is open.
    #[serde(default = "default_anti_snipe_floor")]
    pub anti_snipe_floor: f64,
}

impl Default for ConquestConfig {
    fn default() -> Self {
        Self {
            drop_min: default_drop_min(),
            drop_max: default_drop_max(),
            regen_per_hour: default_regen_per_hour(),
            post_capture_start: default_post_capture_start(),
            capture_cooldown_seconds: default_capture_cooldown_seconds(),
            anti_snipe_seconds: default_anti_snipe_seconds(),
            anti_snipe_floor: default_anti_snipe_floor(),
        }
    }
}

impl ConquestConfig {
    /// Check internal consistency of the configured values.
    pub fn validate(&self) -> Result<(), ConquestError> {
        if self.drop_min < 0.0 || self.drop_min > self.drop_max {
            return Err(invalid("drop_min must be within [0, drop_max]"));
        }
        if self.regen_per_hour < 0.0 {
            return Err(invalid("regen_per_hour must not be negative"));
        }
        if !(0.0..=MAX_ALLEGIANCE).contains(&self.post_capture_start) {
            return Err(invalid("post_capture_start must be within [0, 100]"));
        }
        if !(0.0..=MAX_ALLEGIANCE).contains(&self.anti_snipe_floor) {
            return Err(invalid("anti_snipe_floor must be within [0, 100]"));
        }
        if self.capture_cooldown_seconds < 0 || self.anti_snipe_seconds < 0 {
            return Err(invalid("window lengths must not be negative"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConquestError {
    ConquestError::InvalidConfig {
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_drop_min() -> f64 {
    20.0
}

const fn default_drop_max() -> f64 {
    35.0
}

const fn default_regen_per_hour() -> f64 {
    1.0
}

const fn default_post_capture_start() -> f64 {
    25.0
}

const fn default_capture_cooldown_seconds() -> i64 {
    3_600
}

const fn default_anti_snipe_seconds() -> i64 {
    7_200
}

const fn default_anti_snipe_floor() -> f64 {
    25.0
}
