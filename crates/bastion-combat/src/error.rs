//! Error types for the `bastion-combat` crate.

use bastion_types::UnitType;

/// Errors that can occur while resolving combat math.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    /// A composition referenced a unit type missing from the stat table.
    #[error("unknown unit type: {0}")]
    UnknownUnit(UnitType),

    /// The combat configuration is inconsistent.
    #[error("invalid combat configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },
}
