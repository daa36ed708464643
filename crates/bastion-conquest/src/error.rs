//! Error types for the `bastion-conquest` crate.

/// Errors raised by the conquest state machine.
#[derive(Debug, thiserror::Error)]
pub enum ConquestError {
    /// The conquest configuration is inconsistent.
    #[error("invalid conquest configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },
}
