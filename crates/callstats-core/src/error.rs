//! Error types for aggregation and provisioning.
//!
//! [`CoreError`] separates failures the caller caused (a bad queue name, a
//! missing password) from failures of the engine or the provisioning store.
//! Nothing here is retried.

use callstats_esl::EslError;

/// Errors that can occur while building views or provisioning users.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The control channel failed (unreachable, rejected, timed out).
    #[error(transparent)]
    Channel(#[from] EslError),

    /// The request was refused before any command was issued.
    #[error("validation error: {0}")]
    Validation(String),

    /// The engine answered with `-ERR` or an unusable body.
    #[error("engine rejected command `{command}`: {reply}")]
    Command {
        /// The command text that was sent.
        command: String,
        /// The engine's reply, trimmed.
        reply: String,
    },

    /// The provisioning store could not be read or written.
    #[error("directory store error: {0}")]
    Store(String),
}

impl CoreError {
    /// Whether the error was raised before any work was attempted.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Channel(EslError::InvalidToken { .. })
        )
    }

    /// Whether the control channel was unreachable or too slow.
    pub const fn is_channel_failure(&self) -> bool {
        matches!(
            self,
            Self::Channel(EslError::Connection(_) | EslError::Timeout { .. })
        )
    }
}
