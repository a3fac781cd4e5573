//! Error types for the control channel.
//!
//! A malformed response row is not an error: the parser drops it and logs
//! it. Only failures that leave the caller without a response surface here.

/// Errors that can occur while talking to the engine.
#[derive(Debug, thiserror::Error)]
pub enum EslError {
    /// The session could not be established, was rejected during
    /// authentication, or was closed by the engine.
    #[error("connection error: {0}")]
    Connection(String),

    /// No response arrived within the bounded wait.
    #[error("timed out after {timeout_ms}ms waiting for: {waiting_for}")]
    Timeout {
        /// What the client was waiting on (a command or the handshake).
        waiting_for: String,
        /// The bound that was exceeded, in milliseconds.
        timeout_ms: u64,
    },

    /// A token offered for substitution into a command was rejected.
    #[error("invalid {placeholder}: {reason}")]
    InvalidToken {
        /// The template placeholder the token was meant for.
        placeholder: String,
        /// Why the token was refused.
        reason: String,
    },
}
