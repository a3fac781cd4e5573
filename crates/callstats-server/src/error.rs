//! Error types for the server binary.

/// Top-level error for the server binary.
///
/// Each variant wraps a failure that stops startup, so `main` can
/// propagate everything with `?`.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: callstats_core::config::ConfigError,
    },

    /// No access key source is configured.
    #[error("credential error: {message}")]
    Credentials {
        /// What is missing.
        message: String,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: callstats_api::ServerError,
    },
}
