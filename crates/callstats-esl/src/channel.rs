//! The control channel seam.
//!
//! A [`Connector`] opens sessions; a [`ControlChannel`] is one session with
//! at most one command in flight (`send` takes `&mut self`). Both traits
//! return `Send` futures so they can be driven from HTTP handlers.
//!
//! Implementations:
//!
//! - [`EslConnector`](crate::client::EslConnector) -- TCP event socket
//! - [`ScriptedConnector`](crate::scripted::ScriptedConnector) -- canned
//!   responses keyed by command text

use core::fmt;
use core::future::Future;

use crate::command::Command;
use crate::error::EslError;

/// Opaque text returned by the engine for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse(String);

impl RawResponse {
    /// Wrap a response body.
    pub const fn new(body: String) -> Self {
        Self(body)
    }

    /// The response body.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the body.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the engine refused the command (`-ERR ...` / `-USAGE ...`).
    pub fn is_error(&self) -> bool {
        let body = self.0.trim_start();
        body.starts_with("-ERR") || body.starts_with("-USAGE")
    }
}

impl From<&str> for RawResponse {
    fn from(body: &str) -> Self {
        Self(body.to_owned())
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request/response session with the engine.
pub trait ControlChannel: Send {
    /// Send a command and wait for its response body.
    ///
    /// # Errors
    ///
    /// Returns [`EslError::Connection`] if the session is broken and
    /// [`EslError::Timeout`] if no response arrives within the bound.
    fn send(
        &mut self,
        command: &Command,
    ) -> impl Future<Output = Result<RawResponse, EslError>> + Send;
}

/// Opens control channel sessions.
pub trait Connector: Send + Sync {
    /// The session type this connector produces.
    type Channel: ControlChannel;

    /// Establish (and authenticate) a new session.
    ///
    /// # Errors
    ///
    /// Returns [`EslError::Connection`] if the engine is unreachable or
    /// rejects the session, [`EslError::Timeout`] if the handshake stalls.
    fn connect(&self) -> impl Future<Output = Result<Self::Channel, EslError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_replies_are_detected() {
        assert!(RawResponse::from("-ERR no such queue\n").is_error());
        assert!(RawResponse::from("-USAGE: uuid_kill <uuid>").is_error());
        assert!(!RawResponse::from("+OK\n").is_error());
        assert!(!RawResponse::from("agent1|Available|0\n").is_error());
    }
}
