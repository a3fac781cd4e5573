//! Canned-response control channel.
//!
//! [`ScriptedConnector`] answers commands from a fixed table keyed by the
//! exact command text and records every command it receives. Unknown
//! commands get the engine's own `-ERR ... Command not found!` reply. It is
//! used by tests across the workspace and for offline demos.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::channel::{Connector, ControlChannel, RawResponse};
use crate::command::Command;
use crate::error::EslError;

/// A connector whose sessions replay scripted responses.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    responses: Arc<BTreeMap<String, String>>,
    sent: Arc<Mutex<Vec<String>>>,
    unreachable: bool,
}

impl ScriptedConnector {
    /// A connector with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose every `connect` fails with a connection error.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Script the response body for an exact command text.
    #[must_use]
    pub fn respond(mut self, command: &str, body: &str) -> Self {
        Arc::make_mut(&mut self.responses).insert(command.to_owned(), body.to_owned());
        self
    }

    /// Every command sent through any session of this connector, in order.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Connector for ScriptedConnector {
    type Channel = ScriptedChannel;

    async fn connect(&self) -> Result<ScriptedChannel, EslError> {
        if self.unreachable {
            return Err(EslError::Connection(String::from(
                "scripted engine is unreachable",
            )));
        }
        Ok(ScriptedChannel {
            responses: Arc::clone(&self.responses),
            sent: Arc::clone(&self.sent),
        })
    }
}

/// One session of a [`ScriptedConnector`].
#[derive(Debug)]
pub struct ScriptedChannel {
    responses: Arc<BTreeMap<String, String>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ControlChannel for ScriptedChannel {
    async fn send(&mut self, command: &Command) -> Result<RawResponse, EslError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(command.as_str().to_owned());
        }

        let body = self.responses.get(command.as_str()).cloned().unwrap_or_else(|| {
            let verb = command.as_str().split_whitespace().next().unwrap_or("");
            format!("-ERR {verb} Command not found!\n")
        });
        debug!(command = %command, bytes = body.len(), "scripted response");
        Ok(RawResponse::new(body))
    }
}
