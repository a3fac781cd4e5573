//! Engine-wide status, active calls and channels, and call hangup.

use std::sync::Arc;

use callstats_esl::parse::{Record, parse_line_list, parse_single_value, parse_table};
use callstats_esl::vocabulary::{SHOW_CALLS_COUNT, SHOW_CHANNELS_COUNT, STATUS, UUID_KILL};
use callstats_esl::{CommandSet, CommandTemplate, Connector, TableCommand};
use tracing::info;

use crate::error::CoreError;
use crate::exchange::send_checked;

/// Read-mostly views of the engine as a whole.
pub struct MonitorService<C> {
    connector: Arc<C>,
    commands: CommandSet,
}

impl<C: Connector> MonitorService<C> {
    /// Create a service using `commands` for the `show` table layouts.
    pub const fn new(connector: Arc<C>, commands: CommandSet) -> Self {
        Self {
            connector,
            commands,
        }
    }

    /// The engine's `status` report, one entry per non-empty line.
    pub async fn status(&self) -> Result<Vec<String>, CoreError> {
        let command = STATUS.fixed()?;
        let mut channel = self.connector.connect().await?;
        let raw = send_checked(&mut channel, &command).await?;
        Ok(parse_line_list(raw.as_str()))
    }

    /// Active calls, one record per `show calls` row.
    pub async fn calls(&self) -> Result<Vec<Record>, CoreError> {
        self.table(&self.commands.calls).await
    }

    /// Number of active calls.
    pub async fn calls_count(&self) -> Result<u64, CoreError> {
        self.count(&SHOW_CALLS_COUNT).await
    }

    /// Active channels, one record per `show channels` row.
    pub async fn channels(&self) -> Result<Vec<Record>, CoreError> {
        self.table(&self.commands.channels).await
    }

    /// Number of active channels.
    pub async fn channels_count(&self) -> Result<u64, CoreError> {
        self.count(&SHOW_CHANNELS_COUNT).await
    }

    /// Hang up the call whose channel uuid is `uuid`.
    ///
    /// Returns the engine's reply text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `uuid` is not a UUID (nothing is
    /// sent) and [`CoreError::Command`] if the engine knows no such channel.
    pub async fn hangup(&self, uuid: &str) -> Result<String, CoreError> {
        let parsed = uuid::Uuid::parse_str(uuid)
            .map_err(|e| CoreError::Validation(format!("invalid call uuid `{uuid}`: {e}")))?;
        let canonical = parsed.hyphenated().to_string();
        let command = UUID_KILL.render(&[("uuid", canonical.as_str())])?;

        let mut channel = self.connector.connect().await?;
        let raw = send_checked(&mut channel, &command).await?;
        info!(uuid = %canonical, "call hung up");
        Ok(raw.as_str().trim().to_owned())
    }

    async fn table(&self, table: &TableCommand) -> Result<Vec<Record>, CoreError> {
        let command = table.template.fixed()?;
        let mut channel = self.connector.connect().await?;
        let raw = send_checked(&mut channel, &command).await?;
        Ok(parse_table(raw.as_str(), &table.schema).rows)
    }

    async fn count(&self, template: &CommandTemplate) -> Result<u64, CoreError> {
        let command = template.fixed()?;
        let mut channel = self.connector.connect().await?;
        let raw = send_checked(&mut channel, &command).await?;

        let value = parse_single_value(raw.as_str());
        value.parse().map_err(|e| CoreError::Command {
            command: command.as_str().to_owned(),
            reply: format!("expected a count, got `{value}`: {e}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use callstats_esl::ScriptedConnector;

    use super::*;

    const CALL_ID: &str = "0b3c2d1e-4f5a-6b7c-8d9e-0f1a2b3c4d5e";

    fn service(connector: ScriptedConnector) -> MonitorService<ScriptedConnector> {
        let mut commands = CommandSet::default();
        commands.calls.set_columns(
            ["uuid", "direction", "cid_num", "dest"].map(String::from).to_vec(),
        );
        MonitorService::new(Arc::new(connector), commands)
    }

    #[tokio::test]
    async fn status_is_a_line_list() {
        let connector = ScriptedConnector::new().respond(
            "status",
            "UP 0 years, 0 days, 1 hour\n\nFreeSWITCH is ready\n  3 session(s) since startup  \n",
        );
        let lines = service(connector).status().await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "FreeSWITCH is ready");
        assert_eq!(lines[2], "3 session(s) since startup");
    }

    #[tokio::test]
    async fn calls_table_skips_header_and_trailer() {
        let connector = ScriptedConnector::new().respond(
            "show calls",
            "uuid,direction,cid_num,dest\n\
             a1,inbound,5551000,1000\n\
             a2,outbound,1000,5552000\n\
             \n\
             2 total.\n",
        );
        let calls = service(connector).calls().await.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["uuid"], "a1");
        assert_eq!(calls[1]["dest"], "5552000");
    }

    #[tokio::test]
    async fn counts_take_the_first_token() {
        let connector = ScriptedConnector::new()
            .respond("show calls count", "\n2 total.\n")
            .respond("show channels count", "5 total.\n");
        let svc = service(connector);
        assert_eq!(svc.calls_count().await.unwrap(), 2);
        assert_eq!(svc.channels_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn hangup_requires_a_uuid() {
        let connector = ScriptedConnector::new();
        let svc = service(connector.clone());
        for bad in ["", "not-a-uuid", "; shutdown", "0b3c2d1e 4f5a"] {
            assert!(svc.hangup(bad).await.unwrap_err().is_validation());
        }
        assert!(connector.sent_commands().is_empty());
    }

    #[tokio::test]
    async fn hangup_sends_uuid_kill() {
        let connector = ScriptedConnector::new()
            .respond(&format!("uuid_kill {CALL_ID}"), "+OK\n");
        let svc = service(connector.clone());

        let reply = svc.hangup(&CALL_ID.to_uppercase()).await.unwrap();
        assert_eq!(reply, "+OK");
        assert_eq!(connector.sent_commands(), vec![format!("uuid_kill {CALL_ID}")]);
    }

    #[tokio::test]
    async fn hangup_of_unknown_call_is_a_command_error() {
        let connector = ScriptedConnector::new()
            .respond(&format!("uuid_kill {CALL_ID}"), "-ERR No such channel!\n");
        let err = service(connector).hangup(CALL_ID).await.unwrap_err();
        assert!(matches!(err, CoreError::Command { .. }));
    }
}
