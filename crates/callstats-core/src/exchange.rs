//! Sending a command and refusing `-ERR` replies.

use callstats_esl::{Command, ControlChannel, RawResponse};
use tracing::debug;

use crate::error::CoreError;

/// Send `command` on `channel`, turning an engine refusal into
/// [`CoreError::Command`].
pub(crate) async fn send_checked<Ch: ControlChannel>(
    channel: &mut Ch,
    command: &Command,
) -> Result<RawResponse, CoreError> {
    let raw = channel.send(command).await?;
    if raw.is_error() {
        debug!(command = %command, reply = %raw.as_str().trim(), "engine refused command");
        return Err(CoreError::Command {
            command: command.as_str().to_owned(),
            reply: raw.as_str().trim().to_owned(),
        });
    }
    Ok(raw)
}
