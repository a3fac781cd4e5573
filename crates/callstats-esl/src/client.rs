//! TCP event-socket client.
//!
//! Protocol summary:
//!
//! ```text
//! engine: Content-Type: auth/request\n\n
//! client: auth <password>\n\n
//! engine: Content-Type: command/reply\nReply-Text: +OK accepted\n\n
//! client: api <command>\n\n
//! engine: Content-Type: api/response\nContent-Length: N\n\n<N bytes of body>
//! ```
//!
//! Every wait (connect, handshake, each command) is bounded by the
//! configured timeout. There is no retry and no reconnect.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::channel::{Connector, ControlChannel, RawResponse};
use crate::command::Command;
use crate::error::EslError;

/// Largest response body the client will buffer.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Connection settings for the event socket.
#[derive(Debug, Clone)]
pub struct EslConfig {
    /// Engine host.
    pub host: String,
    /// Event socket port (8021 by default on the engine side).
    pub port: u16,
    /// Event socket password.
    pub password: String,
    /// Bound on every wait: connect, handshake and each command.
    pub timeout: Duration,
}

impl Default for EslConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8021,
            password: String::from("ClueCon"),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Opens authenticated event-socket sessions.
#[derive(Debug, Clone)]
pub struct EslConnector {
    config: EslConfig,
}

impl EslConnector {
    /// Create a connector for the given settings.
    pub const fn new(config: EslConfig) -> Self {
        Self { config }
    }

    /// The settings this connector uses.
    pub const fn config(&self) -> &EslConfig {
        &self.config
    }
}

impl Connector for EslConnector {
    type Channel = EslChannel;

    async fn connect(&self) -> Result<EslChannel, EslError> {
        EslChannel::open(&self.config).await
    }
}

/// One authenticated event-socket session.
#[derive(Debug)]
pub struct EslChannel {
    stream: BufReader<TcpStream>,
    timeout: Duration,
}

impl EslChannel {
    /// Connect and authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`EslError::Connection`] if the TCP connect fails or the
    /// password is rejected, [`EslError::Timeout`] if either step stalls.
    pub async fn open(config: &EslConfig) -> Result<Self, EslError> {
        let addr = format!("{}:{}", config.host, config.port);
        debug!(addr = addr, "opening event socket");

        let stream = bounded(config.timeout, "connect", TcpStream::connect(&addr))
            .await?
            .map_err(|e| EslError::Connection(format!("connect to {addr} failed: {e}")))?;

        let mut channel = Self {
            stream: BufReader::new(stream),
            timeout: config.timeout,
        };
        let timeout = channel.timeout;
        bounded(timeout, "authentication", channel.authenticate(&config.password)).await??;

        info!(addr = addr, "event socket authenticated");
        Ok(channel)
    }

    async fn authenticate(&mut self, password: &str) -> Result<(), EslError> {
        let greeting = self.read_headers().await?;
        if content_type(&greeting) != Some("auth/request") {
            return Err(EslError::Connection(format!(
                "expected auth/request, got {:?}",
                content_type(&greeting)
            )));
        }

        self.write_frame(&format!("auth {password}")).await?;

        let reply = self.read_headers().await?;
        let reply_text = reply.get("Reply-Text").map_or("", String::as_str);
        if content_type(&reply) == Some("command/reply") && reply_text.starts_with("+OK") {
            Ok(())
        } else {
            Err(EslError::Connection(format!(
                "authentication rejected: {reply_text}"
            )))
        }
    }

    async fn exchange(&mut self, command: &Command) -> Result<RawResponse, EslError> {
        self.write_frame(&format!("api {command}")).await?;

        loop {
            let headers = self.read_headers().await?;
            match content_type(&headers) {
                Some("api/response") => {
                    let body = self.read_body(&headers).await?;
                    return Ok(RawResponse::new(body));
                }
                Some("text/disconnect-notice") => {
                    return Err(EslError::Connection(String::from(
                        "engine sent disconnect notice",
                    )));
                }
                other => {
                    // Not ours (an event or a stray reply); drain it and keep waiting.
                    debug!(content_type = ?other, "ignoring unexpected frame");
                    let _ = self.read_body(&headers).await?;
                }
            }
        }
    }

    async fn write_frame(&mut self, line: &str) -> Result<(), EslError> {
        let frame = format!("{line}\n\n");
        let stream = self.stream.get_mut();
        stream
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| EslError::Connection(format!("write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| EslError::Connection(format!("flush failed: {e}")))
    }

    /// Read `Key: Value` lines up to the blank line that ends a header block.
    async fn read_headers(&mut self) -> Result<BTreeMap<String, String>, EslError> {
        let mut headers = BTreeMap::new();
        let mut line = String::new();

        loop {
            line.clear();
            let read = self
                .stream
                .read_line(&mut line)
                .await
                .map_err(|e| EslError::Connection(format!("read failed: {e}")))?;
            if read == 0 {
                return Err(EslError::Connection(String::from(
                    "connection closed by engine",
                )));
            }

            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                if headers.is_empty() {
                    // Stray separator between frames.
                    continue;
                }
                return Ok(headers);
            }
            if let Some((key, value)) = trimmed.split_once(':') {
                headers.insert(key.trim().to_owned(), value.trim().to_owned());
            }
        }
    }

    async fn read_body(&mut self, headers: &BTreeMap<String, String>) -> Result<String, EslError> {
        let Some(length) = headers.get("Content-Length") else {
            return Ok(String::new());
        };
        let length: usize = length
            .parse()
            .map_err(|e| EslError::Connection(format!("bad Content-Length {length:?}: {e}")))?;
        if length > MAX_BODY_BYTES {
            return Err(EslError::Connection(format!(
                "response body of {length} bytes exceeds limit"
            )));
        }

        let mut body = vec![0_u8; length];
        self.stream
            .read_exact(&mut body)
            .await
            .map_err(|e| EslError::Connection(format!("short body read: {e}")))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl ControlChannel for EslChannel {
    async fn send(&mut self, command: &Command) -> Result<RawResponse, EslError> {
        debug!(command = %command, "sending api command");
        let timeout = self.timeout;
        bounded(timeout, command.as_str(), self.exchange(command)).await?
    }
}

fn content_type(headers: &BTreeMap<String, String>) -> Option<&str> {
    headers.get("Content-Type").map(String::as_str)
}

/// Run `future` under `timeout`, naming what was awaited on expiry.
async fn bounded<F: Future>(
    timeout: Duration,
    waiting_for: &str,
    future: F,
) -> Result<F::Output, EslError> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_elapsed| EslError::Timeout {
            waiting_for: waiting_for.to_owned(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;
    use crate::command::CommandTemplate;

    /// Read one client frame (lines up to the blank line).
    async fn read_frame(reader: &mut BufReader<tokio::net::TcpStream>) -> String {
        let mut frame = String::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                return frame;
            }
            if line.trim().is_empty() {
                return frame;
            }
            frame.push_str(line.trim_end());
        }
    }

    fn api_response(body: &str) -> String {
        format!(
            "Content-Type: api/response\nContent-Length: {}\n\n{body}",
            body.len()
        )
    }

    async fn config_for(listener: &TcpListener) -> EslConfig {
        let addr = listener.local_addr().unwrap();
        EslConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            password: String::from("ClueCon"),
            timeout: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn authenticates_and_runs_a_command() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            reader
                .get_mut()
                .write_all(b"Content-Type: auth/request\n\n")
                .await
                .unwrap();
            assert_eq!(read_frame(&mut reader).await, "auth ClueCon");
            reader
                .get_mut()
                .write_all(b"Content-Type: command/reply\nReply-Text: +OK accepted\n\n")
                .await
                .unwrap();

            assert_eq!(read_frame(&mut reader).await, "api show calls count");
            reader
                .get_mut()
                .write_all(api_response("3 total.\n").as_bytes())
                .await
                .unwrap();
        });

        let mut channel = EslConnector::new(config).connect().await.unwrap();
        let command = CommandTemplate::new("show calls count").fixed().unwrap();
        let response = channel.send(&command).await.unwrap();
        assert_eq!(response.as_str(), "3 total.\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn skips_unrelated_frames_before_the_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            reader
                .get_mut()
                .write_all(b"Content-Type: auth/request\n\n")
                .await
                .unwrap();
            let _ = read_frame(&mut reader).await;
            reader
                .get_mut()
                .write_all(b"Content-Type: command/reply\nReply-Text: +OK accepted\n\n")
                .await
                .unwrap();
            let _ = read_frame(&mut reader).await;
            reader
                .get_mut()
                .write_all(b"Content-Type: text/event-plain\nContent-Length: 5\n\nhello")
                .await
                .unwrap();
            reader
                .get_mut()
                .write_all(api_response("+OK\n").as_bytes())
                .await
                .unwrap();
        });

        let mut channel = EslConnector::new(config).connect().await.unwrap();
        let command = CommandTemplate::new("reloadxml").fixed().unwrap();
        let response = channel.send(&command).await.unwrap();
        assert_eq!(response.as_str(), "+OK\n");
    }

    #[tokio::test]
    async fn rejected_password_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            reader
                .get_mut()
                .write_all(b"Content-Type: auth/request\n\n")
                .await
                .unwrap();
            let _ = read_frame(&mut reader).await;
            reader
                .get_mut()
                .write_all(b"Content-Type: command/reply\nReply-Text: -ERR invalid\n\n")
                .await
                .unwrap();
        });

        let err = EslConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, EslError::Connection(ref msg) if msg.contains("-ERR invalid")));
    }

    #[tokio::test]
    async fn silent_engine_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config_for(&listener).await;
        config.timeout = Duration::from_millis(100);

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // Hold the socket open without greeting.
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(socket);
        });

        let err = EslConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, EslError::Timeout { timeout_ms: 100, .. }));
        server.abort();
    }

    #[tokio::test]
    async fn closed_socket_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let err = EslConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, EslError::Connection(_)));
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_connection_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;
        drop(listener);

        let err = EslConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, EslError::Connection(_)));
    }
}
