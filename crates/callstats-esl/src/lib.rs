//! Control channel to the telephony engine's event socket.
//!
//! The engine is driven through a text protocol: a command string goes in,
//! a text body comes back. This crate owns everything about that exchange:
//!
//! - [`command`] -- [`CommandTemplate`] rendering with whitelisted tokens,
//!   so user input never reaches the socket unchecked
//! - [`vocabulary`] -- the engine commands used by callstats, paired with
//!   the column schema of their table output
//! - [`parse`] -- best-effort parsing of single values, line lists and
//!   delimited tables
//! - [`channel`] -- the [`Connector`] / [`ControlChannel`] seam
//! - [`client`] -- the TCP event-socket implementation
//! - [`scripted`] -- a canned-response implementation for tests and
//!   offline runs
//!
//! # Architecture
//!
//! ```text
//! CommandTemplate --render--> Command --ControlChannel::send--> RawResponse --parse--> rows
//! ```
//!
//! Channels are not pooled and commands are never retried; a failure is
//! reported once to the caller.

pub mod channel;
pub mod client;
pub mod command;
pub mod error;
pub mod parse;
pub mod scripted;
pub mod vocabulary;

pub use channel::{Connector, ControlChannel, RawResponse};
pub use client::{EslChannel, EslConfig, EslConnector};
pub use command::{Command, CommandTemplate};
pub use error::EslError;
pub use parse::{Parsed, ParsedTable, Record, ResponseShape, TableSchema};
pub use scripted::ScriptedConnector;
pub use vocabulary::{CommandSet, TableCommand};
