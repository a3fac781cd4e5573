//! HTTP JSON API for callstats.
//!
//! This crate provides an Axum HTTP server that exposes the call-center,
//! monitor, provisioning and call-control services as JSON endpoints for
//! the dashboard.
//!
//! # Response envelope
//!
//! Success: `{"msg": <payload>}` with status 200. Failure:
//! `{"msg": "<reason>", "error": true}` with 400 (validation and engine
//! failures), 401 (access key), 404 (unknown or disabled route) or 500.
//!
//! # Architecture
//!
//! Handlers receive `State<Arc<AppState<C>>>` where `C` is the
//! [`Connector`](callstats_esl::Connector) in use: the event socket in
//! production, a scripted connector in tests. Every request opens its own
//! control-channel session; nothing is cached between requests.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod monitor;
pub mod router;
pub mod server;
pub mod state;
pub mod users;

// Re-export primary types for convenience.
pub use auth::CredentialStore;
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, bind, serve, start_server};
pub use state::AppState;
