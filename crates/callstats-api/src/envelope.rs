//! The `{"msg": ...}` success envelope.

use axum::Json;
use serde::Serialize;

/// Successful response body: the payload under `msg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope<T> {
    /// The payload.
    pub msg: T,
}

/// Wrap `msg` in the envelope.
pub const fn ok<T: Serialize>(msg: T) -> Json<Envelope<T>> {
    Json(Envelope { msg })
}
