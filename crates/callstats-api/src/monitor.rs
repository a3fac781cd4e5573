//! Engine monitor and call-control handlers.
//!
//! `GET /monitor/status`, `/monitor/calls`, `/monitor/calls/count`,
//! `/monitor/channels`, `/monitor/channels/count` and `DELETE /calls/{uuid}`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use callstats_esl::{Connector, Record};
use tracing::info;

use crate::envelope::{Envelope, ok};
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /monitor/status`
pub async fn status<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Envelope<Vec<String>>>, ApiError> {
    Ok(ok(state.monitor.status().await?))
}

/// `GET /monitor/calls`
pub async fn calls<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Envelope<Vec<Record>>>, ApiError> {
    Ok(ok(state.monitor.calls().await?))
}

/// `GET /monitor/calls/count`
pub async fn calls_count<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Envelope<u64>>, ApiError> {
    Ok(ok(state.monitor.calls_count().await?))
}

/// `GET /monitor/channels`
pub async fn channels<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Envelope<Vec<Record>>>, ApiError> {
    Ok(ok(state.monitor.channels().await?))
}

/// `GET /monitor/channels/count`
pub async fn channels_count<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Envelope<u64>>, ApiError> {
    Ok(ok(state.monitor.channels_count().await?))
}

/// `DELETE /calls/{uuid}`
pub async fn hangup<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Path(uuid): Path<String>,
) -> Result<Json<Envelope<String>>, ApiError> {
    let reply = state.monitor.hangup(&uuid).await?;
    info!(uuid = %uuid, "hangup requested over HTTP");
    Ok(ok(reply))
}
