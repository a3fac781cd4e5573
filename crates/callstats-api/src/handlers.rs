//! Call-center endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/queues/fetch` | Registered queue names |
//! | `GET` | `/queues/all` | Agents and callers of every queue |
//! | `GET` | `/queues/{queue}/agents` | Agents with tiers and names |
//! | `GET` | `/queues/{queue}/tiers` | Tier rows |
//! | `GET` | `/queues/{queue}/callers` | Callers in queue order |
//! | `GET` | `/queues/{queue}/count` | Member count |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use callstats_esl::Connector;
use callstats_types::{Agent, Caller, QueueView, Tier};

use crate::envelope::{Envelope, ok};
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /queues/fetch`
pub async fn list_queues<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<Envelope<Vec<String>>> {
    ok(state.queues.list_queues())
}

/// `GET /queues/all`
pub async fn all_queues<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Envelope<Vec<QueueView>>>, ApiError> {
    Ok(ok(state.queues.build_all_queues().await?))
}

/// `GET /queues/{queue}/agents`
pub async fn queue_agents<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Path(queue): Path<String>,
) -> Result<Json<Envelope<Vec<Agent>>>, ApiError> {
    Ok(ok(state.queues.build_agent_view(&queue).await?))
}

/// `GET /queues/{queue}/tiers`
pub async fn queue_tiers<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Path(queue): Path<String>,
) -> Result<Json<Envelope<Vec<Tier>>>, ApiError> {
    Ok(ok(state.queues.build_tier_view(&queue).await?))
}

/// `GET /queues/{queue}/callers`
pub async fn queue_callers<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Path(queue): Path<String>,
) -> Result<Json<Envelope<Vec<Caller>>>, ApiError> {
    Ok(ok(state.queues.build_caller_view(&queue).await?))
}

/// `GET /queues/{queue}/count`
pub async fn queue_count<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Path(queue): Path<String>,
) -> Result<Json<Envelope<u64>>, ApiError> {
    Ok(ok(state.queues.count_callers(&queue).await?))
}
