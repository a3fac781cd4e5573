//! Axum router construction.
//!
//! Route groups are mounted according to [`FeatureFlags`]; a disabled group
//! answers like any unknown path, with a 404 envelope. Every request,
//! including unknown paths, must carry the access key. CORS is open so the
//! dashboard can be served from another origin.
//!
//! [`FeatureFlags`]: callstats_core::config::FeatureFlags

use std::sync::Arc;

use axum::Router;
use axum::http::Uri;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use callstats_esl::Connector;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_access_key;
use crate::error::ApiError;
use crate::state::AppState;
use crate::{handlers, monitor, users};

/// Build the complete router.
///
/// - callcenter: `GET /queues/fetch`, `GET /queues/all`,
///   `GET /queues/{queue}/agents|tiers|callers|count`
/// - monitor: `GET /monitor/status`, `GET /monitor/calls[/count]`,
///   `GET /monitor/channels[/count]`
/// - users: `POST /users`, `GET /users/{user_id}`
/// - calls: `DELETE /calls/{uuid}`
pub fn build_router<C: Connector + 'static>(state: Arc<AppState<C>>) -> Router {
    let features = state.features;
    let mut api = Router::new();

    if features.callcenter {
        api = api
            .route("/queues/fetch", get(handlers::list_queues::<C>))
            .route("/queues/all", get(handlers::all_queues::<C>))
            .route("/queues/{queue}/agents", get(handlers::queue_agents::<C>))
            .route("/queues/{queue}/tiers", get(handlers::queue_tiers::<C>))
            .route("/queues/{queue}/callers", get(handlers::queue_callers::<C>))
            .route("/queues/{queue}/count", get(handlers::queue_count::<C>));
    }
    if features.monitor {
        api = api
            .route("/monitor/status", get(monitor::status::<C>))
            .route("/monitor/calls", get(monitor::calls::<C>))
            .route("/monitor/calls/count", get(monitor::calls_count::<C>))
            .route("/monitor/channels", get(monitor::channels::<C>))
            .route("/monitor/channels/count", get(monitor::channels_count::<C>));
    }
    if features.users {
        api = api
            .route("/users", post(users::create_user::<C>))
            .route("/users/{user_id}", get(users::get_user::<C>));
    }
    if features.calls {
        api = api.route("/calls/{uuid}", delete(monitor::hangup::<C>));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api.fallback(not_found)
        .layer(from_fn_with_state(
            Arc::clone(&state.credentials),
            require_access_key,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
