//! User provisioning handlers.
//!
//! `POST /users` creates a directory entry from an
//! [`ExtensionRequest`]; `GET /users/{user_id}` reports whether one exists.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use callstats_esl::Connector;
use callstats_types::{ExtensionRequest, ProvisionedUser};
use validator::Validate;

use crate::envelope::{Envelope, ok};
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /users`
///
/// Length limits are checked first, then the required fields and the
/// duplicate check in the provisioner.
pub async fn create_user<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    body: Result<Json<ExtensionRequest>, JsonRejection>,
) -> Result<Json<Envelope<ProvisionedUser>>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    request.validate()?;
    Ok(ok(state.provisioner.provision(&request).await?))
}

/// `GET /users/{user_id}`
pub async fn get_user<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Envelope<ProvisionedUser>>, ApiError> {
    Ok(ok(state.provisioner.lookup(&user_id).await?))
}
