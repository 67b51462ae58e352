use axum::{body::Bytes, extract::State, Json};
use tracing::{error, info, instrument, warn};

use crate::api::{
    error::ApiError,
    state::AppState,
    types::{MessageResponse, UserRequest},
};
use crate::domain::profile_patch;

/// POST /user -- merge `user_data` into the profile keyed by `user_id`
#[instrument(skip_all, fields(user_id))]
pub async fn store_user_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = UserRequest::from_body(&body).map_err(|e| {
        state.metrics.inc_rejected();
        warn!(error = %e, "Rejected user request");
        e
    })?;
    tracing::Span::current().record("user_id", req.user_id.as_str());

    let patch = profile_patch(req.user_data);
    let fields = patch.len();
    state
        .profiles
        .upsert_profile(&req.user_id, patch)
        .await
        .map_err(|e| {
            state.metrics.inc_store_failures();
            error!(error = %e, "Failed to store user profile");
            ApiError::StorageError(e.to_string())
        })?;

    state.metrics.inc_profile_upserts();
    info!(fields, "User data stored");
    Ok(Json(MessageResponse::new("User data stored")))
}
