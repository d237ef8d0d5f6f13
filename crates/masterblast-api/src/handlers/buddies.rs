use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use masterblast_core::AppError;

use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v0/buddies/{username}",
    tag = "users",
    params(("username" = String, Path, description = "User to add")),
    responses(
        (status = 204, description = "Buddy added"),
        (status = 400, description = "Cannot add yourself", body = crate::error::ErrorResponse),
        (status = 404, description = "No such user", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn add_buddy(
    caller: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let buddy = state.db.users.get_by_username(&username).await?;
    if buddy.id == caller.user_id {
        return Err(AppError::BadRequest("Cannot add yourself as a buddy".to_string()).into());
    }
    state.db.buddies.add_buddy(caller.user_id, buddy.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v0/buddies/{username}",
    tag = "users",
    params(("username" = String, Path, description = "Buddy to remove")),
    responses(
        (status = 204, description = "Buddy removed"),
        (status = 404, description = "No such user", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn remove_buddy(
    caller: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let buddy = state.db.users.get_by_username(&username).await?;
    state.db.buddies.remove_buddy(caller.user_id, buddy.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
