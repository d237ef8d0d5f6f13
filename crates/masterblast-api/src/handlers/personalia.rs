//! The caller's account page and password change

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use masterblast_core::models::{ChangePasswordRequest, PersonaliaResponse, UserResponse};
use masterblast_core::AppError;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v0/personalia",
    tag = "users",
    responses(
        (status = 200, description = "Account, statistics, buddies and shared jobs", body = PersonaliaResponse),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn personalia(
    caller: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PersonaliaResponse>, HttpAppError> {
    let user = state.db.users.get_by_id(caller.user_id).await?;
    let stats = state
        .db
        .jobs
        .personalia_stats(user.id, user.created_at)
        .await?;
    let buddies = state.db.buddies.list_buddies(user.id).await?;
    let shared_jobs = state.db.jobs.list_shared_with(user.id).await?;

    Ok(Json(PersonaliaResponse {
        user: UserResponse::from(&user),
        stats,
        buddies,
        shared_jobs,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v0/personalia/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Confirmation does not match or password too short", body = crate::error::ErrorResponse),
        (status = 401, description = "Old password wrong or not logged in", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(user_id = %caller.user_id))]
pub async fn change_password(
    caller: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<StatusCode, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    if request.new_password != request.new_password_confirmation {
        return Err(AppError::InvalidInput("The new passwords do not match".to_string()).into());
    }

    let user = state.db.users.get_by_id(caller.user_id).await?;
    if !verify_password(&request.old_password, &user.password_hash)? {
        return Err(AppError::Unauthorized("The old password is incorrect".to_string()).into());
    }

    let password_hash = hash_password(&request.new_password)?;
    state.db.users.update_password(user.id, &password_hash).await?;
    tracing::info!("Password changed");

    Ok(StatusCode::NO_CONTENT)
}
