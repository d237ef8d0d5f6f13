use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use masterblast_core::models::{UserResponse, UserSearchQuery, UserSearchResponse};

use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Find a user by exact username
#[utoipa::path(
    get,
    path = "/api/v0/users/search",
    tag = "users",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Zero or one matching user", body = UserSearchResponse),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_users(
    _caller: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<UserSearchResponse>, HttpAppError> {
    let users = match state.db.users.get_by_username(&query.name).await {
        Ok(user) => vec![UserResponse::from(&user)],
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(UserSearchResponse { users }))
}
