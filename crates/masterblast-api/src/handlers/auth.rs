use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use masterblast_core::models::{LoginRequest, SignupRequest, TokenResponse, User, UserResponse};
use masterblast_core::AppError;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

fn token_response(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    Ok(TokenResponse {
        access_token: state.security.jwt.issue(user)?,
        token_type: "Bearer".to_string(),
        expires_in: state.security.jwt.expires_in(),
        user: UserResponse::from(user),
    })
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/v0/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username taken", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(username = %request.username))]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let password_hash = hash_password(&request.password)?;
    let user = state
        .db
        .users
        .create_user(&request.username, &request.email, &password_hash)
        .await?;

    Ok((StatusCode::CREATED, Json(token_response(&state, &user)?)))
}

/// Exchange username and password for an access token
#[utoipa::path(
    post,
    path = "/api/v0/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Bad credentials", body = crate::error::ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let bad_credentials = || AppError::Unauthorized("Invalid username or password".to_string());

    let user = match state.db.users.get_by_username(&request.username).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Err(bad_credentials().into()),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::info!("Login rejected");
        return Err(bad_credentials().into());
    }

    Ok(Json(token_response(&state, &user)?))
}
