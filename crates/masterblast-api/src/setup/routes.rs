//! Route configuration and setup

use crate::constants::{API_PREFIX, OPENAPI_JSON_PATH};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use masterblast_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Requests served at once before the server starts queueing
const HTTP_CONCURRENCY_LIMIT: usize = 1_024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = state.limits.max_upload_size_bytes;

    let app = api_routes()
        .route(
            OPENAPI_JSON_PATH,
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_JSON_PATH).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Every versioned endpoint. Handlers that need a caller take `AuthUser` or
/// `MaybeUser` themselves.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/health", API_PREFIX), get(handlers::health::health))
        .route(&format!("{}/ready", API_PREFIX), get(handlers::health::ready))
        .merge(auth_routes())
        .merge(job_routes())
        .merge(hit_routes())
        .merge(user_routes())
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/auth/signup", API_PREFIX),
            post(handlers::auth::signup),
        )
        .route(
            &format!("{}/auth/login", API_PREFIX),
            post(handlers::auth::login),
        )
}

fn job_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/jobs", API_PREFIX),
            post(handlers::jobs::submit_job),
        )
        .route(
            &format!("{}/jobs/{{id}}", API_PREFIX),
            get(handlers::jobs::job_results),
        )
        .route(
            &format!("{}/jobs/{{id}}/status", API_PREFIX),
            get(handlers::jobs::job_status),
        )
        .route(
            &format!("{}/jobs/{{id}}/loading", API_PREFIX),
            get(handlers::jobs::job_loading),
        )
        .route(
            &format!("{}/jobs/{{id}}/share/{{username}}", API_PREFIX),
            post(handlers::jobs::share_job),
        )
}

fn hit_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/hits/{{id}}", API_PREFIX),
            get(handlers::hits::hit_detail),
        )
        .route(
            &format!("{}/comparison", API_PREFIX),
            post(handlers::comparison::compare_hits),
        )
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/recent", API_PREFIX),
            get(handlers::recent::recent_jobs),
        )
        .route(
            &format!("{}/personalia", API_PREFIX),
            get(handlers::personalia::personalia),
        )
        .route(
            &format!("{}/personalia/password", API_PREFIX),
            post(handlers::personalia::change_password),
        )
        .route(
            &format!("{}/users/search", API_PREFIX),
            get(handlers::users::search_users),
        )
        .route(
            &format!("{}/buddies/{{username}}", API_PREFIX),
            post(handlers::buddies::add_buddy).delete(handlers::buddies::remove_buddy),
        )
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::debug!("CORS configured to allow all origins");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
