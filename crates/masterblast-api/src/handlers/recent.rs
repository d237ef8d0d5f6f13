use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use masterblast_core::models::{JobSummary, RecentJobsFilter};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentJobsResponse {
    pub jobs: Vec<JobSummary>,
    pub count: usize,
    /// False when only the most recent jobs are listed
    pub filtered: bool,
}

/// The caller's job history, newest first
#[utoipa::path(
    get,
    path = "/api/v0/recent",
    tag = "jobs",
    params(RecentJobsFilter),
    responses(
        (status = 200, description = "Job history", body = RecentJobsResponse),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn recent_jobs(
    caller: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RecentJobsFilter>,
) -> Result<Json<RecentJobsResponse>, HttpAppError> {
    let jobs = state
        .db
        .jobs
        .list_recent(caller.user_id, &filter, state.limits.recent_jobs_limit)
        .await?;

    Ok(Json(RecentJobsResponse {
        count: jobs.len(),
        filtered: filter.is_active(),
        jobs,
    }))
}
