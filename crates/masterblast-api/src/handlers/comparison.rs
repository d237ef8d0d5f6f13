use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{extract::State, Json};
use masterblast_core::models::{ComparisonCharts, ComparisonRequest};
use masterblast_core::AppError;

use crate::auth::MaybeUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::permissions::ensure_can_view_job;
use crate::state::AppState;

/// Chart data comparing a selection of hits
#[utoipa::path(
    post,
    path = "/api/v0/comparison",
    tag = "hits",
    request_body = ComparisonRequest,
    responses(
        (status = 200, description = "Chart series", body = ComparisonCharts),
        (status = 400, description = "No hits selected", body = crate::error::ErrorResponse),
        (status = 403, description = "A hit belongs to a job the caller cannot see", body = crate::error::ErrorResponse),
        (status = 404, description = "None of the hits exist", body = crate::error::ErrorResponse)
    ),
    security((), ("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(hit_count = request.hit_ids.len()))]
pub async fn compare_hits(
    caller: MaybeUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ComparisonRequest>,
) -> Result<Json<ComparisonCharts>, HttpAppError> {
    if request.hit_ids.is_empty() {
        return Err(AppError::BadRequest("No hits selected for comparison".to_string()).into());
    }

    let hits = state.db.hits.list_by_ids(&request.hit_ids).await?;
    if hits.is_empty() {
        return Err(AppError::NotFound("None of the selected hits exist".to_string()).into());
    }

    let job_ids: BTreeSet<i64> = hits.iter().map(|h| h.hit.job_id).collect();
    for job_id in job_ids {
        let job = state.db.jobs.get_blast_job(job_id).await?;
        ensure_can_view_job(&state.db, &job, caller.user_id()).await?;
    }

    Ok(Json(ComparisonCharts::from_hits(&hits)))
}
