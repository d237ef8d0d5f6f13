use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use masterblast_core::models::HitDetailResponse;
use masterblast_services::load_accession_records;

use crate::auth::MaybeUser;
use crate::error::HttpAppError;
use crate::permissions::ensure_can_view_hit;
use crate::state::AppState;

/// A single hit with the GenBank and FASTA records of its subject
///
/// The records are fetched from Entrez on first view and cached afterwards.
#[utoipa::path(
    get,
    path = "/api/v0/hits/{id}",
    tag = "hits",
    params(("id" = i64, Path, description = "Hit id")),
    responses(
        (status = 200, description = "Hit detail", body = HitDetailResponse),
        (status = 403, description = "Hit belongs to someone else's job", body = crate::error::ErrorResponse),
        (status = 404, description = "No such hit", body = crate::error::ErrorResponse)
    ),
    security((), ("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller))]
pub async fn hit_detail(
    caller: MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<HitDetailResponse>, HttpAppError> {
    let hit = state.db.hits.get_hit(id).await?;
    let job = state.db.jobs.get_blast_job(hit.hit.job_id).await?;
    ensure_can_view_hit(&job, caller.user_id())?;

    let accession = state.db.accessions.get_by_code(&hit.accession_code).await?;
    let records = load_accession_records(
        &state.db.accessions,
        state.blast.entrez.as_ref(),
        &accession,
        job.program,
    )
    .await?;

    Ok(Json(HitDetailResponse {
        job_id: job.id,
        program: job.program,
        genbank: records.genbank,
        fasta: records.fasta,
        hit,
    }))
}
