//! Submission, polling, results and sharing of BLAST jobs

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use masterblast_core::models::{
    BlastProgram, JobResultsResponse, JobStatusResponse, LoadingResponse, NewBlastJob,
    SubmitJobResponse,
};
use masterblast_core::{
    normalize_sequence_form, read_sequence_file, validate_sequence_form, AppError, SequenceForm,
    SequenceValidation, UploadedSequenceFile,
};

use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{AuthUser, MaybeUser};
use crate::constants::API_PREFIX;
use crate::error::HttpAppError;
use crate::permissions::ensure_can_view_job;
use crate::state::AppState;
use crate::task_dispatch::dispatch_blast_job;

/// Multipart fields of a submission, as documented in the OpenAPI schema
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitJobForm {
    /// `blastn` or `blastp`
    #[serde(rename = "blast-mode")]
    pub blast_mode: String,
    /// Empty to derive the title from the FASTA header
    #[serde(rename = "job-name")]
    pub job_name: String,
    #[serde(rename = "seq-text")]
    pub seq_text: String,
    /// Takes precedence over `seq-text` when not empty
    #[serde(rename = "seq-file")]
    #[schema(value_type = Option<String>, format = Binary)]
    pub seq_file: Option<Vec<u8>>,
}

/// Collect the multipart parts of the sequence form.
///
/// A file input left empty by the browser arrives as a part with an empty file
/// name and no content; it is treated as absent.
async fn read_sequence_form(mut multipart: Multipart) -> Result<SequenceForm, HttpAppError> {
    let mut form = SequenceForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "seq-file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?.to_vec();
                if file_name.as_deref() == Some("") && bytes.is_empty() {
                    continue;
                }
                form.seq_file = Some(UploadedSequenceFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "blast-mode" | "job-name" | "seq-text" => {
                let bytes = field.bytes().await?;
                let value = String::from_utf8(bytes.to_vec()).ok();
                match name.as_str() {
                    "blast-mode" => form.blast_mode = value,
                    "job-name" => form.job_name = value,
                    _ => form.seq_text = value,
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    form.seq_file_text = Some(read_sequence_file(form.seq_file.as_ref()));
    Ok(form)
}

/// Submit a sequence for BLAST
///
/// Multipart fields: `blast-mode` (`blastn` or `blastp`), `job-name`, and the
/// sequence as `seq-text` or as an uploaded `seq-file`.
#[utoipa::path(
    post,
    path = "/api/v0/jobs",
    tag = "jobs",
    request_body(content = SubmitJobForm, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Invalid form, error is e.g. `Error: INVALID_SEQUENCE`", body = crate::error::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::error::ErrorResponse)
    ),
    security((), ("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller, multipart))]
pub async fn submit_job(
    caller: MaybeUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitJobResponse>), HttpAppError> {
    let form = read_sequence_form(multipart).await?;

    let outcome = validate_sequence_form(&form);
    if !outcome.is_valid() {
        tracing::debug!(code = outcome.code(), "Sequence form rejected");
        return Err(AppError::InvalidSequenceForm(outcome).into());
    }

    let program: BlastProgram = form
        .blast_mode
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| AppError::InvalidSequenceForm(SequenceValidation::InvalidMode))?;
    let normalized = normalize_sequence_form(&form);
    if normalized.sequence.is_empty() {
        tracing::debug!("Uploaded sequence file is empty or unreadable");
        return Err(AppError::InvalidSequenceForm(SequenceValidation::MissingSequence).into());
    }

    let job = state
        .db
        .jobs
        .create_blast_job(NewBlastJob {
            user_id: caller.user_id(),
            title: form.job_name.unwrap_or_default(),
            program,
            header: normalized.header,
            sequence: normalized.sequence,
        })
        .await?;

    let dispatch = dispatch_blast_job(&state, job.id).await;
    tracing::info!(job_id = job.id, program = %job.program, dispatch = ?dispatch, "BLAST job submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            id: job.id,
            title: job.title,
            program: job.program,
            loading_url: format!("{}/jobs/{}/loading", API_PREFIX, job.id),
        }),
    ))
}

/// Whether a job has finished
///
/// A job that cannot be checked reports `false` so clients keep polling.
#[utoipa::path(
    get,
    path = "/api/v0/jobs/{id}/status",
    tag = "jobs",
    params(("id" = i64, Path, description = "Job id")),
    responses((status = 200, description = "Completion flag", body = JobStatusResponse))
)]
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<JobStatusResponse> {
    let status = match state.db.jobs.is_processed(id).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(job_id = id, error = %e, "Failed to check BLAST job status");
            false
        }
    };
    Json(JobStatusResponse { status })
}

/// Loading page data, or a redirect to the results once the job is done
#[utoipa::path(
    get,
    path = "/api/v0/jobs/{id}/loading",
    tag = "jobs",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job still running", body = LoadingResponse),
        (status = 303, description = "Job finished, see the results")
    )
)]
pub async fn job_loading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, HttpAppError> {
    match state.db.jobs.unprocessed_title(id).await? {
        Some(title) => Ok(Json(LoadingResponse { title }).into_response()),
        None => Ok(Redirect::to(&format!("{}/jobs/{}", API_PREFIX, id)).into_response()),
    }
}

/// Results of a job with its hits
#[utoipa::path(
    get,
    path = "/api/v0/jobs/{id}",
    tag = "jobs",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job and hits", body = JobResultsResponse),
        (status = 403, description = "Job belongs to someone else", body = crate::error::ErrorResponse),
        (status = 404, description = "No such job", body = crate::error::ErrorResponse)
    ),
    security((), ("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller))]
pub async fn job_results(
    caller: MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<JobResultsResponse>, HttpAppError> {
    let job = state.db.jobs.get_blast_job(id).await?;
    ensure_can_view_job(&state.db, &job, caller.user_id()).await?;

    let hits = state.db.hits.list_for_job(id).await?;
    let shared_already = match caller.user_id() {
        Some(user_id) => state.db.buddies.share_status(user_id, id).await?,
        None => Vec::new(),
    };

    Ok(Json(JobResultsResponse {
        job,
        hits,
        shared_already,
    }))
}

/// Share a job with one of the caller's buddies
#[utoipa::path(
    post,
    path = "/api/v0/jobs/{id}/share/{username}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job id"),
        ("username" = String, Path, description = "User to share with")
    ),
    responses(
        (status = 204, description = "Shared"),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller cannot see the job", body = crate::error::ErrorResponse),
        (status = 404, description = "Job or user not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn share_job(
    caller: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((id, username)): Path<(i64, String)>,
) -> Result<StatusCode, HttpAppError> {
    let job = state.db.jobs.get_blast_job(id).await?;
    ensure_can_view_job(&state.db, &job, Some(caller.user_id)).await?;

    let buddy = state.db.users.get_by_username(&username).await?;
    if buddy.id == caller.user_id {
        return Err(AppError::BadRequest("Cannot share a job with yourself".to_string()).into());
    }

    state.db.buddies.share_job(buddy.id, id).await?;
    tracing::info!(job_id = id, buddy = %buddy.username, "BLAST job shared");

    Ok(StatusCode::NO_CONTENT)
}
