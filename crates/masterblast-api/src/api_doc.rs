//! OpenAPI documentation.
//! Paths in handler annotations use the literal /api/v0; they are rewritten to
//! `crate::constants::API_VERSION` when the document is served.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::constants::API_VERSION;
use crate::error;
use crate::handlers;
use masterblast_core::{models, SequenceValidation};

const OPENAPI_PATH_PLACEHOLDER: &str = "/api/v0";

fn transform_openapi_paths(spec: &mut utoipa::openapi::OpenApi, version: &str) {
    let replacement = format!("/api/{}", version);
    if OPENAPI_PATH_PLACEHOLDER == replacement {
        return;
    }
    let path_map = std::mem::take(&mut spec.paths.paths);
    for (key, item) in path_map {
        let new_key = key.replacen(OPENAPI_PATH_PLACEHOLDER, &replacement, 1);
        spec.paths.paths.insert(new_key, item);
    }
}

/// The served document, with paths under the current API version.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    transform_openapi_paths(&mut spec, API_VERSION);
    spec
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MasterBlast API",
        version = "0.1.0",
        description = "Submit DNA or protein sequences to NCBI BLAST, browse the hits with their GenBank and FASTA records, compare hits, and share jobs with buddies. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::health::health,
        handlers::health::ready,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::jobs::submit_job,
        handlers::jobs::job_status,
        handlers::jobs::job_loading,
        handlers::jobs::job_results,
        handlers::jobs::share_job,
        handlers::recent::recent_jobs,
        handlers::hits::hit_detail,
        handlers::comparison::compare_hits,
        handlers::personalia::personalia,
        handlers::personalia::change_password,
        handlers::users::search_users,
        handlers::buddies::add_buddy,
        handlers::buddies::remove_buddy,
    ),
    components(
        schemas(
            models::BlastProgram,
            models::BlastJob,
            models::JobStatusResponse,
            models::LoadingResponse,
            models::SubmitJobResponse,
            models::JobSummary,
            models::JobResultsResponse,
            models::BlastHit,
            models::HitWithAccession,
            models::HitDetailResponse,
            models::ComparisonRequest,
            models::ComparisonCharts,
            models::ChartPoint,
            models::EValueSlice,
            models::EValueCategory,
            models::UserResponse,
            models::SignupRequest,
            models::LoginRequest,
            models::TokenResponse,
            models::ChangePasswordRequest,
            models::UserSearchResponse,
            models::BuddyShareStatus,
            models::PersonaliaStats,
            models::PersonaliaResponse,
            SequenceValidation,
            handlers::health::HealthResponse,
            handlers::jobs::SubmitJobForm,
            handlers::recent::RecentJobsResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Signup and login"),
        (name = "jobs", description = "BLAST submission, polling, results and sharing"),
        (name = "hits", description = "Hit detail with Entrez records, and hit comparison"),
        (name = "users", description = "Account page, user search and buddies")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_versioned_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v0/jobs"));
        assert!(spec.paths.paths.contains_key("/api/v0/hits/{id}"));
        assert!(spec
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }

    #[test]
    fn test_transform_rewrites_prefix() {
        let mut spec = ApiDoc::openapi();
        transform_openapi_paths(&mut spec, "v9");
        assert!(spec.paths.paths.contains_key("/api/v9/health"));
        assert!(!spec.paths.paths.contains_key("/api/v0/health"));
    }
}
