use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{BlastJob, HitWithAccession, JobSummary};

/// Registered MasterBlast account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserResponse {
    pub username: String,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Request DTO for creating an account
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request DTO for logging in
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Bearer token issued after signup or login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Request DTO for changing the caller's password
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    pub new_password_confirmation: String,
}

/// Query for the exact-username user search
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchQuery {
    pub name: String,
}

/// Users matching a search; empty when nobody has that username
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSearchResponse {
    pub users: Vec<UserResponse>,
}

/// Whether a job has already been shared with one of the caller's buddies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BuddyShareStatus {
    pub username: String,
    pub shared: bool,
}

/// Response for the results page of a job
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResultsResponse {
    pub job: BlastJob,
    pub hits: Vec<HitWithAccession>,
    pub shared_already: Vec<BuddyShareStatus>,
}

/// Totals over the caller's jobs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PersonaliaStats {
    pub jobs_done: i64,
    pub days_on_masterblast: i64,
    pub total_query_length: i64,
    /// Rounded to two decimals, 0 when there are no jobs
    pub avg_hits_per_job: f64,
    pub longest_query: i64,
}

impl PersonaliaStats {
    /// Fold `(query_length, hit_count)` pairs of every job into the totals.
    pub fn from_jobs(
        registered_at: DateTime<Utc>,
        now: DateTime<Utc>,
        jobs: impl IntoIterator<Item = (i64, i64)>,
    ) -> Self {
        let mut jobs_done = 0;
        let mut total_query_length = 0;
        let mut total_hits = 0;
        let mut longest_query = 0;

        for (query_length, hit_count) in jobs {
            jobs_done += 1;
            total_query_length += query_length;
            total_hits += hit_count;
            longest_query = longest_query.max(query_length);
        }

        let avg_hits_per_job = if jobs_done == 0 {
            0.0
        } else {
            (total_hits as f64 / jobs_done as f64 * 100.0).round() / 100.0
        };

        Self {
            jobs_done,
            days_on_masterblast: (now - registered_at).num_days(),
            total_query_length,
            avg_hits_per_job,
            longest_query,
        }
    }
}

/// Response for the personalia page
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PersonaliaResponse {
    pub user: UserResponse,
    pub stats: PersonaliaStats,
    pub buddies: Vec<UserResponse>,
    pub shared_jobs: Vec<JobSummary>,
}
