use masterblast_core::{
    models::{BlastJob, JobSummary, NewBlastJob, PersonaliaStats, RecentJobsFilter},
    AppError, LookupError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::{escape_like, exactly_one};

const JOB_COLUMNS: &str =
    "id, user_id, title, program, header, sequence, created_at, error_msg";

const SUMMARY_SELECT: &str = r#"
    SELECT
        j.id,
        j.title,
        j.program,
        j.created_at,
        j.error_msg,
        COUNT(h.id) AS hit_count,
        CHAR_LENGTH(j.sequence)::BIGINT AS query_length
    FROM blast_jobs j
    LEFT JOIN blast_hits h ON h.job_id = j.id
"#;

/// Repository for BLAST jobs and their unprocessed markers.
///
/// A job is "unprocessed" while a row in `unprocessed_blast_jobs` references it.
/// The marker is inserted in the same transaction as the job and removed once the
/// run finishes, successfully or not.
#[derive(Clone)]
pub struct BlastJobRepository {
    pool: PgPool,
}

impl BlastJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a job and its unprocessed marker atomically.
    #[tracing::instrument(skip(self, new_job), fields(db.table = "blast_jobs", db.operation = "insert", program = %new_job.program))]
    pub async fn create_blast_job(&self, new_job: NewBlastJob) -> Result<BlastJob, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar::<Postgres, i64>(
            r#"
            INSERT INTO blast_jobs (user_id, program, header, sequence)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(new_job.user_id)
        .bind(new_job.program)
        .bind(&new_job.header)
        .bind(&new_job.sequence)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert BLAST job");
            AppError::Database(e)
        })?;

        let title = new_job.resolve_title(id);
        let job = sqlx::query_as::<Postgres, BlastJob>(&format!(
            "UPDATE blast_jobs SET title = $2 WHERE id = $1 RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(&title)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO unprocessed_blast_jobs (job_id) VALUES ($1)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, job_id = id, "Failed to commit BLAST job creation");
            AppError::Database(e)
        })?;

        tracing::info!(job_id = id, title = %job.title, "BLAST job created");
        Ok(job)
    }

    #[tracing::instrument(skip(self), fields(db.table = "blast_jobs", db.operation = "select", db.record_id = id))]
    pub async fn get_blast_job(&self, id: i64) -> Result<BlastJob, LookupError> {
        let rows = sqlx::query_as::<Postgres, BlastJob>(&format!(
            "SELECT {} FROM blast_jobs WHERE id = $1 LIMIT 2",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await;

        exactly_one("BLAST job", rows)
    }

    /// Record why the job's run failed.
    #[tracing::instrument(skip(self), fields(db.table = "blast_jobs", db.operation = "update", db.record_id = id))]
    pub async fn set_error_msg(&self, id: i64, error_msg: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE blast_jobs SET error_msg = $2 WHERE id = $1")
            .bind(id)
            .bind(error_msg)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// True unless an unprocessed marker exists for the job.
    ///
    /// A job id that was never created also reports true.
    #[tracing::instrument(skip(self), fields(db.table = "unprocessed_blast_jobs", db.operation = "select"))]
    pub async fn is_processed(&self, job_id: i64) -> Result<bool, AppError> {
        let processed = sqlx::query_scalar::<Postgres, bool>(
            "SELECT NOT EXISTS(SELECT 1 FROM unprocessed_blast_jobs WHERE job_id = $1)",
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(processed)
    }

    /// Remove the job's unprocessed marker. Removing an absent marker is a no-op.
    #[tracing::instrument(skip(self), fields(db.table = "unprocessed_blast_jobs", db.operation = "delete"))]
    pub async fn mark_processed(&self, job_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM unprocessed_blast_jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(job_id, "BLAST job was already marked as processed");
        }
        Ok(())
    }

    /// Title of a job that is still running, `None` once it has been processed.
    #[tracing::instrument(skip(self), fields(db.table = "unprocessed_blast_jobs", db.operation = "select"))]
    pub async fn unprocessed_title(&self, job_id: i64) -> Result<Option<String>, AppError> {
        let title = sqlx::query_scalar::<Postgres, String>(
            r#"
            SELECT j.title
            FROM unprocessed_blast_jobs u
            JOIN blast_jobs j ON j.id = u.job_id
            WHERE u.job_id = $1
            LIMIT 1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(title)
    }

    /// The caller's jobs, newest first.
    ///
    /// Without an active filter only the `default_limit` most recent jobs are
    /// returned; with one, every matching job is.
    #[tracing::instrument(skip(self), fields(db.table = "blast_jobs", db.operation = "select"))]
    pub async fn list_recent(
        &self,
        user_id: Uuid,
        filter: &RecentJobsFilter,
        default_limit: i64,
    ) -> Result<Vec<JobSummary>, AppError> {
        let title = filter
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(escape_like);
        let limit = if filter.is_active() {
            None
        } else {
            Some(default_limit)
        };

        let jobs = sqlx::query_as::<Postgres, JobSummary>(&format!(
            r#"
            {}
            WHERE j.user_id = $1
              AND ($2::TEXT IS NULL OR j.title ILIKE '%' || $2 || '%')
              AND ($3::DATE IS NULL OR (j.created_at AT TIME ZONE 'UTC')::DATE = $3)
              AND ($4::BIGINT IS NULL OR CHAR_LENGTH(j.sequence) >= $4)
              AND ($5::BIGINT IS NULL OR CHAR_LENGTH(j.sequence) <= $5)
            GROUP BY j.id
            ORDER BY j.created_at DESC, j.id DESC
            LIMIT $6
            "#,
            SUMMARY_SELECT
        ))
        .bind(user_id)
        .bind(title)
        .bind(filter.date)
        .bind(filter.min_length)
        .bind(filter.max_length)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Jobs other users shared with `user_id`.
    #[tracing::instrument(skip(self), fields(db.table = "shared_jobs", db.operation = "select"))]
    pub async fn list_shared_with(&self, user_id: Uuid) -> Result<Vec<JobSummary>, AppError> {
        let jobs = sqlx::query_as::<Postgres, JobSummary>(&format!(
            r#"
            {}
            JOIN shared_jobs s ON s.job_id = j.id
            WHERE s.user_id = $1
            GROUP BY j.id, s.shared_at
            ORDER BY s.shared_at DESC
            "#,
            SUMMARY_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Totals over every job the user submitted.
    #[tracing::instrument(skip(self, registered_at), fields(db.table = "blast_jobs", db.operation = "select"))]
    pub async fn personalia_stats(
        &self,
        user_id: Uuid,
        registered_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<PersonaliaStats, AppError> {
        let rows = sqlx::query_as::<Postgres, (i64, i64)>(
            r#"
            SELECT CHAR_LENGTH(j.sequence)::BIGINT, COUNT(h.id)
            FROM blast_jobs j
            LEFT JOIN blast_hits h ON h.job_id = j.id
            WHERE j.user_id = $1
            GROUP BY j.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PersonaliaStats::from_jobs(
            registered_at,
            chrono::Utc::now(),
            rows,
        ))
    }

    /// Fail every job whose marker is older than `grace_period_secs`.
    ///
    /// The markers are removed and `error_msg` is set in one statement. Returns the
    /// ids of the reaped jobs.
    #[tracing::instrument(skip(self), fields(db.table = "unprocessed_blast_jobs", db.operation = "delete"))]
    pub async fn reap_stale_jobs(
        &self,
        grace_period_secs: i64,
        error_msg: &str,
    ) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, i64>(
            r#"
            WITH stale AS (
                DELETE FROM unprocessed_blast_jobs
                WHERE created_at < NOW() - make_interval(secs => $1)
                RETURNING job_id
            )
            UPDATE blast_jobs
            SET error_msg = $2
            FROM stale
            WHERE blast_jobs.id = stale.job_id
            RETURNING blast_jobs.id
            "#,
        )
        .bind(grace_period_secs as f64)
        .bind(error_msg)
        .fetch_all(&self.pool)
        .await?;

        if !ids.is_empty() {
            tracing::warn!(count = ids.len(), job_ids = ?ids, "Reaped stale BLAST jobs");
        }
        Ok(ids)
    }
}
