use masterblast_core::{
    models::{BuddyShareStatus, UserResponse},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for buddy lists and jobs shared between users
#[derive(Clone)]
pub struct BuddyRepository {
    pool: PgPool,
}

impl BuddyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add `buddy_id` to the buddy list of `user_id`. Adding twice is a no-op.
    #[tracing::instrument(skip(self), fields(db.table = "blast_buddies", db.operation = "insert"))]
    pub async fn add_buddy(&self, user_id: Uuid, buddy_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO blast_buddies (user_id, buddy_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(buddy_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "blast_buddies", db.operation = "delete"))]
    pub async fn remove_buddy(&self, user_id: Uuid, buddy_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM blast_buddies WHERE user_id = $1 AND buddy_id = $2")
            .bind(user_id)
            .bind(buddy_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "blast_buddies", db.operation = "select"))]
    pub async fn list_buddies(&self, user_id: Uuid) -> Result<Vec<UserResponse>, AppError> {
        let buddies = sqlx::query_as::<Postgres, UserResponse>(
            r#"
            SELECT u.username, u.email
            FROM blast_buddies b
            JOIN users u ON u.id = b.buddy_id
            WHERE b.user_id = $1
            ORDER BY u.username ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(buddies)
    }

    /// Share a job with a user. Sharing twice is a no-op.
    #[tracing::instrument(skip(self), fields(db.table = "shared_jobs", db.operation = "insert"))]
    pub async fn share_job(&self, user_id: Uuid, job_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO shared_jobs (user_id, job_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "shared_jobs", db.operation = "select"))]
    pub async fn is_shared_with(&self, user_id: Uuid, job_id: i64) -> Result<bool, AppError> {
        let shared = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM shared_jobs WHERE user_id = $1 AND job_id = $2)",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(shared)
    }

    /// For each buddy of `user_id`, whether `job_id` is already shared with them.
    #[tracing::instrument(skip(self), fields(db.table = "shared_jobs", db.operation = "select"))]
    pub async fn share_status(
        &self,
        user_id: Uuid,
        job_id: i64,
    ) -> Result<Vec<BuddyShareStatus>, AppError> {
        let statuses = sqlx::query_as::<Postgres, BuddyShareStatus>(
            r#"
            SELECT
                u.username,
                EXISTS(
                    SELECT 1 FROM shared_jobs s WHERE s.user_id = u.id AND s.job_id = $2
                ) AS shared
            FROM blast_buddies b
            JOIN users u ON u.id = b.buddy_id
            WHERE b.user_id = $1
            ORDER BY u.username ASC
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(statuses)
    }
}
