use masterblast_core::{models::User, AppError, LookupError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::exactly_one;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

/// Repository for user accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an account. A taken username is reported as `Conflict`.
    #[tracing::instrument(skip(self, password_hash), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Username '{}' is already taken", username))
            }
            other => AppError::Database(other),
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<User, LookupError> {
        let rows = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 LIMIT 2",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await;

        exactly_one("User", rows)
    }

    /// Exact, case-sensitive username lookup.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn get_by_username(&self, username: &str) -> Result<User, LookupError> {
        let rows = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE username = $1 LIMIT 2",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await;

        exactly_one("User", rows)
    }

    #[tracing::instrument(skip(self, password_hash), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User does not exist".to_string()));
        }
        Ok(())
    }
}
