use masterblast_core::{
    models::{EntrezAccession, EntrezAccessionCache},
    AppError, LookupError,
};
use sqlx::{PgPool, Postgres};

use super::exactly_one;

/// Repository for Entrez accessions and their cached GenBank/FASTA records
#[derive(Clone)]
pub struct AccessionRepository {
    pool: PgPool,
}

impl AccessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "entrez_accessions", db.operation = "select"))]
    pub async fn get_by_code(&self, code: &str) -> Result<EntrezAccession, LookupError> {
        let rows = sqlx::query_as::<Postgres, EntrezAccession>(
            "SELECT id, code, organism, cache_id FROM entrez_accessions WHERE code = $1 LIMIT 2",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await;

        exactly_one("Entrez accession", rows)
    }

    /// Insert an accession. If another worker inserted the same code first, that
    /// row is returned instead.
    #[tracing::instrument(skip(self), fields(db.table = "entrez_accessions", db.operation = "insert"))]
    pub async fn create(&self, code: &str, organism: &str) -> Result<EntrezAccession, AppError> {
        let inserted = sqlx::query_as::<Postgres, EntrezAccession>(
            r#"
            INSERT INTO entrez_accessions (code, organism)
            VALUES ($1, $2)
            ON CONFLICT (code) DO NOTHING
            RETURNING id, code, organism, cache_id
            "#,
        )
        .bind(code)
        .bind(organism)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(accession) => Ok(accession),
            None => Ok(self.get_by_code(code).await?),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "entrez_accession_caches", db.operation = "select"))]
    pub async fn get_cache(&self, cache_id: i64) -> Result<EntrezAccessionCache, LookupError> {
        let rows = sqlx::query_as::<Postgres, EntrezAccessionCache>(
            "SELECT id, genbank, fasta, updated_at FROM entrez_accession_caches WHERE id = $1 LIMIT 2",
        )
        .bind(cache_id)
        .fetch_all(&self.pool)
        .await;

        exactly_one("Entrez accession cache", rows)
    }

    /// Store the fetched records and link them to the accession.
    ///
    /// When a concurrent request linked a cache first, the new row is discarded and
    /// the existing cache is returned.
    #[tracing::instrument(skip(self, genbank, fasta), fields(db.table = "entrez_accession_caches", db.operation = "insert"))]
    pub async fn attach_cache(
        &self,
        accession_id: i64,
        genbank: &str,
        fasta: &str,
    ) -> Result<EntrezAccessionCache, AppError> {
        let mut tx = self.pool.begin().await?;

        let cache = sqlx::query_as::<Postgres, EntrezAccessionCache>(
            r#"
            INSERT INTO entrez_accession_caches (genbank, fasta)
            VALUES ($1, $2)
            RETURNING id, genbank, fasta, updated_at
            "#,
        )
        .bind(genbank)
        .bind(fasta)
        .fetch_one(&mut *tx)
        .await?;

        let linked = sqlx::query(
            "UPDATE entrez_accessions SET cache_id = $2 WHERE id = $1 AND cache_id IS NULL",
        )
        .bind(accession_id)
        .bind(cache.id)
        .execute(&mut *tx)
        .await?;

        if linked.rows_affected() == 1 {
            tx.commit().await?;
            return Ok(cache);
        }

        tx.rollback().await?;
        let existing = sqlx::query_scalar::<Postgres, Option<i64>>(
            "SELECT cache_id FROM entrez_accessions WHERE id = $1",
        )
        .bind(accession_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten()
        .ok_or_else(|| AppError::NotFound("Entrez accession does not exist".to_string()))?;

        Ok(self.get_cache(existing).await?)
    }
}
