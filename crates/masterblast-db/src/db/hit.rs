use masterblast_core::{
    models::{BlastHit, HitWithAccession, NewBlastHit},
    AppError, LookupError,
};
use sqlx::{PgPool, Postgres};

use super::exactly_one;

const HIT_WITH_ACCESSION_SELECT: &str = r#"
    SELECT
        h.id, h.job_id, h.accession_id, h.description, h.blast_score, h.bit_score,
        h.e_value, h.identities, h.percentage_identity, h.align_length,
        h.query_start, h.query_end, h.query_coverage, h.subject_seq,
        h.subject_start, h.subject_end,
        a.code AS accession_code,
        a.organism
    FROM blast_hits h
    JOIN entrez_accessions a ON a.id = h.accession_id
"#;

/// Repository for BLAST hits
#[derive(Clone)]
pub struct HitRepository {
    pool: PgPool,
}

impl HitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a hit, deriving percentage identity and query coverage.
    ///
    /// Fails with `InvalidInput` when the alignment or query length is zero.
    #[tracing::instrument(skip(self, hit), fields(db.table = "blast_hits", db.operation = "insert", job_id = hit.job_id))]
    pub async fn create_hit(&self, hit: NewBlastHit) -> Result<BlastHit, AppError> {
        let percentage_identity = hit.percentage_identity().ok_or_else(|| {
            AppError::InvalidInput("BLAST hit has an alignment length of zero".to_string())
        })?;
        let query_coverage = hit.query_coverage().ok_or_else(|| {
            AppError::InvalidInput("BLAST hit belongs to an empty query".to_string())
        })?;

        let created = sqlx::query_as::<Postgres, BlastHit>(
            r#"
            INSERT INTO blast_hits (
                job_id, accession_id, description, blast_score, bit_score, e_value,
                identities, percentage_identity, align_length, query_start, query_end,
                query_coverage, subject_seq, subject_start, subject_end
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING
                id, job_id, accession_id, description, blast_score, bit_score, e_value,
                identities, percentage_identity, align_length, query_start, query_end,
                query_coverage, subject_seq, subject_start, subject_end
            "#,
        )
        .bind(hit.job_id)
        .bind(hit.accession_id)
        .bind(&hit.description)
        .bind(hit.blast_score)
        .bind(hit.bit_score)
        .bind(hit.e_value)
        .bind(hit.identities)
        .bind(percentage_identity)
        .bind(hit.align_length)
        .bind(hit.query_start)
        .bind(hit.query_end)
        .bind(query_coverage)
        .bind(&hit.subject_seq)
        .bind(hit.subject_start)
        .bind(hit.subject_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "blast_hits", db.operation = "select", db.record_id = id))]
    pub async fn get_hit(&self, id: i64) -> Result<HitWithAccession, LookupError> {
        let rows = sqlx::query_as::<Postgres, HitWithAccession>(&format!(
            "{} WHERE h.id = $1 LIMIT 2",
            HIT_WITH_ACCESSION_SELECT
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await;

        exactly_one("BLAST hit", rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "blast_hits", db.operation = "select"))]
    pub async fn list_for_job(&self, job_id: i64) -> Result<Vec<HitWithAccession>, AppError> {
        let hits = sqlx::query_as::<Postgres, HitWithAccession>(&format!(
            "{} WHERE h.job_id = $1 ORDER BY h.e_value ASC, h.id ASC",
            HIT_WITH_ACCESSION_SELECT
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(hits)
    }

    /// Hits with the given ids, in id order. Unknown ids are ignored.
    #[tracing::instrument(skip(self, ids), fields(db.table = "blast_hits", db.operation = "select", count = ids.len()))]
    pub async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<HitWithAccession>, AppError> {
        let hits = sqlx::query_as::<Postgres, HitWithAccession>(&format!(
            "{} WHERE h.id = ANY($1) ORDER BY h.id ASC",
            HIT_WITH_ACCESSION_SELECT
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(hits)
    }
}
