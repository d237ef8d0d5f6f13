use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A sequence database entry referenced by one or more hits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EntrezAccession {
    pub id: i64,
    pub code: String,
    pub organism: Option<String>,
    /// Filled the first time a hit on this accession is viewed.
    pub cache_id: Option<i64>,
}

/// GenBank and FASTA records fetched from Entrez for an accession.
///
/// A failed fetch stores the error text instead of the record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EntrezAccessionCache {
    pub id: i64,
    pub genbank: String,
    pub fasta: String,
    pub updated_at: DateTime<Utc>,
}

/// Response for the hit detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HitDetailResponse {
    pub hit: super::HitWithAccession,
    pub job_id: i64,
    pub program: super::BlastProgram,
    pub genbank: String,
    pub fasta: String,
}
