use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// BLAST program a job runs with. Stored as its lowercase name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum BlastProgram {
    /// Nucleotide query against a nucleotide database
    Blastn,
    /// Protein query against a protein database
    Blastp,
}

impl BlastProgram {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlastProgram::Blastn => "blastn",
            BlastProgram::Blastp => "blastp",
        }
    }

    /// Residues accepted in a query for this program, lowercase.
    pub fn alphabet(&self) -> &'static str {
        match self {
            BlastProgram::Blastn => "atcg",
            BlastProgram::Blastp => "acdefghiklmnpqrstvwy",
        }
    }

    /// Entrez database that holds the subjects of a hit.
    pub fn entrez_db(&self) -> &'static str {
        match self {
            BlastProgram::Blastn => "nucleotide",
            BlastProgram::Blastp => "protein",
        }
    }
}

impl Display for BlastProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlastProgram {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blastn" => Ok(BlastProgram::Blastn),
            "blastp" => Ok(BlastProgram::Blastp),
            _ => Err(anyhow::anyhow!("Unsupported BLAST program: {}", s)),
        }
    }
}

/// A submitted BLAST query.
///
/// Immutable after creation apart from `error_msg`, which is set when the run fails.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BlastJob {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub program: BlastProgram,
    /// FASTA header without the leading `>`, empty when none was given.
    pub header: String,
    pub sequence: String,
    pub created_at: DateTime<Utc>,
    pub error_msg: Option<String>,
}

impl BlastJob {
    pub fn query_length(&self) -> usize {
        self.sequence.chars().count()
    }

    pub fn is_owned_by(&self, user_id: Option<Uuid>) -> bool {
        matches!((self.user_id, user_id), (Some(owner), Some(caller)) if owner == caller)
    }
}

/// Input for creating a job together with its unprocessed marker.
#[derive(Debug, Clone)]
pub struct NewBlastJob {
    pub user_id: Option<Uuid>,
    /// Title typed by the user, empty when none was given.
    pub title: String,
    pub program: BlastProgram,
    pub header: String,
    pub sequence: String,
}

impl NewBlastJob {
    /// Title to store for the job with the given id.
    ///
    /// A typed title wins, then the first space-separated token of the header,
    /// then `MasterBlast{id}`.
    pub fn resolve_title(&self, id: i64) -> String {
        let title = if !self.title.is_empty() {
            self.title.as_str()
        } else {
            self.header.split(' ').next().unwrap_or_default()
        };
        if title.is_empty() {
            return format!("{}{}", crate::constants::DEFAULT_TITLE_PREFIX, id);
        }
        title
            .chars()
            .take(crate::constants::MAX_TITLE_LENGTH)
            .collect()
    }
}

/// Response for the job status polling endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    /// True once the job has finished, successfully or not
    pub status: bool,
}

/// Response for a job that is still running
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoadingResponse {
    pub title: String,
}

/// Response after a successful submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobResponse {
    pub id: i64,
    pub title: String,
    pub program: BlastProgram,
    /// Where to poll for completion
    pub loading_url: String,
}

/// Filters on the caller's job history. All are optional and combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentJobsFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Day the job was submitted on
    pub date: Option<NaiveDate>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
}

impl RecentJobsFilter {
    pub fn is_active(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
            || self.date.is_some()
            || self.min_length.is_some()
            || self.max_length.is_some()
    }
}

/// A row of the job history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JobSummary {
    pub id: i64,
    pub title: String,
    pub program: BlastProgram,
    pub created_at: DateTime<Utc>,
    pub error_msg: Option<String>,
    pub hit_count: i64,
    pub query_length: i64,
}
