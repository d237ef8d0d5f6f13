use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One high-scoring segment pair of a job's BLAST result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BlastHit {
    pub id: i64,
    pub job_id: i64,
    pub accession_id: i64,
    pub description: String,
    pub blast_score: i64,
    pub bit_score: f64,
    pub e_value: f64,
    pub identities: i64,
    pub percentage_identity: f64,
    pub align_length: i64,
    pub query_start: i64,
    pub query_end: i64,
    pub query_coverage: f64,
    pub subject_seq: String,
    pub subject_start: i64,
    pub subject_end: i64,
}

/// A hit joined with its accession, as listed on the results page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HitWithAccession {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub hit: BlastHit,
    pub accession_code: String,
    pub organism: Option<String>,
}

impl HitWithAccession {
    /// Accession codes repeat across hits, so charts label bars `code.hit_id`.
    pub fn unique_accession(&self) -> String {
        format!("{}.{}", self.accession_code, self.hit.id)
    }
}

/// Values parsed from a BLAST HSP, before the derived statistics are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlastHit {
    pub job_id: i64,
    pub accession_id: i64,
    pub description: String,
    pub blast_score: i64,
    pub bit_score: f64,
    pub e_value: f64,
    pub identities: i64,
    pub align_length: i64,
    pub query_start: i64,
    pub query_end: i64,
    /// Length of the job's query sequence
    pub query_length: i64,
    pub subject_seq: String,
    pub subject_start: i64,
    pub subject_end: i64,
}

impl NewBlastHit {
    pub fn percentage_identity(&self) -> Option<f64> {
        percentage_identity(self.identities, self.align_length)
    }

    pub fn query_coverage(&self) -> Option<f64> {
        query_coverage(self.query_start, self.query_end, self.query_length)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `identities / align_length * 100`, rounded to two decimals.
///
/// Not clamped: inputs where identities exceed the alignment length give values
/// above 100. Returns `None` for a zero alignment length.
pub fn percentage_identity(identities: i64, align_length: i64) -> Option<f64> {
    if align_length == 0 {
        return None;
    }
    Some(round2(identities as f64 / align_length as f64 * 100.0))
}

/// Share of the query covered by the alignment, rounded to two decimals.
///
/// Positions are 1-based and inclusive. Not clamped. Returns `None` for an empty query.
pub fn query_coverage(query_start: i64, query_end: i64, query_length: i64) -> Option<f64> {
    if query_length == 0 {
        return None;
    }
    Some(round2(
        (query_end - query_start + 1) as f64 / query_length as f64 * 100.0,
    ))
}

/// Significance buckets for the e-value chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EValueCategory {
    ExtremelySignificant,
    VerySignificant,
    ModeratelySignificant,
    NotSignificant,
}

impl EValueCategory {
    pub const ALL: [EValueCategory; 4] = [
        EValueCategory::ExtremelySignificant,
        EValueCategory::VerySignificant,
        EValueCategory::ModeratelySignificant,
        EValueCategory::NotSignificant,
    ];

    pub fn from_e_value(e_value: f64) -> Self {
        if e_value < 1e-50 {
            EValueCategory::ExtremelySignificant
        } else if e_value < 1e-20 {
            EValueCategory::VerySignificant
        } else if e_value < 1e-5 {
            EValueCategory::ModeratelySignificant
        } else {
            EValueCategory::NotSignificant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EValueCategory::ExtremelySignificant => "Extremely significant",
            EValueCategory::VerySignificant => "Very significant",
            EValueCategory::ModeratelySignificant => "Moderately significant",
            EValueCategory::NotSignificant => "Not significant",
        }
    }
}

/// Request body for the comparison charts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComparisonRequest {
    pub hit_ids: Vec<i64>,
}

/// One bar of a per-hit chart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ChartPoint {
    pub accession: String,
    pub value: f64,
}

/// One slice of the e-value pie chart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct EValueSlice {
    pub category: EValueCategory,
    pub label: String,
    pub count: usize,
    pub accessions: Vec<String>,
}

/// Data for the four comparison charts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComparisonCharts {
    pub sequence_length: Vec<ChartPoint>,
    pub percentage_identity: Vec<ChartPoint>,
    pub query_coverage: Vec<ChartPoint>,
    pub e_value: Vec<EValueSlice>,
}

impl ComparisonCharts {
    pub fn from_hits(hits: &[HitWithAccession]) -> Self {
        let mut sequence_length = Vec::with_capacity(hits.len());
        let mut percentage_identity = Vec::with_capacity(hits.len());
        let mut query_coverage = Vec::with_capacity(hits.len());
        let mut e_value: Vec<EValueSlice> = EValueCategory::ALL
            .iter()
            .map(|category| EValueSlice {
                category: *category,
                label: category.label().to_string(),
                count: 0,
                accessions: Vec::new(),
            })
            .collect();

        for hit in hits {
            let accession = hit.unique_accession();
            sequence_length.push(ChartPoint {
                accession: accession.clone(),
                value: hit.hit.subject_seq.chars().count() as f64,
            });
            percentage_identity.push(ChartPoint {
                accession: accession.clone(),
                value: hit.hit.percentage_identity,
            });
            query_coverage.push(ChartPoint {
                accession: accession.clone(),
                value: hit.hit.query_coverage,
            });

            let category = EValueCategory::from_e_value(hit.hit.e_value);
            if let Some(slice) = e_value.iter_mut().find(|s| s.category == category) {
                slice.count += 1;
                slice.accessions.push(accession);
            }
        }

        ComparisonCharts {
            sequence_length,
            percentage_identity,
            query_coverage,
            e_value,
        }
    }
}
