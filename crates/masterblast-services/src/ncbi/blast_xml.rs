//! NCBI BLAST XML (`BlastOutput`) parser.
//!
//! Only the single-query form is accepted: the output must contain exactly one
//! `Iteration`. Elements this application does not store are ignored.

use anyhow::{anyhow, Result};
use serde::Deserialize;

/// The parsed result of a single-query BLAST search.
#[derive(Debug, Clone, PartialEq)]
pub struct BlastRecord {
    pub query_length: Option<i64>,
    pub alignments: Vec<BlastAlignment>,
}

/// One subject sequence with all of its high-scoring segment pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct BlastAlignment {
    pub hit_id: String,
    pub hit_def: String,
    pub accession: String,
    pub length: i64,
    pub hsps: Vec<BlastHsp>,
}

impl BlastAlignment {
    /// `"{hit_id} {hit_def}"`, the conventional one-line title of a hit.
    pub fn title(&self) -> String {
        format!("{} {}", self.hit_id, self.hit_def)
    }

    /// The title without its first space-separated token.
    pub fn description(&self) -> String {
        let title = self.title();
        let mut tokens = title.split(' ');
        tokens.next();
        tokens.collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlastHsp {
    pub bit_score: f64,
    pub score: i64,
    pub e_value: f64,
    pub query_from: i64,
    pub query_to: i64,
    pub hit_from: i64,
    pub hit_to: i64,
    pub identities: i64,
    pub align_length: i64,
    pub query_seq: String,
    pub hit_seq: String,
}

pub fn parse_blast_xml(xml: &str) -> Result<BlastRecord> {
    let parsed: BlastOutputXml =
        quick_xml::de::from_str(xml).map_err(|e| anyhow!("Malformed BLAST XML: {e}"))?;

    let mut iterations = parsed.iterations.items;
    let iteration = match iterations.len() {
        0 => return Err(anyhow!("BLAST XML contains no search results")),
        1 => iterations.remove(0),
        n => {
            return Err(anyhow!(
                "BLAST XML contains {n} search results, expected exactly one"
            ))
        }
    };

    let alignments = iteration
        .hits
        .map(|hits| hits.items)
        .unwrap_or_default()
        .into_iter()
        .map(|hit| BlastAlignment {
            hit_id: hit.id,
            hit_def: hit.def.unwrap_or_default(),
            accession: hit.accession,
            length: hit.len,
            hsps: hit
                .hsps
                .map(|h| h.items)
                .unwrap_or_default()
                .into_iter()
                .map(HspXml::into_hsp)
                .collect(),
        })
        .collect();

    Ok(BlastRecord {
        query_length: parsed.query_len,
        alignments,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename = "BlastOutput")]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_query-len", default)]
    query_len: Option<i64>,
    #[serde(rename = "BlastOutput_iterations")]
    iterations: IterationsXml,
}

#[derive(Debug, Deserialize)]
struct IterationsXml {
    #[serde(rename = "Iteration", default)]
    items: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_hits", default)]
    hits: Option<HitsXml>,
}

#[derive(Debug, Deserialize)]
struct HitsXml {
    #[serde(rename = "Hit", default)]
    items: Vec<HitXml>,
}

#[derive(Debug, Deserialize)]
struct HitXml {
    #[serde(rename = "Hit_id")]
    id: String,
    #[serde(rename = "Hit_def", default)]
    def: Option<String>,
    #[serde(rename = "Hit_accession")]
    accession: String,
    #[serde(rename = "Hit_len")]
    len: i64,
    #[serde(rename = "Hit_hsps", default)]
    hsps: Option<HspsXml>,
}

#[derive(Debug, Deserialize)]
struct HspsXml {
    #[serde(rename = "Hsp", default)]
    items: Vec<HspXml>,
}

#[derive(Debug, Deserialize)]
struct HspXml {
    #[serde(rename = "Hsp_bit-score")]
    bit_score: f64,
    #[serde(rename = "Hsp_score")]
    score: f64,
    #[serde(rename = "Hsp_evalue")]
    evalue: f64,
    #[serde(rename = "Hsp_query-from")]
    query_from: i64,
    #[serde(rename = "Hsp_query-to")]
    query_to: i64,
    #[serde(rename = "Hsp_hit-from")]
    hit_from: i64,
    #[serde(rename = "Hsp_hit-to")]
    hit_to: i64,
    #[serde(rename = "Hsp_identity")]
    identity: i64,
    #[serde(rename = "Hsp_align-len")]
    align_len: i64,
    #[serde(rename = "Hsp_qseq", default)]
    qseq: String,
    #[serde(rename = "Hsp_hseq", default)]
    hseq: String,
}

impl HspXml {
    fn into_hsp(self) -> BlastHsp {
        BlastHsp {
            bit_score: self.bit_score,
            score: self.score.round() as i64,
            e_value: self.evalue,
            query_from: self.query_from,
            query_to: self.query_to,
            hit_from: self.hit_from,
            hit_to: self.hit_to,
            identities: self.identity,
            align_length: self.align_len,
            query_seq: self.qseq,
            hit_seq: self.hseq,
        }
    }
}
