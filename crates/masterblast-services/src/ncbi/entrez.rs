//! NCBI Entrez E-utilities client (`efetch`)

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use masterblast_core::constants::UNKNOWN_ORGANISM;
use masterblast_core::NcbiConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::blast::checked_text;

const TOOL_NAME: &str = "masterblast";

#[async_trait]
pub trait EntrezService: Send + Sync {
    /// Raw `efetch` response for one record.
    async fn efetch(&self, db: &str, id: &str, rettype: &str, retmode: &str) -> Result<String>;

    /// Scientific name of the source organism, or "Unknown Organism" when the
    /// record cannot be fetched or has none.
    async fn fetch_organism(&self, db: &str, accession: &str) -> String {
        match self.efetch(db, accession, "gb", "xml").await {
            Ok(xml) => organism_from_gbset(&xml).unwrap_or_else(|| {
                tracing::debug!(accession = %accession, "No organism in GenBank record");
                UNKNOWN_ORGANISM.to_string()
            }),
            Err(e) => {
                tracing::warn!(accession = %accession, error = %e, "Organism lookup failed");
                UNKNOWN_ORGANISM.to_string()
            }
        }
    }

    /// Record as plain text in the given format. Failures come back as an
    /// `Error: ...` string so they can be shown (and cached) in place of the record.
    async fn fetch_record_text(&self, db: &str, accession: &str, rettype: &str) -> String {
        match self.efetch(db, accession, rettype, "text").await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(accession = %accession, rettype = %rettype, error = %e, "Record fetch failed");
                format!("Error: {}", e)
            }
        }
    }
}

pub struct NcbiEntrezClient {
    http_client: Client,
    efetch_url: String,
    email: String,
}

impl std::fmt::Debug for NcbiEntrezClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcbiEntrezClient")
            .field("efetch_url", &self.efetch_url)
            .finish()
    }
}

impl NcbiEntrezClient {
    pub fn new(config: &NcbiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client for NCBI Entrez")?;

        Ok(Self {
            http_client,
            efetch_url: format!("{}/efetch.fcgi", config.entrez_url.trim_end_matches('/')),
            email: config.email.clone(),
        })
    }
}

#[async_trait]
impl EntrezService for NcbiEntrezClient {
    #[tracing::instrument(skip(self))]
    async fn efetch(&self, db: &str, id: &str, rettype: &str, retmode: &str) -> Result<String> {
        let response = self
            .http_client
            .get(&self.efetch_url)
            .query(&[
                ("db", db),
                ("id", id),
                ("rettype", rettype),
                ("retmode", retmode),
                ("email", self.email.as_str()),
                ("tool", TOOL_NAME),
            ])
            .send()
            .await
            .context("Failed to reach Entrez efetch")?;

        let body = checked_text(response, "Entrez efetch").await?;
        if body.trim().is_empty() {
            return Err(anyhow!("Entrez returned an empty record for {}", id));
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct GbSetXml {
    #[serde(rename = "GBSeq", default)]
    items: Vec<GbSeqXml>,
}

#[derive(Debug, Deserialize)]
struct GbSeqXml {
    #[serde(rename = "GBSeq_organism", default)]
    organism: Option<String>,
}

fn organism_from_gbset(xml: &str) -> Option<String> {
    let set: GbSetXml = quick_xml::de::from_str(xml).ok()?;
    set.items
        .into_iter()
        .next()?
        .organism
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const GBSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE GBSet PUBLIC "-//NCBI//NCBI GBSeq/EN" "https://www.ncbi.nlm.nih.gov/dtd/NCBI_GBSeq.dtd">
<GBSet>
  <GBSeq>
    <GBSeq_locus>NM_000518</GBSeq_locus>
    <GBSeq_length>626</GBSeq_length>
    <GBSeq_organism>Homo sapiens</GBSeq_organism>
    <GBSeq_taxonomy>Eukaryota; Metazoa; Chordata</GBSeq_taxonomy>
  </GBSeq>
</GBSet>"#;

    fn client_for(server: &mockito::Server) -> NcbiEntrezClient {
        NcbiEntrezClient::new(&NcbiConfig {
            blast_url: format!("{}/Blast.cgi", server.url()),
            entrez_url: server.url(),
            email: "tests@masterblast.local".to_string(),
            blast_database: "nr".to_string(),
            poll_interval_secs: 0,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_organism_from_gbset() {
        assert_eq!(organism_from_gbset(GBSET), Some("Homo sapiens".to_string()));
        assert_eq!(organism_from_gbset("<GBSet></GBSet>"), None);
        assert_eq!(organism_from_gbset("Error: bad id"), None);
    }

    #[tokio::test]
    async fn test_fetch_organism() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "nucleotide".into()),
                Matcher::UrlEncoded("id".into(), "NM_000518".into()),
                Matcher::UrlEncoded("retmode".into(), "xml".into()),
                Matcher::UrlEncoded("email".into(), "tests@masterblast.local".into()),
            ]))
            .with_status(200)
            .with_body(GBSET)
            .create_async()
            .await;

        let organism = client_for(&server)
            .fetch_organism("nucleotide", "NM_000518")
            .await;

        assert_eq!(organism, "Homo sapiens");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_organism_falls_back_on_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("Invalid id")
            .create_async()
            .await;

        let organism = client_for(&server).fetch_organism("protein", "XX_1").await;
        assert_eq!(organism, UNKNOWN_ORGANISM);
    }

    #[tokio::test]
    async fn test_fetch_record_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("rettype".into(), "fasta".into()),
                Matcher::UrlEncoded("retmode".into(), "text".into()),
            ]))
            .with_status(200)
            .with_body(">NM_000518.5 Homo sapiens HBB\nACATTTGCTTCTGACACAACTGTG\n")
            .create_async()
            .await;
        server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("rettype".into(), "gb".into()))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client_for(&server);
        let fasta = client
            .fetch_record_text("nucleotide", "NM_000518", "fasta")
            .await;
        assert!(fasta.starts_with(">NM_000518.5"));

        let genbank = client
            .fetch_record_text("nucleotide", "NM_000518", "gb")
            .await;
        assert!(genbank.starts_with("Error: "));
    }
}
