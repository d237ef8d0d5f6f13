//! NCBI BLAST URL API client
//!
//! A search is a three step conversation with `Blast.cgi`: `CMD=Put` submits the
//! query and returns a request id (RID), `CMD=Get&FORMAT_OBJECT=SearchInfo` is
//! polled until the search is ready, and `CMD=Get&FORMAT_TYPE=XML` fetches the
//! result.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use masterblast_core::models::BlastProgram;
use masterblast_core::NcbiConfig;
use reqwest::Client;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const TOOL_NAME: &str = "masterblast";
const EXPECT_THRESHOLD: &str = "10";
const HITLIST_SIZE: &str = "50";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Runs a remote BLAST search and returns the raw BLAST XML.
#[async_trait]
pub trait BlastService: Send + Sync {
    async fn run_blast(
        &self,
        program: BlastProgram,
        database: &str,
        sequence: &str,
    ) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchStatus {
    Ready,
    Waiting,
    Failed,
    Unknown,
}

pub struct NcbiBlastClient {
    http_client: Client,
    blast_url: String,
    email: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl std::fmt::Debug for NcbiBlastClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcbiBlastClient")
            .field("blast_url", &self.blast_url)
            .finish()
    }
}

impl NcbiBlastClient {
    pub fn new(config: &NcbiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client for NCBI BLAST")?;

        Ok(Self {
            http_client,
            blast_url: config.blast_url.clone(),
            email: config.email.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Longest a whole search can take against `config`: the polling deadline
    /// plus one request timeout each for submission, the last poll and the fetch.
    pub fn search_deadline(config: &NcbiConfig) -> Duration {
        Duration::from_secs(config.timeout_secs + 3 * REQUEST_TIMEOUT_SECS)
    }

    async fn submit(&self, program: BlastProgram, database: &str, sequence: &str) -> Result<String> {
        let response = self
            .http_client
            .post(&self.blast_url)
            .form(&[
                ("CMD", "Put"),
                ("PROGRAM", program.as_str()),
                ("DATABASE", database),
                ("QUERY", sequence),
                ("EXPECT", EXPECT_THRESHOLD),
                ("HITLIST_SIZE", HITLIST_SIZE),
                ("EMAIL", self.email.as_str()),
                ("TOOL", TOOL_NAME),
            ])
            .send()
            .await
            .context("Failed to submit BLAST search")?;

        let body = checked_text(response, "BLAST submission").await?;
        qblast_info_value(&body, "RID")
            .map(str::to_string)
            .ok_or_else(|| anyhow!("BLAST submission returned no request id"))
    }

    async fn search_status(&self, rid: &str) -> Result<SearchStatus> {
        let response = self
            .http_client
            .get(&self.blast_url)
            .query(&[("CMD", "Get"), ("FORMAT_OBJECT", "SearchInfo"), ("RID", rid)])
            .send()
            .await
            .context("Failed to poll BLAST search status")?;

        let body = checked_text(response, "BLAST status check").await?;
        Ok(match qblast_info_value(&body, "Status") {
            Some("READY") => SearchStatus::Ready,
            Some("WAITING") => SearchStatus::Waiting,
            Some("FAILED") => SearchStatus::Failed,
            _ => SearchStatus::Unknown,
        })
    }

    async fn wait_until_ready(&self, rid: &str) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.search_status(rid).await? {
                SearchStatus::Ready => return Ok(()),
                SearchStatus::Failed => {
                    return Err(anyhow!("BLAST search {} failed at NCBI", rid));
                }
                SearchStatus::Unknown => {
                    return Err(anyhow!("BLAST search {} expired or is unknown", rid));
                }
                SearchStatus::Waiting => {
                    if Instant::now() >= deadline {
                        return Err(anyhow!(
                            "BLAST search {} still waiting after {}s",
                            rid,
                            self.timeout.as_secs()
                        ));
                    }
                    tracing::debug!(rid = %rid, "BLAST search still running");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn fetch_xml(&self, rid: &str) -> Result<String> {
        let response = self
            .http_client
            .get(&self.blast_url)
            .query(&[("CMD", "Get"), ("FORMAT_TYPE", "XML"), ("RID", rid)])
            .send()
            .await
            .context("Failed to fetch BLAST result")?;

        checked_text(response, "BLAST result fetch").await
    }
}

#[async_trait]
impl BlastService for NcbiBlastClient {
    #[tracing::instrument(skip(self, sequence), fields(program = %program, database = %database))]
    async fn run_blast(
        &self,
        program: BlastProgram,
        database: &str,
        sequence: &str,
    ) -> Result<String> {
        let rid = self.submit(program, database, sequence).await?;
        tracing::info!(rid = %rid, "BLAST search submitted");

        self.wait_until_ready(&rid).await?;
        let xml = self.fetch_xml(&rid).await?;

        tracing::info!(rid = %rid, bytes = xml.len(), "BLAST result fetched");
        Ok(xml)
    }
}

/// Read the body of a successful response, or turn the status into an error.
pub(crate) async fn checked_text(response: reqwest::Response, what: &str) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!("{} failed: {} - {}", what, status, error_text));
    }
    response
        .text()
        .await
        .with_context(|| format!("Failed to read {} response", what))
}

/// Find `key = value` or `key=value` inside the `QBlastInfoBegin` block.
fn qblast_info_value<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let start = body.find("QBlastInfoBegin")? + "QBlastInfoBegin".len();
    let end = body[start..]
        .find("QBlastInfoEnd")
        .map_or(body.len(), |i| start + i);

    body[start..end].lines().find_map(|line| {
        let (name, value) = line.split_once('=')?;
        (name.trim() == key).then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const PUT_RESPONSE: &str = "<html><!--QBlastInfoBegin\n    RID = R2D2C3PO014\n    RTOE = 12\nQBlastInfoEnd\n--></html>";

    fn client_for(server: &mockito::Server) -> NcbiBlastClient {
        NcbiBlastClient::new(&NcbiConfig {
            blast_url: format!("{}/Blast.cgi", server.url()),
            entrez_url: server.url(),
            email: "tests@masterblast.local".to_string(),
            blast_database: "nr".to_string(),
            poll_interval_secs: 0,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn status_body(status: &str) -> String {
        format!("QBlastInfoBegin\n\tStatus={status}\nQBlastInfoEnd\nQBlastInfoBegin\n\tThereAreHits=yes\nQBlastInfoEnd\n")
    }

    #[test]
    fn test_qblast_info_value() {
        assert_eq!(qblast_info_value(PUT_RESPONSE, "RID"), Some("R2D2C3PO014"));
        assert_eq!(qblast_info_value(PUT_RESPONSE, "RTOE"), Some("12"));
        assert_eq!(qblast_info_value(&status_body("READY"), "Status"), Some("READY"));
        assert_eq!(qblast_info_value("<html>busy</html>", "RID"), None);
    }

    #[tokio::test]
    async fn test_run_blast_submits_polls_and_fetches() {
        let mut server = mockito::Server::new_async().await;

        let put = server
            .mock("POST", "/Blast.cgi")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("CMD".into(), "Put".into()),
                Matcher::UrlEncoded("PROGRAM".into(), "blastn".into()),
                Matcher::UrlEncoded("DATABASE".into(), "nr".into()),
                Matcher::UrlEncoded("QUERY".into(), "ATGC".into()),
            ]))
            .with_status(200)
            .with_body(PUT_RESPONSE)
            .create_async()
            .await;

        let status = server
            .mock("GET", "/Blast.cgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("FORMAT_OBJECT".into(), "SearchInfo".into()),
                Matcher::UrlEncoded("RID".into(), "R2D2C3PO014".into()),
            ]))
            .with_status(200)
            .with_body(status_body("READY"))
            .create_async()
            .await;

        let fetch = server
            .mock("GET", "/Blast.cgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("FORMAT_TYPE".into(), "XML".into()),
                Matcher::UrlEncoded("RID".into(), "R2D2C3PO014".into()),
            ]))
            .with_status(200)
            .with_body("<BlastOutput></BlastOutput>")
            .create_async()
            .await;

        let client = client_for(&server);
        let xml = client
            .run_blast(BlastProgram::Blastn, "nr", "ATGC")
            .await
            .unwrap();

        assert_eq!(xml, "<BlastOutput></BlastOutput>");
        put.assert_async().await;
        status.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_blast_reports_failed_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/Blast.cgi")
            .with_status(200)
            .with_body(PUT_RESPONSE)
            .create_async()
            .await;
        server
            .mock("GET", "/Blast.cgi")
            .match_query(Matcher::UrlEncoded("FORMAT_OBJECT".into(), "SearchInfo".into()))
            .with_status(200)
            .with_body(status_body("FAILED"))
            .create_async()
            .await;

        let err = client_for(&server)
            .run_blast(BlastProgram::Blastp, "nr", "MKV")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed at NCBI"));
    }

    #[tokio::test]
    async fn test_run_blast_without_request_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/Blast.cgi")
            .with_status(200)
            .with_body("<html>Service temporarily unavailable</html>")
            .create_async()
            .await;

        let err = client_for(&server)
            .run_blast(BlastProgram::Blastn, "nr", "ATGC")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no request id"));
    }

    #[tokio::test]
    async fn test_run_blast_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/Blast.cgi")
            .with_status(503)
            .with_body("down for maintenance")
            .create_async()
            .await;

        let err = client_for(&server)
            .run_blast(BlastProgram::Blastn, "nr", "ATGC")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("down for maintenance"));
    }
}
