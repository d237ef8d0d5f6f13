//! Background BLAST run
//!
//! `BlastRunner::perform_blast_job` takes a job created by the submit endpoint
//! through to its final state: the remote search is run, each HSP of the result
//! becomes a hit, and the job's unprocessed marker is removed whatever happens.
//! A job that is already processed when the run starts, or that the stale job
//! reaper finalizes while the search is in flight, is left as it is.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use masterblast_core::constants::{
    ERROR_BLAST_NOT_EXECUTED, ERROR_BLAST_RESULT_UNREADABLE, ERROR_BLAST_TIMED_OUT,
    MAX_DESCRIPTION_LENGTH,
};
use masterblast_core::models::{BlastJob, EntrezAccession, NewBlastHit};
use masterblast_core::{TaskError, TaskResultExt};
use masterblast_db::{AccessionStore, BlastJobStore, HitStore};

use crate::ncbi::{parse_blast_xml, BlastAlignment, BlastService, EntrezService};

/// What a completed run stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlastRunSummary {
    pub hits_created: usize,
    pub hits_failed: usize,
    /// Alignments dropped because their accession could not be resolved
    pub alignments_skipped: usize,
    /// The job was already finalized elsewhere and nothing was stored
    pub discarded: bool,
}

impl BlastRunSummary {
    fn discarded() -> Self {
        Self {
            discarded: true,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct BlastRunner {
    jobs: Arc<dyn BlastJobStore>,
    accessions: Arc<dyn AccessionStore>,
    hits: Arc<dyn HitStore>,
    blast: Arc<dyn BlastService>,
    entrez: Arc<dyn EntrezService>,
    database: String,
    search_timeout: Option<Duration>,
}

impl BlastRunner {
    pub fn new(
        jobs: Arc<dyn BlastJobStore>,
        accessions: Arc<dyn AccessionStore>,
        hits: Arc<dyn HitStore>,
        blast: Arc<dyn BlastService>,
        entrez: Arc<dyn EntrezService>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            accessions,
            hits,
            blast,
            entrez,
            database: database.into(),
            search_timeout: None,
        }
    }

    /// Give up on the remote search after `timeout`. The job is then recorded
    /// as timed out with no hits.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }

    /// Run the BLAST search for `job_id` and store its hits.
    ///
    /// A failure is recorded as the job's `error_msg` and returned; the job is
    /// marked processed on every path.
    #[tracing::instrument(skip(self))]
    pub async fn perform_blast_job(&self, job_id: i64) -> Result<BlastRunSummary, TaskError> {
        let job = match self.jobs.get_blast_job(job_id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job_id = job_id, error = %e, "BLAST job could not be loaded");
                self.finish(job_id).await;
                return Err(TaskError::new(ERROR_BLAST_NOT_EXECUTED, e));
            }
        };

        if self.already_processed(job_id).await {
            tracing::warn!(job_id = job_id, "BLAST job already processed, not running it");
            return Ok(BlastRunSummary::discarded());
        }

        let result = self.run(&job).await;
        if matches!(&result, Ok(summary) if summary.discarded) {
            return result;
        }
        if let Err(e) = &result {
            tracing::error!(
                job_id = job_id,
                error = %e.inner(),
                job_message = e.job_message(),
                "BLAST job failed"
            );
            if let Err(db_err) = self.jobs.set_error_msg(job_id, e.job_message()).await {
                tracing::error!(job_id = job_id, error = %db_err, "Failed to record job error");
            }
        }

        self.finish(job_id).await;
        result
    }

    async fn run(&self, job: &BlastJob) -> Result<BlastRunSummary, TaskError> {
        let xml = self.search(job).await?;
        let record = parse_blast_xml(&xml).job_failed(ERROR_BLAST_RESULT_UNREADABLE)?;

        if self.already_processed(job.id).await {
            tracing::warn!(
                job_id = job.id,
                "BLAST job was finalized during the search, discarding its result"
            );
            return Ok(BlastRunSummary::discarded());
        }

        let entrez_db = job.program.entrez_db();
        let query_length = job.query_length() as i64;

        let mut summary = BlastRunSummary::default();
        for alignment in &record.alignments {
            let Some(accession) = self.resolve_accession(&alignment.accession, entrez_db).await
            else {
                summary.alignments_skipped += 1;
                continue;
            };

            for new_hit in hits_for_alignment(job.id, accession.id, query_length, alignment) {
                match self.hits.create_hit(new_hit).await {
                    Ok(_) => summary.hits_created += 1,
                    Err(e) => {
                        summary.hits_failed += 1;
                        tracing::warn!(
                            job_id = job.id,
                            accession = %alignment.accession,
                            error = %e,
                            "Skipping BLAST hit"
                        );
                    }
                }
            }
        }

        tracing::info!(
            job_id = job.id,
            alignments = record.alignments.len(),
            hits_created = summary.hits_created,
            hits_failed = summary.hits_failed,
            alignments_skipped = summary.alignments_skipped,
            "BLAST job completed"
        );
        Ok(summary)
    }

    async fn search(&self, job: &BlastJob) -> Result<String, TaskError> {
        let search = self
            .blast
            .run_blast(job.program, &self.database, &job.sequence);

        let Some(limit) = self.search_timeout else {
            return search.await.job_failed(ERROR_BLAST_NOT_EXECUTED);
        };
        match tokio::time::timeout(limit, search).await {
            Ok(result) => result.job_failed(ERROR_BLAST_NOT_EXECUTED),
            Err(_) => Err(TaskError::new(
                ERROR_BLAST_TIMED_OUT,
                anyhow!("BLAST search exceeded {}s", limit.as_secs()),
            )),
        }
    }

    /// A tracker error counts as not processed so the run goes ahead.
    async fn already_processed(&self, job_id: i64) -> bool {
        match self.jobs.is_processed(job_id).await {
            Ok(processed) => processed,
            Err(e) => {
                tracing::warn!(job_id = job_id, error = %e, "Could not read job processing state");
                false
            }
        }
    }

    /// Existing accession for `code`, or a new one with its organism looked up in
    /// Entrez. `None` when the lookup fails for any reason other than not-found.
    async fn resolve_accession(&self, code: &str, entrez_db: &str) -> Option<EntrezAccession> {
        match self.accessions.get_accession_by_code(code).await {
            Ok(accession) => Some(accession),
            Err(e) if e.is_not_found() => {
                let organism = self.entrez.fetch_organism(entrez_db, code).await;
                match self.accessions.create_accession(code, &organism).await {
                    Ok(accession) => Some(accession),
                    Err(e) => {
                        tracing::warn!(accession = %code, error = %e, "Failed to create accession");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(accession = %code, error = %e, "Accession lookup failed");
                None
            }
        }
    }

    async fn finish(&self, job_id: i64) {
        if let Err(e) = self.jobs.mark_processed(job_id).await {
            tracing::error!(job_id = job_id, error = %e, "Failed to mark BLAST job processed");
        }
    }
}

fn hits_for_alignment(
    job_id: i64,
    accession_id: i64,
    query_length: i64,
    alignment: &BlastAlignment,
) -> Vec<NewBlastHit> {
    let description: String = alignment
        .description()
        .chars()
        .take(MAX_DESCRIPTION_LENGTH)
        .collect();

    alignment
        .hsps
        .iter()
        .map(|hsp| NewBlastHit {
            job_id,
            accession_id,
            description: description.clone(),
            blast_score: hsp.score,
            bit_score: hsp.bit_score,
            e_value: hsp.e_value,
            identities: hsp.identities,
            align_length: hsp.align_length,
            query_start: hsp.query_from,
            query_end: hsp.query_to,
            query_length,
            subject_seq: hsp.hit_seq.clone(),
            subject_start: hsp.hit_from,
            subject_end: hsp.hit_to,
        })
        .collect()
}
