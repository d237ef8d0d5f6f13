//! Task handler context trait
//!
//! The queue only decides when a job runs. What running and reaping a
//! job means is provided through [`TaskHandlerContext`].

use anyhow::Result;
use async_trait::async_trait;

use masterblast_core::constants::ERROR_BLAST_TIMED_OUT;
use masterblast_core::TaskError;
use masterblast_db::BlastJobRepository;
use masterblast_services::{BlastRunSummary, BlastRunner};

#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    async fn perform_blast_job(&self, job_id: i64) -> Result<BlastRunSummary, TaskError>;

    /// Fail every job still unprocessed after `grace_period_secs`. Returns their ids.
    async fn reap_stale_jobs(&self, grace_period_secs: i64) -> Result<Vec<i64>>;
}

/// Context backed by the Postgres job repository.
#[derive(Clone)]
pub struct BlastJobContext {
    runner: BlastRunner,
    jobs: BlastJobRepository,
}

impl BlastJobContext {
    pub fn new(runner: BlastRunner, jobs: BlastJobRepository) -> Self {
        Self { runner, jobs }
    }
}

#[async_trait]
impl TaskHandlerContext for BlastJobContext {
    async fn perform_blast_job(&self, job_id: i64) -> Result<BlastRunSummary, TaskError> {
        self.runner.perform_blast_job(job_id).await
    }

    async fn reap_stale_jobs(&self, grace_period_secs: i64) -> Result<Vec<i64>> {
        Ok(self
            .jobs
            .reap_stale_jobs(grace_period_secs, ERROR_BLAST_TIMED_OUT)
            .await?)
    }
}
