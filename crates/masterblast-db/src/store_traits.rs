//! Store traits used by the BLAST orchestration
//!
//! The background run only needs a handful of operations on jobs, accessions and
//! hits. Writing it against these traits lets the run be exercised with the
//! in-memory stores in [`crate::test_helpers`].

use async_trait::async_trait;
use masterblast_core::models::{
    BlastHit, BlastJob, EntrezAccession, EntrezAccessionCache, NewBlastHit, NewBlastJob,
};
use masterblast_core::{AppError, LookupError};

use crate::db::{AccessionRepository, BlastJobRepository, HitRepository};

/// Completion state of a job.
///
/// A job is unprocessed from the moment it is created until `mark_processed` is
/// called. Ids that were never created report as processed.
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn is_processed(&self, job_id: i64) -> Result<bool, AppError>;

    /// Idempotent: marking an already processed job succeeds.
    async fn mark_processed(&self, job_id: i64) -> Result<(), AppError>;
}

/// Job operations needed to run and record a BLAST search
#[async_trait]
pub trait BlastJobStore: JobTracker {
    /// Create the job and its unprocessed marker as one atomic step.
    async fn create_blast_job(&self, new_job: NewBlastJob) -> Result<BlastJob, AppError>;

    async fn get_blast_job(&self, id: i64) -> Result<BlastJob, LookupError>;

    async fn set_error_msg(&self, id: i64, error_msg: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AccessionStore: Send + Sync {
    async fn get_accession_by_code(&self, code: &str) -> Result<EntrezAccession, LookupError>;

    async fn create_accession(
        &self,
        code: &str,
        organism: &str,
    ) -> Result<EntrezAccession, AppError>;

    async fn get_accession_cache(&self, cache_id: i64)
        -> Result<EntrezAccessionCache, LookupError>;

    /// Link a new cache to the accession, or return the one already linked.
    async fn attach_accession_cache(
        &self,
        accession_id: i64,
        genbank: &str,
        fasta: &str,
    ) -> Result<EntrezAccessionCache, AppError>;
}

#[async_trait]
pub trait HitStore: Send + Sync {
    async fn create_hit(&self, hit: NewBlastHit) -> Result<BlastHit, AppError>;
}

#[async_trait]
impl JobTracker for BlastJobRepository {
    async fn is_processed(&self, job_id: i64) -> Result<bool, AppError> {
        BlastJobRepository::is_processed(self, job_id).await
    }

    async fn mark_processed(&self, job_id: i64) -> Result<(), AppError> {
        BlastJobRepository::mark_processed(self, job_id).await
    }
}

#[async_trait]
impl BlastJobStore for BlastJobRepository {
    async fn create_blast_job(&self, new_job: NewBlastJob) -> Result<BlastJob, AppError> {
        BlastJobRepository::create_blast_job(self, new_job).await
    }

    async fn get_blast_job(&self, id: i64) -> Result<BlastJob, LookupError> {
        BlastJobRepository::get_blast_job(self, id).await
    }

    async fn set_error_msg(&self, id: i64, error_msg: &str) -> Result<(), AppError> {
        BlastJobRepository::set_error_msg(self, id, error_msg).await
    }
}

#[async_trait]
impl AccessionStore for AccessionRepository {
    async fn get_accession_by_code(&self, code: &str) -> Result<EntrezAccession, LookupError> {
        self.get_by_code(code).await
    }

    async fn create_accession(
        &self,
        code: &str,
        organism: &str,
    ) -> Result<EntrezAccession, AppError> {
        self.create(code, organism).await
    }

    async fn get_accession_cache(
        &self,
        cache_id: i64,
    ) -> Result<EntrezAccessionCache, LookupError> {
        self.get_cache(cache_id).await
    }

    async fn attach_accession_cache(
        &self,
        accession_id: i64,
        genbank: &str,
        fasta: &str,
    ) -> Result<EntrezAccessionCache, AppError> {
        self.attach_cache(accession_id, genbank, fasta).await
    }
}

#[async_trait]
impl HitStore for HitRepository {
    async fn create_hit(&self, hit: NewBlastHit) -> Result<BlastHit, AppError> {
        HitRepository::create_hit(self, hit).await
    }
}
