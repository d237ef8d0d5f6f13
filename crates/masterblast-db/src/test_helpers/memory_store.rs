//! In-memory job, accession and hit store
//!
//! Mirrors the Postgres semantics the orchestration relies on: a job and its
//! unprocessed marker appear together, marking processed is idempotent, and
//! hit statistics are derived on insert.

use async_trait::async_trait;
use chrono::Utc;
use masterblast_core::models::{
    BlastHit, BlastJob, EntrezAccession, EntrezAccessionCache, NewBlastHit, NewBlastJob,
};
use masterblast_core::{AppError, LookupError};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::store_traits::{AccessionStore, BlastJobStore, HitStore, JobTracker};

#[derive(Default)]
struct State {
    jobs: BTreeMap<i64, BlastJob>,
    unprocessed: HashSet<i64>,
    accessions: Vec<EntrezAccession>,
    caches: Vec<EntrezAccessionCache>,
    hits: Vec<BlastHit>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory store. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    /// Codes whose lookup fails with a database error instead of not-found
    broken_codes: Arc<Mutex<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, id: i64) -> Option<BlastJob> {
        self.state.lock().unwrap().jobs.get(&id).cloned()
    }

    pub fn hits_for_job(&self, job_id: i64) -> Vec<BlastHit> {
        self.state
            .lock()
            .unwrap()
            .hits
            .iter()
            .filter(|h| h.job_id == job_id)
            .cloned()
            .collect()
    }

    pub fn accessions(&self) -> Vec<EntrezAccession> {
        self.state.lock().unwrap().accessions.clone()
    }

    /// Add an accession row directly, allowing duplicate codes.
    pub fn insert_accession(&self, code: &str, organism: &str) -> EntrezAccession {
        let mut state = self.state.lock().unwrap();
        let accession = EntrezAccession {
            id: state.next_id(),
            code: code.to_string(),
            organism: Some(organism.to_string()),
            cache_id: None,
        };
        state.accessions.push(accession.clone());
        accession
    }

    /// Make lookups of `code` fail with a database error.
    pub fn break_accession_lookup(&self, code: &str) {
        self.broken_codes.lock().unwrap().insert(code.to_string());
    }
}

#[async_trait]
impl JobTracker for MemoryStore {
    async fn is_processed(&self, job_id: i64) -> Result<bool, AppError> {
        Ok(!self.state.lock().unwrap().unprocessed.contains(&job_id))
    }

    async fn mark_processed(&self, job_id: i64) -> Result<(), AppError> {
        self.state.lock().unwrap().unprocessed.remove(&job_id);
        Ok(())
    }
}

#[async_trait]
impl BlastJobStore for MemoryStore {
    async fn create_blast_job(&self, new_job: NewBlastJob) -> Result<BlastJob, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let job = BlastJob {
            id,
            user_id: new_job.user_id,
            title: new_job.resolve_title(id),
            program: new_job.program,
            header: new_job.header,
            sequence: new_job.sequence,
            created_at: Utc::now(),
            error_msg: None,
        };
        state.jobs.insert(id, job.clone());
        state.unprocessed.insert(id);
        Ok(job)
    }

    async fn get_blast_job(&self, id: i64) -> Result<BlastJob, LookupError> {
        self.job(id).ok_or(LookupError::NotFound("BLAST job"))
    }

    async fn set_error_msg(&self, id: i64, error_msg: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("BLAST job does not exist".to_string()))?;
        job.error_msg = Some(error_msg.to_string());
        Ok(())
    }
}

#[async_trait]
impl AccessionStore for MemoryStore {
    async fn get_accession_by_code(&self, code: &str) -> Result<EntrezAccession, LookupError> {
        if self.broken_codes.lock().unwrap().contains(code) {
            return Err(LookupError::Database {
                entity: "Entrez accession",
                source: sqlx::Error::PoolTimedOut,
            });
        }
        let state = self.state.lock().unwrap();
        let mut matches = state.accessions.iter().filter(|a| a.code == code);
        match (matches.next(), matches.next()) {
            (None, _) => Err(LookupError::NotFound("Entrez accession")),
            (Some(accession), None) => Ok(accession.clone()),
            (Some(_), Some(_)) => Err(LookupError::MultipleFound("Entrez accession")),
        }
    }

    async fn create_accession(
        &self,
        code: &str,
        organism: &str,
    ) -> Result<EntrezAccession, AppError> {
        Ok(self.insert_accession(code, organism))
    }

    async fn get_accession_cache(
        &self,
        cache_id: i64,
    ) -> Result<EntrezAccessionCache, LookupError> {
        self.state
            .lock()
            .unwrap()
            .caches
            .iter()
            .find(|c| c.id == cache_id)
            .cloned()
            .ok_or(LookupError::NotFound("Entrez accession cache"))
    }

    async fn attach_accession_cache(
        &self,
        accession_id: i64,
        genbank: &str,
        fasta: &str,
    ) -> Result<EntrezAccessionCache, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let State {
            accessions, caches, ..
        } = &mut *state;

        let accession = accessions
            .iter_mut()
            .find(|a| a.id == accession_id)
            .ok_or_else(|| AppError::NotFound("Entrez accession does not exist".to_string()))?;

        if let Some(existing) = accession.cache_id {
            return caches
                .iter()
                .find(|c| c.id == existing)
                .cloned()
                .ok_or_else(|| AppError::Internal("Dangling accession cache".to_string()));
        }

        let cache = EntrezAccessionCache {
            id,
            genbank: genbank.to_string(),
            fasta: fasta.to_string(),
            updated_at: Utc::now(),
        };
        accession.cache_id = Some(id);
        caches.push(cache.clone());
        Ok(cache)
    }
}

#[async_trait]
impl HitStore for MemoryStore {
    async fn create_hit(&self, hit: NewBlastHit) -> Result<BlastHit, AppError> {
        let percentage_identity = hit.percentage_identity().ok_or_else(|| {
            AppError::InvalidInput("BLAST hit has an alignment length of zero".to_string())
        })?;
        let query_coverage = hit.query_coverage().ok_or_else(|| {
            AppError::InvalidInput("BLAST hit belongs to an empty query".to_string())
        })?;

        let mut state = self.state.lock().unwrap();
        let created = BlastHit {
            id: state.next_id(),
            job_id: hit.job_id,
            accession_id: hit.accession_id,
            description: hit.description,
            blast_score: hit.blast_score,
            bit_score: hit.bit_score,
            e_value: hit.e_value,
            identities: hit.identities,
            percentage_identity,
            align_length: hit.align_length,
            query_start: hit.query_start,
            query_end: hit.query_end,
            query_coverage,
            subject_seq: hit.subject_seq,
            subject_start: hit.subject_start,
            subject_end: hit.subject_end,
        };
        state.hits.push(created.clone());
        Ok(created)
    }
}
