//! Application state
//!
//! Split into sub-states by concern so handlers reach only for what they use.

use std::sync::Arc;

use masterblast_core::Config;
use masterblast_db::{
    AccessionRepository, BlastJobRepository, BuddyRepository, HitRepository, UserRepository,
};
use masterblast_services::{BlastRunner, EntrezService};
use masterblast_worker::BlastQueue;
use sqlx::PgPool;

use crate::auth::JwtService;

/// Database pool and repositories
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub jobs: BlastJobRepository,
    pub hits: HitRepository,
    pub accessions: AccessionRepository,
    pub users: UserRepository,
    pub buddies: BuddyRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: BlastJobRepository::new(pool.clone()),
            hits: HitRepository::new(pool.clone()),
            accessions: AccessionRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            buddies: BuddyRepository::new(pool.clone()),
            pool,
        }
    }
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt: JwtService,
}

/// BLAST execution: the run itself, Entrez for the hit page, and the queue.
#[derive(Clone)]
pub struct BlastState {
    pub runner: BlastRunner,
    pub entrez: Arc<dyn EntrezService>,
    pub queue: BlastQueue,
}

#[derive(Clone, Debug)]
pub struct LimitsConfig {
    pub max_upload_size_bytes: usize,
    /// Jobs listed on the history page when no filter is set
    pub recent_jobs_limit: i64,
}

pub struct AppState {
    pub db: DbState,
    pub security: SecurityConfig,
    pub blast: BlastState,
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(config: &Config, db: DbState, blast: BlastState) -> Self {
        Self {
            db,
            security: SecurityConfig {
                jwt: JwtService::new(&config.jwt_secret, config.jwt_expiry_hours),
            },
            blast,
            limits: LimitsConfig {
                max_upload_size_bytes: config.max_upload_size_bytes,
                recent_jobs_limit: config.recent_jobs_limit,
            },
        }
    }
}
