//! Wire the NCBI clients, the BLAST runner and the queue into the application state

use std::sync::Arc;

use anyhow::{Context, Result};
use masterblast_core::Config;
use masterblast_services::{
    BlastRunner, BlastService, EntrezService, NcbiBlastClient, NcbiEntrezClient,
};
use masterblast_worker::{BlastJobContext, BlastQueue, BlastQueueConfig};
use sqlx::PgPool;

use crate::state::{AppState, BlastState, DbState};

/// Build the runner over the repositories of `db`.
pub fn build_runner(
    config: &Config,
    db: &DbState,
    blast: Arc<dyn BlastService>,
    entrez: Arc<dyn EntrezService>,
) -> BlastRunner {
    BlastRunner::new(
        Arc::new(db.jobs.clone()),
        Arc::new(db.accessions.clone()),
        Arc::new(db.hits.clone()),
        blast,
        entrez,
        config.ncbi.blast_database.clone(),
    )
    .with_search_timeout(NcbiBlastClient::search_deadline(&config.ncbi))
}

pub fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let db = DbState::new(pool);

    let blast: Arc<dyn BlastService> =
        Arc::new(NcbiBlastClient::new(&config.ncbi).context("Failed to build BLAST client")?);
    let entrez: Arc<dyn EntrezService> =
        Arc::new(NcbiEntrezClient::new(&config.ncbi).context("Failed to build Entrez client")?);
    tracing::info!(
        blast_url = %config.ncbi.blast_url,
        entrez_url = %config.ncbi.entrez_url,
        database = %config.ncbi.blast_database,
        "NCBI clients initialized"
    );

    let runner = build_runner(config, &db, blast, entrez.clone());
    let context = Arc::new(BlastJobContext::new(runner.clone(), db.jobs.clone()));
    let queue = BlastQueue::new(BlastQueueConfig::from_config(config), context);

    Ok(Arc::new(AppState::new(
        config,
        db,
        BlastState {
            runner,
            entrez,
            queue,
        },
    )))
}
