//! MasterBlast Database Layer
//!
//! Postgres repositories for jobs, their unprocessed markers, hits, Entrez
//! accessions, users and buddies, plus the store traits the BLAST orchestration
//! is written against.

pub mod db;
pub mod store_traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use db::*;
pub use store_traits::{AccessionStore, BlastJobStore, HitStore, JobTracker};
