//! Data models for the application
//!
//! One sub-module per feature area: BLAST jobs and their completion markers,
//! hits and the statistics derived from them, Entrez accessions with their cached
//! GenBank/FASTA records, and user accounts with buddies and shared jobs.

mod accession;
mod hit;
mod job;
mod user;

pub use accession::*;
pub use hit::*;
pub use job::*;
pub use user::*;
