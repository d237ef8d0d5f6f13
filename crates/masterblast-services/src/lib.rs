//! MasterBlast Services
//!
//! Clients for the NCBI BLAST URL API and Entrez E-utilities, the BLAST XML
//! parser, and the background run that turns a submitted job into hits.

pub mod ncbi;
pub mod orchestration;
pub mod records;

pub use ncbi::{
    parse_blast_xml, BlastAlignment, BlastHsp, BlastRecord, BlastService, EntrezService,
    NcbiBlastClient, NcbiEntrezClient,
};
pub use orchestration::{BlastRunSummary, BlastRunner};
pub use records::load_accession_records;
