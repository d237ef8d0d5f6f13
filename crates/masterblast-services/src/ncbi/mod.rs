//! NCBI web service collaborators

pub mod blast;
pub mod blast_xml;
pub mod entrez;

pub use blast::{BlastService, NcbiBlastClient};
pub use blast_xml::{parse_blast_xml, BlastAlignment, BlastHsp, BlastRecord};
pub use entrez::{EntrezService, NcbiEntrezClient};
