//! Constants shared across crates.

/// Error messages stored on a job when its BLAST run does not finish.
pub const ERROR_BLAST_NOT_EXECUTED: &str = "Failed: the BLAST job could not be executed.";
pub const ERROR_BLAST_RESULT_UNREADABLE: &str = "Failed: the BLAST job result could not be read.";
pub const ERROR_BLAST_TIMED_OUT: &str = "Failed: the BLAST job timed out.";

/// Organism recorded when Entrez has no `GBSeq_organism` for an accession.
pub const UNKNOWN_ORGANISM: &str = "Unknown Organism";

/// Prefix for titles generated when neither a title nor a header was supplied.
pub const DEFAULT_TITLE_PREFIX: &str = "MasterBlast";

/// BLAST database every job is run against.
pub const DEFAULT_BLAST_DATABASE: &str = "nr";

/// Column limits mirrored from the schema.
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 100;
pub const MAX_ERROR_MSG_LENGTH: usize = 100;
