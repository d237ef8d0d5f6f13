//! MasterBlast Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! sequence form validation that are shared across all MasterBlast components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod task_error;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, NcbiConfig, QueueConfig};
pub use error::{AppError, ErrorMetadata, LogLevel, LookupError};
pub use task_error::{TaskError, TaskResultExt};
pub use validation::{
    normalize_sequence, normalize_sequence_form, read_sequence_file, validate_sequence_form,
    NormalizedSequence, SequenceForm, SequenceValidation, UploadedSequenceFile,
};
