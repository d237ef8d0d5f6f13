//! Validation modules

pub mod sequence;

pub use sequence::{
    normalize_sequence, normalize_sequence_form, read_sequence_file, validate_sequence_form,
    NormalizedSequence, SequenceForm, SequenceValidation, UploadedSequenceFile,
};
