//! Sequence submission form validation and normalization
//!
//! A submission carries a BLAST mode, an optional job name, pasted sequence text
//! and an optional uploaded file. Validation classifies the submission into exactly
//! one [`SequenceValidation`] outcome; normalization turns an accepted submission
//! into a `(header, sequence)` pair with all line breaks removed.
//!
//! Grammar of an accepted sequence (case-insensitive, anchored at both ends):
//! - an optional FASTA header line starting with `>`, terminated by `\n` or `\r\n`
//! - one or more runs of alphabet characters, each followed by any number of line
//!   terminators
//!
//! Nucleotide mode allows `acgt`. Protein mode allows the twenty standard amino
//! acids; ambiguity codes such as `b`, `x` or `z` are rejected.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::BlastProgram;

static NUCLEOTIDE_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| grammar(BlastProgram::Blastn));
static PROTEIN_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| grammar(BlastProgram::Blastp));

fn grammar(program: BlastProgram) -> Regex {
    let pattern = format!(
        r"(?i)^(>.+(\n|\r\n))?([{}]+(\n|\r\n)*)+$",
        program.alphabet()
    );
    Regex::new(&pattern).expect("sequence grammar is a valid regex")
}

/// Result of validating a submission. Exactly one value per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceValidation {
    Valid,
    InvalidInputTypes,
    InvalidFileObject,
    #[serde(rename = "INVALID_BLAST_MODE")]
    InvalidMode,
    #[serde(rename = "MISSING_SEQUENCE_INPUT")]
    MissingSequence,
    InvalidSequence,
}

impl SequenceValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SequenceValidation::Valid)
    }

    /// Machine-readable name, also used as the API error code.
    pub fn code(&self) -> &'static str {
        match self {
            SequenceValidation::Valid => "VALID",
            SequenceValidation::InvalidInputTypes => "INVALID_INPUT_TYPES",
            SequenceValidation::InvalidFileObject => "INVALID_FILE_OBJECT",
            SequenceValidation::InvalidMode => "INVALID_BLAST_MODE",
            SequenceValidation::MissingSequence => "MISSING_SEQUENCE_INPUT",
            SequenceValidation::InvalidSequence => "INVALID_SEQUENCE",
        }
    }
}

/// A `seq-file` part of a multipart submission.
///
/// Only parts that arrived with a file name count as uploaded files. A plain form
/// field named `seq-file` is kept so validation can reject it.
#[derive(Debug, Clone, Default)]
pub struct UploadedSequenceFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedSequenceFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            bytes,
        }
    }

    pub fn is_file_object(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Raw submission as received from the client.
///
/// Text fields are `None` when the client sent something that is not text
/// (a missing field, or a value that failed UTF-8 decoding).
#[derive(Debug, Clone, Default)]
pub struct SequenceForm {
    pub blast_mode: Option<String>,
    pub job_name: Option<String>,
    pub seq_text: Option<String>,
    pub seq_file: Option<UploadedSequenceFile>,
    /// Decoded content of `seq_file`, see [`read_sequence_file`].
    pub seq_file_text: Option<String>,
}

impl SequenceForm {
    /// Build a form from a text submission with no file attached.
    pub fn from_text(blast_mode: &str, job_name: &str, seq_text: &str) -> Self {
        Self {
            blast_mode: Some(blast_mode.to_string()),
            job_name: Some(job_name.to_string()),
            seq_text: Some(seq_text.to_string()),
            seq_file: None,
            seq_file_text: Some(String::new()),
        }
    }

    /// Attach an uploaded file, decoding its content the same way the API does.
    pub fn with_file(mut self, file: UploadedSequenceFile) -> Self {
        self.seq_file_text = Some(read_sequence_file(Some(&file)));
        self.seq_file = Some(file);
        self
    }

    fn has_file_object(&self) -> bool {
        self.seq_file
            .as_ref()
            .is_some_and(UploadedSequenceFile::is_file_object)
    }
}

/// Header and line-break free sequence of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedSequence {
    pub header: String,
    pub sequence: String,
}

/// Best-effort decoding of an uploaded file.
///
/// Returns an empty string when there is no file or its content is not UTF-8, which
/// makes an undecodable file indistinguishable from an empty one. The file
/// extension is never looked at.
pub fn read_sequence_file(file: Option<&UploadedSequenceFile>) -> String {
    match file {
        Some(file) if file.is_file_object() => {
            String::from_utf8(file.bytes.clone()).unwrap_or_default()
        }
        _ => String::new(),
    }
}

/// Classify a submission.
///
/// Checks run in a fixed order and the first failing check decides the outcome:
/// field types, file object, BLAST mode, presence of a sequence, and finally the
/// sequence grammar. A non-empty uploaded file wins over pasted text.
pub fn validate_sequence_form(form: &SequenceForm) -> SequenceValidation {
    let (Some(blast_mode), Some(_job_name), Some(seq_text), Some(seq_file_text)) = (
        form.blast_mode.as_deref(),
        form.job_name.as_deref(),
        form.seq_text.as_deref(),
        form.seq_file_text.as_deref(),
    ) else {
        return SequenceValidation::InvalidInputTypes;
    };

    if form.seq_file.as_ref().is_some_and(|f| !f.is_file_object()) {
        return SequenceValidation::InvalidFileObject;
    }

    let Ok(program) = blast_mode.parse::<BlastProgram>() else {
        return SequenceValidation::InvalidMode;
    };

    if seq_text.is_empty() && seq_file_text.is_empty() {
        return SequenceValidation::MissingSequence;
    }

    let sequence = if form.has_file_object() && !seq_file_text.is_empty() {
        seq_file_text
    } else {
        seq_text
    };

    let grammar = match program {
        BlastProgram::Blastn => &NUCLEOTIDE_GRAMMAR,
        BlastProgram::Blastp => &PROTEIN_GRAMMAR,
    };
    if !grammar.is_match(sequence) {
        return SequenceValidation::InvalidSequence;
    }

    SequenceValidation::Valid
}

/// Split an accepted submission into header and sequence.
///
/// Does not re-validate. The file content is used whenever a file was uploaded,
/// otherwise the pasted text. A named upload that is empty or not UTF-8 therefore
/// yields an empty sequence even when validation accepted the pasted text.
pub fn normalize_sequence_form(form: &SequenceForm) -> NormalizedSequence {
    let raw = if form.has_file_object() {
        form.seq_file_text.as_deref()
    } else {
        form.seq_text.as_deref()
    };
    normalize_sequence(raw.unwrap_or_default())
}

/// Normalize raw sequence text, see [`normalize_sequence_form`].
pub fn normalize_sequence(raw: &str) -> NormalizedSequence {
    let text = raw.replace("\r\n", "\n");

    match text.strip_prefix('>') {
        Some(rest) => {
            let rest = rest.strip_suffix('\n').unwrap_or(rest);
            let mut lines = rest.split('\n');
            let header = lines.next().unwrap_or_default().to_string();
            NormalizedSequence {
                header,
                sequence: lines.collect(),
            }
        }
        None => NormalizedSequence {
            header: String::new(),
            sequence: text.replace('\n', ""),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(mode: &str, seq: &str) -> SequenceValidation {
        validate_sequence_form(&SequenceForm::from_text(mode, "", seq))
    }

    fn file_form(seq_text: &str, content: &str) -> SequenceForm {
        SequenceForm::from_text("blastn", "", seq_text)
            .with_file(UploadedSequenceFile::new("query.fasta", content.as_bytes().to_vec()))
    }

    #[test]
    fn test_plain_sequences() {
        assert_eq!(text("blastn", "atcg"), SequenceValidation::Valid);
        assert_eq!(text("blastn", "ATCGatcg"), SequenceValidation::Valid);
        assert_eq!(text("blastn", "atcgb"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastp", "acdefghiklmnpqrstvwy"), SequenceValidation::Valid);
        assert_eq!(text("blastp", "MKVL"), SequenceValidation::Valid);
    }

    #[test]
    fn test_ambiguous_residues_are_rejected() {
        for residue in ["b", "j", "o", "u", "x", "z", "*", "-"] {
            let seq = format!("mkv{}l", residue);
            assert_eq!(text("blastp", &seq), SequenceValidation::InvalidSequence);
        }
        assert_eq!(text("blastn", "acgtn"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", "acgu"), SequenceValidation::InvalidSequence);
    }

    #[test]
    fn test_invalid_mode() {
        assert_eq!(text("blastx", "atcg"), SequenceValidation::InvalidMode);
        assert_eq!(text("BLASTN", "atcg"), SequenceValidation::InvalidMode);
        assert_eq!(text("", "atcg"), SequenceValidation::InvalidMode);
    }

    #[test]
    fn test_missing_sequence() {
        assert_eq!(text("blastn", ""), SequenceValidation::MissingSequence);
    }

    #[test]
    fn test_mode_is_checked_before_missing_sequence() {
        assert_eq!(text("tblastn", ""), SequenceValidation::InvalidMode);
    }

    #[test]
    fn test_missing_field_is_invalid_input_types() {
        let mut form = SequenceForm::from_text("blastn", "", "atcg");
        form.job_name = None;
        assert_eq!(
            validate_sequence_form(&form),
            SequenceValidation::InvalidInputTypes
        );

        let mut form = SequenceForm::from_text("blastx", "", "atcg");
        form.seq_file_text = None;
        assert_eq!(
            validate_sequence_form(&form),
            SequenceValidation::InvalidInputTypes
        );
    }

    #[test]
    fn test_non_file_upload_is_invalid_file_object() {
        let mut form = SequenceForm::from_text("blastx", "", "atcg");
        form.seq_file = Some(UploadedSequenceFile {
            file_name: None,
            content_type: None,
            bytes: b"atcg".to_vec(),
        });
        assert_eq!(
            validate_sequence_form(&form),
            SequenceValidation::InvalidFileObject
        );
    }

    #[test]
    fn test_headers_and_line_breaks() {
        assert_eq!(text("blastn", ">seq1\natcg"), SequenceValidation::Valid);
        assert_eq!(text("blastn", ">seq1 homo sapiens\r\natcg\r\nat\ncg\n\n"), SequenceValidation::Valid);
        assert_eq!(text("blastn", "atcg\r\n\r\n"), SequenceValidation::Valid);
        assert_eq!(text("blastn", ">seq1\n"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", ">seq1\n\n\n"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", " >seq1\natcg"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", "atcg "), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", "\natcg"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", ">a\n>b\natcg"), SequenceValidation::InvalidSequence);
        assert_eq!(text("blastn", "at\rcg"), SequenceValidation::InvalidSequence);
    }

    #[test]
    fn test_file_content_takes_priority() {
        let form = file_form("bbb", "atcg");
        assert_eq!(validate_sequence_form(&form), SequenceValidation::Valid);

        let form = file_form("atcg", "bbb");
        assert_eq!(
            validate_sequence_form(&form),
            SequenceValidation::InvalidSequence
        );
    }

    #[test]
    fn test_empty_file_falls_back_to_text() {
        let form = file_form("atcg", "");
        assert_eq!(validate_sequence_form(&form), SequenceValidation::Valid);
    }

    #[test]
    fn test_undecodable_file_reads_as_empty() {
        let file = UploadedSequenceFile::new("query.bin", vec![0xff, 0xfe, 0x00]);
        assert_eq!(read_sequence_file(Some(&file)), "");
        assert_eq!(read_sequence_file(None), "");

        let form = SequenceForm::from_text("blastn", "", "").with_file(file);
        assert_eq!(
            validate_sequence_form(&form),
            SequenceValidation::MissingSequence
        );
    }

    #[test]
    fn test_any_extension_is_accepted() {
        let file = UploadedSequenceFile::new("notes.docx", b">x\nacgt\n".to_vec());
        assert_eq!(read_sequence_file(Some(&file)), ">x\nacgt\n");
    }

    #[test]
    fn test_normalize_without_header() {
        let normalized = normalize_sequence("atcg\r\nat\ncg\n");
        assert_eq!(normalized.header, "");
        assert_eq!(normalized.sequence, "atcgatcg");
    }

    #[test]
    fn test_normalize_is_idempotent_on_plain_sequence() {
        let once = normalize_sequence("atcgcg");
        let twice = normalize_sequence(&once.sequence);
        assert_eq!(once, twice);
        assert_eq!(twice.header, "");
    }

    #[test]
    fn test_normalize_mixed_line_endings() {
        let form = file_form("", ">h\r\natcg\ncg");
        let normalized = normalize_sequence_form(&form);
        assert_eq!(normalized.header, "h");
        assert_eq!(normalized.sequence, "atcgcg");
    }

    #[test]
    fn test_normalize_fasta_round_trip() {
        let normalized = normalize_sequence(">sp|P69905|HBA_HUMAN Hemoglobin\nMVLSPADK\nTNVKAAWG\n");
        assert_eq!(normalized.header, "sp|P69905|HBA_HUMAN Hemoglobin");
        assert_eq!(normalized.sequence, "MVLSPADKTNVKAAWG");
    }

    #[test]
    fn test_normalize_uses_file_whenever_one_was_uploaded() {
        let form = file_form("acgt", "");
        assert_eq!(normalize_sequence_form(&form).sequence, "");

        let form = SequenceForm::from_text("blastn", "", ">t\r\nacgt");
        let normalized = normalize_sequence_form(&form);
        assert_eq!(normalized.header, "t");
        assert_eq!(normalized.sequence, "acgt");
    }

    #[test]
    fn test_codes_match_serialized_names() {
        for outcome in [
            SequenceValidation::Valid,
            SequenceValidation::InvalidInputTypes,
            SequenceValidation::InvalidFileObject,
            SequenceValidation::InvalidMode,
            SequenceValidation::MissingSequence,
            SequenceValidation::InvalidSequence,
        ] {
            let json = serde_json::to_value(outcome).unwrap();
            assert_eq!(json, serde_json::Value::String(outcome.code().to_string()));
        }
    }
}
