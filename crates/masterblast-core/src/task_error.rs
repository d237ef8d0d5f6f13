//! Background BLAST failures.
//!
//! A failed run is reported back to the submitter through the job's `error_msg`
//! column, so every `TaskError` carries the short user-facing message that will be
//! stored alongside the underlying cause that only goes to the logs.

use std::fmt;

use crate::constants::{ERROR_BLAST_NOT_EXECUTED, MAX_ERROR_MSG_LENGTH};

#[derive(Debug)]
pub struct TaskError {
    inner: anyhow::Error,
    job_message: &'static str,
}

impl TaskError {
    /// Wrap `err`, recording `job_message` as the text shown for the job.
    pub fn new(job_message: &'static str, err: impl Into<anyhow::Error>) -> Self {
        debug_assert!(job_message.len() <= MAX_ERROR_MSG_LENGTH);
        Self {
            inner: err.into(),
            job_message,
        }
    }

    /// The message persisted to `blast_jobs.error_msg`.
    pub fn job_message(&self) -> &'static str {
        self.job_message
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job_message, self.inner)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for TaskError {
    /// Anything unclassified means the search itself never ran.
    fn from(err: anyhow::Error) -> Self {
        Self::new(ERROR_BLAST_NOT_EXECUTED, err)
    }
}

/// Attach the job-facing message to an error result.
pub trait TaskResultExt<T> {
    fn job_failed(self, job_message: &'static str) -> Result<T, TaskError>;
}

impl<T, E: Into<anyhow::Error>> TaskResultExt<T> for Result<T, E> {
    fn job_failed(self, job_message: &'static str) -> Result<T, TaskError> {
        self.map_err(|e| TaskError::new(job_message, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ERROR_BLAST_RESULT_UNREADABLE;

    #[test]
    fn test_from_anyhow_defaults_to_not_executed() {
        let err: TaskError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err.job_message(), ERROR_BLAST_NOT_EXECUTED);
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_result_ext_sets_job_message() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("bad xml"));
        let err = result.job_failed(ERROR_BLAST_RESULT_UNREADABLE).unwrap_err();
        assert_eq!(err.job_message(), ERROR_BLAST_RESULT_UNREADABLE);
        assert_eq!(err.inner().to_string(), "bad xml");
    }
}
