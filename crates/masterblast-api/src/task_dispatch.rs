//! Hand a created job to the background queue, or run it in the request when
//! the queue refuses it.

use tokio::sync::mpsc::error::TrySendError;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Queued,
    RanInline,
}

pub async fn dispatch_blast_job(state: &AppState, job_id: i64) -> Dispatch {
    match state.blast.queue.submit(job_id) {
        Ok(()) => Dispatch::Queued,
        Err(e) => {
            let reason = match e {
                TrySendError::Full(_) => "full",
                TrySendError::Closed(_) => "closed",
            };
            tracing::warn!(job_id = job_id, reason = reason, "BLAST queue unavailable, running job inline");
            // The outcome is recorded on the job either way.
            if let Err(e) = state.blast.runner.perform_blast_job(job_id).await {
                tracing::warn!(job_id = job_id, error = %e, "Inline BLAST job failed");
            }
            Dispatch::RanInline
        }
    }
}
