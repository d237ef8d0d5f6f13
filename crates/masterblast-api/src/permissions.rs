//! Who may see a job and its hits
//!
//! Jobs without an owner are public. Results are also visible to users the job
//! was shared with; single hits only to the owner.

use masterblast_core::models::BlastJob;
use masterblast_core::AppError;
use uuid::Uuid;

use crate::state::DbState;

fn is_public_or_owned(job: &BlastJob, caller: Option<Uuid>) -> bool {
    job.user_id.is_none() || job.is_owned_by(caller)
}

pub async fn ensure_can_view_job(
    db: &DbState,
    job: &BlastJob,
    caller: Option<Uuid>,
) -> Result<(), AppError> {
    if is_public_or_owned(job, caller) {
        return Ok(());
    }
    if let Some(caller) = caller {
        if db.buddies.is_shared_with(caller, job.id).await? {
            return Ok(());
        }
    }
    Err(AppError::Forbidden(
        "You do not have access to this BLAST job".to_string(),
    ))
}

pub fn ensure_can_view_hit(job: &BlastJob, caller: Option<Uuid>) -> Result<(), AppError> {
    if is_public_or_owned(job, caller) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this BLAST hit".to_string(),
        ))
    }
}
