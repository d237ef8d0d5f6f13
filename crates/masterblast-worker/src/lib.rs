pub mod context;
pub mod queue;

pub use context::{BlastJobContext, TaskHandlerContext};
pub use queue::{BlastQueue, BlastQueueConfig};
