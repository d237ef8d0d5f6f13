//! MasterBlast API Library
//!
//! HTTP handlers, authentication and application setup. Modules are public so
//! integration tests can assemble the router without a running server.

mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
pub mod permissions;
pub mod setup;
pub mod state;
pub mod task_dispatch;
mod telemetry;

pub use error::ErrorResponse;
pub use setup::routes::api_routes;
pub use state::{AppState, BlastState, DbState};
pub use task_dispatch::{dispatch_blast_job, Dispatch};
