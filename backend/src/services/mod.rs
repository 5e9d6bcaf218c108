//! HTTP surface of the server.
//!
//! - `tiling`: listing and grid tiling under
//!   `/api/projects/{project_name}/mapsets/{mapset_name}/tiling_processes`.
//! - `merge`: listing and patch merge under
//!   `/api/projects/{project_name}/mapsets/{mapset_name}/merge_processes`.
//! - `resources`: status polling of the queued jobs.
//!
//! Processing requests are validated in the handler and then handed to the
//! job queue; the response is the `accepted` job status.

pub mod apidocs;
pub mod merge;
pub mod resources;
pub mod tiling;

use crate::error::ProcessingError;
use crate::processing::ProcessingBackend;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest};
use log::debug;
use std::time::Duration;

/// Application data shared by the processing handlers.
#[derive(Clone)]
pub struct ProcessingState {
    pub backend: ProcessingBackend,
    /// Owner of the jobs enqueued by this server.
    pub user_id: String,
    pub job_timeout: Duration,
}

/// Body errors of JSON requests are answered with a 400 `ErrorResponse`.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_error_handler)
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejecting body of {}: {err}", req.path());
    ProcessingError::InvalidRequest(err.to_string()).into()
}

/// Register all scopes of the server.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(tiling::configure_routes())
        .service(merge::configure_routes())
        .service(resources::configure_routes());
}
