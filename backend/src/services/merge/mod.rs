//! # Merge Service Module
//!
//! Merges the per-tile results of several source mapsets into one mapset.
//!
//! ## Registered Routes:
//!
//! *   **`GET /`**: the available merge processes with their categories.
//! *   **`POST /patch`**: enqueue a patch merge job. Expects a
//!     `PatchMergeRequest` and answers with the accepted job.
//! *   **`GET /patch`**: the API description of `POST /patch`.

mod list;
mod patch;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/projects/{project_name}/mapsets/{mapset_name}/merge_processes";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/patch", post().to(patch::process))
        .route("/patch", get().to(patch::describe))
}
