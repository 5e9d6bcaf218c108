//! # Tiling Service Module
//!
//! Splits the current region of a mapset into tiles.
//!
//! ## Registered Routes:
//!
//! *   **`GET /`**: the available tiling processes with their categories.
//! *   **`POST /grid`**: enqueue a grid tiling job. Expects a `GridTilingRequest`
//!     with `width`, `height` and `grid_prefix` and answers with the accepted job.
//! *   **`GET /grid`**: the API description of `POST /grid`.

mod grid;
mod list;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/projects/{project_name}/mapsets/{mapset_name}/tiling_processes";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/grid", post().to(grid::process))
        .route("/grid", get().to(grid::describe))
}
