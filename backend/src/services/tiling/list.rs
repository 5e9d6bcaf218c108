use crate::services::apidocs;
use actix_web::{HttpResponse, Responder};
use common::model::process::TilingListResponse;

/// Handler for `GET .../tiling_processes`.
///
/// # Returns
/// `200 OK` with a `TilingListResponse` describing the grid tiling, built from
/// its API docs. No job is started.
pub(crate) async fn process() -> impl Responder {
    HttpResponse::Ok().json(TilingListResponse {
        tiling_processes: vec![apidocs::describe("grid", &apidocs::grid_tiling_post_docs())],
    })
}
