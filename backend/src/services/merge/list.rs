use crate::services::apidocs;
use actix_web::{HttpResponse, Responder};
use common::model::process::MergeListResponse;

/// Handler for `GET .../merge_processes`.
///
/// # Returns
/// `200 OK` with a `MergeListResponse` describing the patch merge, built from
/// its API docs. No job is started.
pub(crate) async fn process() -> impl Responder {
    HttpResponse::Ok().json(MergeListResponse {
        merge_processes: vec![apidocs::describe("patch", &apidocs::patch_merge_post_docs())],
    })
}
