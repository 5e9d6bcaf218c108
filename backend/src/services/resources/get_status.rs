use crate::job_controller::JobsState;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobState;
use common::model::process::ErrorResponse;

/// Returns the current status of a job.
///
/// - `200 OK` while the job is accepted or running and once it finished.
/// - `400 Bad Request` with the status record if it failed or timed out.
/// - `404 Not Found` for unknown ids and jobs of other users.
pub(crate) async fn process(
    path: web::Path<(String, String)>,
    state: web::Data<JobsState>,
) -> impl Responder {
    let (user_id, resource_id) = path.into_inner();
    match state.status(&user_id, &resource_id).await {
        Some(status) => match status.status {
            JobState::Error | JobState::Timeout => HttpResponse::BadRequest().json(status),
            _ => HttpResponse::Ok().json(status),
        },
        None => HttpResponse::NotFound().json(ErrorResponse {
            error: "NotFound".to_string(),
            message: format!("resource <{resource_id}> of user <{user_id}> not found"),
        }),
    }
}
