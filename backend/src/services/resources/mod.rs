//! Status polling of queued jobs: `GET /api/resources/{user_id}/{resource_id}`.

mod get_status;

use actix_web::web::{get, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/resources";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{user_id}/{resource_id}", get().to(get_status::process))
}
