pub mod auth;
pub mod error;

use actix_web::HttpResponse;
use serde_json::json;

pub use error::{json_config, validation_error, ApiError};

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
