//! Tally users service: password and Google sign-in, refresh-token rotation
//! with a per-user session cap, and user settings.

pub mod handlers;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::web;

use services::AuthService;

/// Shared by every worker.
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(auth: AuthService, request_timeout: Duration) -> Self {
        Self {
            auth: Arc::new(auth),
            request_timeout,
        }
    }
}

/// Mounts every route under `/api/v1`. `web::Data<AppState>` must be
/// registered on the app.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(handlers::json_config())
            .route("/health", web::get().to(handlers::health_check))
            .route("/signIn", web::post().to(handlers::auth::sign_in))
            .route("/signUp", web::post().to(handlers::auth::sign_up))
            .route("/refresh", web::post().to(handlers::auth::refresh))
            .route("/google-signIn", web::post().to(handlers::auth::google_sign_in))
            .route("/me", web::get().to(handlers::auth::get_current_user))
            .route("/settings", web::put().to(handlers::auth::update_settings)),
    );
}

pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .max_age(300)
}
