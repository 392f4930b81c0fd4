use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use tally_auth::services::{AuthService, GoogleTokenVerifier, TokenCodec, SERVICE_NAME};
use tally_auth::{configure_routes, cors, AppState};
use tally_config::AppConfig;
use tally_database::{Database, DatabaseConfig};
use tally_observability::{init_tracing, TracingConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Reads .env first so RUST_LOG and LOG_FORMAT from it apply to tracing.
    let config = AppConfig::from_env();
    init_tracing(TracingConfig::for_service(SERVICE_NAME));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let db_config = match DatabaseConfig::from_env() {
        Ok(db_config) => db_config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid database configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(max_connections = db_config.max_connections, "Connecting to database");
    let database = match Database::new(&db_config).await {
        Ok(database) => database,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed");
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(e) = database.migrate().await {
            tracing::error!(error = %e, "Migrations failed");
            std::process::exit(1);
        }
        tracing::info!("Database migrations applied");
    }

    let auth = AuthService::new(
        Arc::new(database.users()),
        Arc::new(database.refresh_tokens()),
        TokenCodec::new(&config.tokens),
        config.max_user_sessions,
        Arc::new(GoogleTokenVerifier::new(config.google_key.clone())),
    );
    let state = web::Data::new(AppState::new(auth, config.request_timeout));

    tracing::info!(
        port = config.port,
        max_user_sessions = config.max_user_sessions,
        request_timeout = ?config.request_timeout,
        "Starting {}", SERVICE_NAME
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors())
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
