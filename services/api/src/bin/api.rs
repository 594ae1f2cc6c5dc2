//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LocalFileStorage, LogNotifier, SmtpNotifier},
    config::Config,
    error::ApiError,
    web::{router, ApiDoc, AppState, Stores},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use kazusa_core::ports::{FileStorage, NotificationService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(?config, "Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    let db = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Notifier ---
    let notifier: Arc<dyn NotificationService> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "Completion notices go out over SMTP");
            Arc::new(SmtpNotifier::new(smtp, config.mail_from.clone())?)
        }
        None => {
            warn!("SMTP_HOST is not set; completion notices will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // --- 4. Initialize File Storage ---
    info!(dir = %config.upload_dir, url = %config.public_files_url, "Uploads are stored locally");
    let files: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
        &config.upload_dir,
        config.public_files_url.clone(),
    ));

    // --- 5. Build the Shared AppState ---
    let stores = Stores {
        courses: db.clone(),
        modules: db.clone(),
        users: db.clone(),
        payments: db.clone(),
        activities: db,
    };
    let app_state = Arc::new(AppState::new(config.clone(), stores, notifier, files));

    // --- 6. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .nest_service("/files", ServeDir::new(&config.upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
