//! Civic Complaints Service
//!
//! A JSON API for reporting municipal issues and following them to resolution.
//!
//! ## Features
//!
//! - **Submission**: validated intake, classification and `CIV-######` IDs
//! - **Tracking**: append-only status history with derived progress
//! - **Admin**: filtered, priority-sorted listing and status changes
//! - **Transparency**: a verifiable hash chain over every complaint's history

mod config;
mod db;
mod handlers;
mod ledger;
mod lifecycle;
mod models;
mod pipeline;
mod repository;
mod validation;
mod view;

use handlers::AppState;
use pipeline::{RuleClassifier, SubmissionPipeline};
use repository::{ComplaintRepository, MemoryRepository, PgRepository};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civic_complaints=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting Civic Complaints Service");
    tracing::info!("Environment: {:?}", config.environment);

    // Choose the complaint store
    let repo: Arc<dyn ComplaintRepository> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(url).await?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            Arc::new(PgRepository::new(pool))
        }
        None => {
            tracing::warn!("No database configured, complaints are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    if config.seed_demo_data {
        repository::seed::seed_demo_data(repo.as_ref()).await?;
    }

    let pipeline = SubmissionPipeline::new(
        repo.clone(),
        Arc::new(RuleClassifier::new(config.classifier_latency)),
        config.classification_timeout,
    );

    // Create application state
    let state = AppState {
        repo,
        pipeline: Arc::new(pipeline),
        is_production: config.is_production(),
    };

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let app = handlers::api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(cors);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
