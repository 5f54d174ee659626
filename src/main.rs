mod auth;
mod config;
mod dto;
mod error;
mod handlers;
mod models;
mod repository;
mod service;
mod state;
mod storage;
mod views;

use axum::{ServiceExt, extract::Request};

use std::sync::Arc;

use repository::PgRepository;
use service::NoteService;
use state::AppState;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to locate or load config: {e}");
    });
    tracing::info!("Successfully loaded notes board config");

    // Repository creation and migration
    let mut repo = PgRepository::new(&cfg.database_dsn)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to establish database connection: {e}");
            panic!("failed to establish database connection: {e}");
        });

    repo.migrate().await.unwrap_or_else(|e| {
        tracing::error!("Failed to migrate database: {e}");
        panic!("failed to migrate database: {e}");
    });

    // Blob store
    tracing::info!("Configured blob store: {}", cfg.storage.describe());
    let store: Arc<dyn storage::BlobStore> = storage::from_config(&cfg.storage)
        .unwrap_or_else(|e| {
            tracing::error!("Failed to set up blob store: {e}");
            panic!("failed to set up blob store: {e}");
        })
        .into();

    // Service creation
    let service = Arc::new(NoteService::new(Arc::new(repo), store));
    service::spawn_reconciler(service.clone(), cfg.reconcile.clone());

    let port = cfg.port;
    let app = handlers::app(Arc::new(AppState::new(service, cfg)));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("Failed to bind to address");

    // Starting router
    tracing::info!(
        "Notes board listening on {}",
        listener.local_addr().expect("listener has a local address")
    );
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("failed to start server");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
