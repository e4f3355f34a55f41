//! HTTP server initialization and runtime setup.
//!
//! Builds the storage handles, starts the background schema task and runs
//! the Axum server until Ctrl+C.

use crate::application::services::{SchemaInitializer, ShorteningService, spawn_schema_task};
use crate::config::Config;
use crate::infrastructure::persistence::connect;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::code_generator::CodeGenerator;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the HTTP server with the given configuration.
///
/// The server starts listening before the schema is ready; `/health`
/// reports the schema task's progress.
///
/// # Errors
///
/// Returns an error if:
/// - The storage options are invalid
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let handles = connect(&config.storage)
        .await
        .context("Failed to create storage backend")?;

    let generator = Arc::new(CodeGenerator::new(
        &config.storage.alphabet,
        config.storage.code_length,
    )?);

    let initializer = SchemaInitializer::for_backend(handles.schema.clone());
    tracing::info!(
        migrations = initializer.registry().len(),
        "Migration registry built"
    );

    let cancel = CancellationToken::new();
    let (schema_task, schema_status) = spawn_schema_task(initializer, cancel.clone());

    let shortening_service = Arc::new(ShorteningService::new(handles.repository, generator));
    let state = AppState::new(
        shortening_service,
        handles.schema,
        schema_status,
        config.public_scheme.clone(),
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(e) = schema_task.await {
        tracing::warn!(error = %e, "Schema task did not finish cleanly");
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
