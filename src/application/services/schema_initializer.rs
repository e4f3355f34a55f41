//! Backend-agnostic driver of the migration protocol.
//!
//! Validation runs first (database name, then connectivity). Migrations are
//! then walked in registry order: a migration whose precondition reports the
//! target present is skipped, every other one is applied atomically by the
//! backend. The first failure stops the walk.
//!
//! Every I/O step races a [`CancellationToken`]. Applies on backends without
//! transactional DDL are the exception: once started they run to completion so
//! their compensation is never cut short.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::MigrationRegistry;
use crate::domain::repositories::SchemaBackend;
use crate::error::{StorageError, StorageResult};

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} skipped",
            self.applied.len(),
            self.skipped.len()
        )
    }
}

/// State of the background schema task, published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    Pending,
    Ready(String),
    Failed(String),
}

impl SchemaStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaStatus::Ready(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaStatus::Pending => "pending",
            SchemaStatus::Ready(_) => "ready",
            SchemaStatus::Failed(_) => "failed",
        }
    }
}

/// Drives a [`SchemaBackend`] through a [`MigrationRegistry`].
#[derive(Clone)]
pub struct SchemaInitializer {
    backend: Arc<dyn SchemaBackend>,
    registry: Arc<MigrationRegistry>,
}

impl SchemaInitializer {
    pub fn new(backend: Arc<dyn SchemaBackend>, registry: Arc<MigrationRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Builds the registry from the backend's own migrations.
    pub fn for_backend(backend: Arc<dyn SchemaBackend>) -> Self {
        let mut registry = MigrationRegistry::new();
        backend.register_migrations(&mut registry);
        Self::new(backend, Arc::new(registry))
    }

    pub fn registry(&self) -> &Arc<MigrationRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn SchemaBackend> {
        &self.backend
    }

    /// Checks the database name, then connectivity.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Configuration`] for an invalid database name
    /// - [`StorageError::Connectivity`] if the store cannot be reached
    /// - [`StorageError::Cancelled`] if `cancel` fires first
    pub async fn validate(&self, cancel: &CancellationToken) -> StorageResult<()> {
        self.backend.check_database_name()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StorageError::Cancelled),
            result = self.backend.check_connection() => result,
        }
    }

    /// Applies every pending migration in registry order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MigrationApply`] naming the first migration
    /// that failed, or [`StorageError::Cancelled`].
    pub async fn apply_migrations(
        &self,
        cancel: &CancellationToken,
    ) -> StorageResult<MigrationReport> {
        let mut report = MigrationReport::default();

        for migration in self.registry.migrations() {
            if cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }

            let present = if migration.is_unconditional() {
                false
            } else {
                let checked = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(StorageError::Cancelled),
                    result = self.backend.target_exists(migration) => result,
                };
                checked.map_err(|e| StorageError::migration(&migration.name, &e))?
            };

            if present {
                tracing::debug!(
                    migration = %migration.name,
                    target = %migration.target,
                    "Target exists, skipping migration"
                );
                report.skipped.push(migration.name.clone());
                continue;
            }

            tracing::info!(
                migration = %migration.name,
                target = %migration.target,
                backend = %self.backend.kind(),
                "Applying migration"
            );

            let result = if self.backend.transactional_ddl() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(StorageError::Cancelled),
                    result = self.backend.apply(migration) => result,
                }
            } else {
                self.backend.apply(migration).await
            };

            match result {
                Ok(()) => report.applied.push(migration.name.clone()),
                Err(StorageError::Cancelled) => return Err(StorageError::Cancelled),
                Err(e) => {
                    tracing::error!(
                        migration = %migration.name,
                        target = %migration.target,
                        error = %e,
                        "Migration failed"
                    );
                    return Err(StorageError::migration(&migration.name, &e));
                }
            }
        }

        Ok(report)
    }

    /// Validates, then applies migrations.
    pub async fn run(&self, cancel: &CancellationToken) -> StorageResult<MigrationReport> {
        self.validate(cancel).await?;
        self.apply_migrations(cancel).await
    }
}

/// Runs the initializer on its own task.
///
/// Failures are logged and published as [`SchemaStatus::Failed`]; the task
/// never panics and never stops the process.
pub fn spawn_schema_task(
    initializer: SchemaInitializer,
    cancel: CancellationToken,
) -> (JoinHandle<()>, watch::Receiver<SchemaStatus>) {
    let (tx, rx) = watch::channel(SchemaStatus::Pending);

    let handle = tokio::spawn(async move {
        let status = match initializer.run(&cancel).await {
            Ok(report) => {
                tracing::info!(
                    applied = report.applied.len(),
                    skipped = report.skipped.len(),
                    "Schema ready"
                );
                SchemaStatus::Ready(report.summary())
            }
            Err(StorageError::Cancelled) => {
                tracing::warn!("Schema initialization cancelled");
                SchemaStatus::Failed(StorageError::Cancelled.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "Schema initialization failed");
                SchemaStatus::Failed(e.to_string())
            }
        };

        tx.send_replace(status);
    });

    (handle, rx)
}
