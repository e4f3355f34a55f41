//! Backend-native primitives of the migration protocol.

use crate::config::StorageBackend;
use crate::domain::entities::{AppliedMigration, MigrationDescriptor};
use crate::domain::migration_registry::MigrationRegistry;
use crate::error::StorageResult;
use async_trait::async_trait;

/// Schema operations implemented once per backend.
///
/// The backend-agnostic driver is
/// [`crate::application::services::SchemaInitializer`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    fn kind(&self) -> StorageBackend;

    /// True if DDL and bookkeeping can share one transaction.
    ///
    /// When false, [`SchemaBackend::apply`] compensates on failure and must
    /// not be interrupted once started.
    fn transactional_ddl(&self) -> bool;

    /// Validates the configured database name against backend rules.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::Configuration`] if the name is invalid.
    fn check_database_name(&self) -> StorageResult<()>;

    /// Acquires a connection and runs a trivial statement.
    async fn check_connection(&self) -> StorageResult<()>;

    /// Registers this backend's migrations in order.
    fn register_migrations(&self, registry: &mut MigrationRegistry);

    /// Evaluates the migration's precondition.
    async fn target_exists(&self, migration: &MigrationDescriptor) -> StorageResult<bool>;

    /// Runs the statements and records the migration as one atomic unit.
    ///
    /// # Errors
    ///
    /// On error neither the target nor the bookkeeping record is left behind.
    async fn apply(&self, migration: &MigrationDescriptor) -> StorageResult<()>;

    /// Bookkeeping records ordered by name.
    async fn applied_migrations(&self) -> StorageResult<Vec<AppliedMigration>>;
}
