//! Migration descriptors and bookkeeping records.

use chrono::{DateTime, Utc};

/// One registered schema change.
///
/// `statements` are backend-native: SQL text for relational backends, JSON
/// command documents for MongoDB. `precondition` is the query used to detect
/// that `target` already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDescriptor {
    /// Unique `{yyyyMMddHHmmssfff}_{slug}` name.
    pub name: String,
    /// Table or collection created by this migration, already prefixed.
    pub target: String,
    pub precondition: Option<String>,
    pub statements: Vec<String>,
    pub registered_at: DateTime<Utc>,
}

impl MigrationDescriptor {
    /// Returns true if the migration must be applied without an existence check.
    pub fn is_unconditional(&self) -> bool {
        self.precondition.is_none()
    }
}

/// A row of the migrations table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub migration_name: String,
    pub applied_at: DateTime<Utc>,
}
