//! MySQL backend.
//!
//! MySQL commits DDL implicitly, so a transaction cannot cover a migration.
//! Statements and bookkeeping run in sequence and a failure is compensated by
//! dropping the target table, but only when this apply created it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use super::dialect::{
    ShortenedUrlStatements, SqlDialect, map_insert_error, map_sqlx_error,
    register_relational_migrations,
};
use super::table_names::{migrations_table, shortened_table};
use crate::config::StorageBackend;
use crate::domain::MigrationRegistry;
use crate::domain::entities::{AppliedMigration, MigrationDescriptor, ShortenedUrl};
use crate::domain::repositories::{SchemaBackend, ShortenedUrlRepository};
use crate::error::StorageResult;

const DIALECT: SqlDialect = SqlDialect::MySql;

/// MySQL repository for shortened URLs.
///
/// Ids are stored as `CHAR(36)` text.
#[derive(Debug, Clone)]
pub struct MySqlShortenedUrlRepository {
    pool: MySqlPool,
    statements: ShortenedUrlStatements,
}

impl MySqlShortenedUrlRepository {
    pub fn new(pool: MySqlPool, table_prefix: &str) -> Self {
        Self {
            pool,
            statements: ShortenedUrlStatements::new(DIALECT, &shortened_table(table_prefix)),
        }
    }
}

#[async_trait]
impl ShortenedUrlRepository for MySqlShortenedUrlRepository {
    async fn exists(&self, code: &str) -> StorageResult<bool> {
        let found = sqlx::query(&self.statements.exists)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(found)
    }

    async fn add(&self, record: &ShortenedUrl) -> StorageResult<()> {
        sqlx::query(&self.statements.insert)
            .bind(record.id.to_string())
            .bind(&record.original_url)
            .bind(&record.short_url)
            .bind(&record.code)
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, &record.code))?;

        Ok(())
    }

    async fn get_original_url(&self, code: &str) -> StorageResult<Option<String>> {
        sqlx::query_scalar::<_, String>(&self.statements.original_url)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// MySQL schema backend.
#[derive(Debug, Clone)]
pub struct MySqlSchema {
    pool: MySqlPool,
    database_name: String,
    table_prefix: String,
}

impl MySqlSchema {
    pub fn new(pool: MySqlPool, database_name: &str, table_prefix: &str) -> Self {
        Self {
            pool,
            database_name: database_name.to_string(),
            table_prefix: table_prefix.to_string(),
        }
    }

    /// Runs the statements, then the bookkeeping insert.
    ///
    /// `target_created` is set once a statement of a guarded migration has
    /// succeeded; the precondition saw the target absent, so it is ours.
    async fn run_statements(
        &self,
        migration: &MigrationDescriptor,
        target_created: &mut bool,
    ) -> StorageResult<()> {
        for statement in &migration.statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            *target_created = !migration.is_unconditional();
        }

        let bookkeeping = DIALECT.insert_applied_migration(&migrations_table(&self.table_prefix));
        sqlx::query(&bookkeeping)
            .bind(&migration.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[async_trait]
impl SchemaBackend for MySqlSchema {
    fn kind(&self) -> StorageBackend {
        StorageBackend::MySql
    }

    fn transactional_ddl(&self) -> bool {
        false
    }

    fn check_database_name(&self) -> StorageResult<()> {
        DIALECT.check_database_name(&self.database_name)
    }

    async fn check_connection(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    fn register_migrations(&self, registry: &mut MigrationRegistry) {
        register_relational_migrations(DIALECT, &self.table_prefix, registry);
    }

    async fn target_exists(&self, migration: &MigrationDescriptor) -> StorageResult<bool> {
        let Some(precondition) = migration.precondition.as_deref() else {
            return Ok(false);
        };

        let found = sqlx::query(precondition)
            .bind(&migration.target)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(found)
    }

    async fn apply(&self, migration: &MigrationDescriptor) -> StorageResult<()> {
        let mut target_created = false;
        let Err(err) = self.run_statements(migration, &mut target_created).await else {
            return Ok(());
        };

        if !target_created {
            tracing::warn!(
                migration = %migration.name,
                target = %migration.target,
                error = %err,
                "Migration failed before creating its target, leaving target untouched"
            );
            return Err(err);
        }

        tracing::warn!(
            migration = %migration.name,
            target = %migration.target,
            error = %err,
            "Migration failed, dropping target"
        );

        if let Err(drop_err) = sqlx::query(&DIALECT.drop_table(&migration.target))
            .execute(&self.pool)
            .await
        {
            tracing::error!(
                migration = %migration.name,
                target = %migration.target,
                error = %drop_err,
                "Failed to drop target after migration failure"
            );
        }

        Err(err)
    }

    async fn applied_migrations(&self) -> StorageResult<Vec<AppliedMigration>> {
        let query = DIALECT.select_applied_migrations(&migrations_table(&self.table_prefix));

        let rows = sqlx::query_as::<_, (String, DateTime<Utc>)>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(migration_name, applied_at)| AppliedMigration {
                migration_name,
                applied_at,
            })
            .collect())
    }
}
