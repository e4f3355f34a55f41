//! PostgreSQL backend.
//!
//! DDL is transactional, so a migration's statements and its bookkeeping row
//! share one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

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

const DIALECT: SqlDialect = SqlDialect::Postgres;

/// PostgreSQL repository for shortened URLs.
#[derive(Debug, Clone)]
pub struct PgShortenedUrlRepository {
    pool: PgPool,
    statements: ShortenedUrlStatements,
}

impl PgShortenedUrlRepository {
    pub fn new(pool: PgPool, table_prefix: &str) -> Self {
        Self {
            pool,
            statements: ShortenedUrlStatements::new(DIALECT, &shortened_table(table_prefix)),
        }
    }
}

#[async_trait]
impl ShortenedUrlRepository for PgShortenedUrlRepository {
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
            .bind(record.id)
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

/// PostgreSQL schema backend.
#[derive(Debug, Clone)]
pub struct PgSchema {
    pool: PgPool,
    database_name: String,
    table_prefix: String,
}

impl PgSchema {
    pub fn new(pool: PgPool, database_name: &str, table_prefix: &str) -> Self {
        Self {
            pool,
            database_name: database_name.to_string(),
            table_prefix: table_prefix.to_string(),
        }
    }
}

#[async_trait]
impl SchemaBackend for PgSchema {
    fn kind(&self) -> StorageBackend {
        StorageBackend::Postgres
    }

    fn transactional_ddl(&self) -> bool {
        true
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
        // Dropping the transaction without commit rolls it back.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for statement in &migration.statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let bookkeeping = DIALECT.insert_applied_migration(&migrations_table(&self.table_prefix));
        sqlx::query(&bookkeeping)
            .bind(&migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
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
