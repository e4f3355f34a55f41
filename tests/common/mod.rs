#![allow(dead_code)]

use shortstore::application::services::{SchemaInitializer, SchemaStatus, ShorteningService};
use shortstore::config::{DEFAULT_ALPHABET, DEFAULT_DATABASE_NAME, DEFAULT_TABLE_PREFIX};
use shortstore::domain::entities::ShortenedUrl;
use shortstore::domain::repositories::ShortenedUrlRepository;
use shortstore::infrastructure::persistence::{SqliteSchema, SqliteShortenedUrlRepository};
use shortstore::state::AppState;
use shortstore::utils::code_generator::CodeGenerator;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Fresh in-memory database. One connection, kept for the pool's lifetime.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub fn schema(pool: &SqlitePool) -> Arc<SqliteSchema> {
    Arc::new(SqliteSchema::new(
        pool.clone(),
        DEFAULT_DATABASE_NAME,
        DEFAULT_TABLE_PREFIX,
    ))
}

pub fn repository(pool: &SqlitePool) -> Arc<SqliteShortenedUrlRepository> {
    Arc::new(SqliteShortenedUrlRepository::new(
        pool.clone(),
        DEFAULT_TABLE_PREFIX,
    ))
}

/// In-memory database with every migration applied.
pub async fn migrated_pool() -> SqlitePool {
    let pool = memory_pool().await;
    SchemaInitializer::for_backend(schema(&pool))
        .run(&CancellationToken::new())
        .await
        .unwrap();
    pool
}

pub async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
    sqlx::query("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .unwrap()
        .is_some()
}

pub async fn insert_url(pool: &SqlitePool, code: &str, url: &str) -> ShortenedUrl {
    let record = ShortenedUrl::new(
        url.to_string(),
        code.to_string(),
        ShortenedUrl::build_short_url("http", "localhost", code),
    );
    repository(pool).add(&record).await.unwrap();
    record
}

pub fn ready_status() -> watch::Receiver<SchemaStatus> {
    let (_tx, rx) = watch::channel(SchemaStatus::Ready("2 applied, 0 skipped".to_string()));
    rx
}

pub fn create_test_state(pool: SqlitePool, schema_status: watch::Receiver<SchemaStatus>) -> AppState {
    let repository: Arc<dyn ShortenedUrlRepository> = repository(&pool);
    let generator = Arc::new(CodeGenerator::new(DEFAULT_ALPHABET, 7).unwrap());
    let shortening_service = Arc::new(ShorteningService::new(repository, generator));

    AppState::new(shortening_service, schema(&pool), schema_status, "http")
}
