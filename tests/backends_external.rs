//! Round trips against live PostgreSQL, MySQL and MongoDB servers.
//!
//! Ignored by default. Point the matching variable at a scratch database and
//! run with `cargo test -- --ignored`:
//!
//! - `TEST_POSTGRES_URL`
//! - `TEST_MYSQL_URL`
//! - `TEST_MONGODB_URL` (database `TEST_MONGODB_DATABASE`, default `shortstore_test`)
//!
//! Each run uses a fresh table prefix, so runs do not see each other's data.
//! Besides the round trip, each backend is checked for a failed apply leaving
//! neither target nor bookkeeping record, and for a failed create of an
//! existing target leaving that target and its rows in place.

use serde_json::json;
use shortstore::application::services::{SchemaInitializer, ShorteningService};
use shortstore::config::{DEFAULT_ALPHABET, StorageBackend, StorageOptions};
use shortstore::domain::MigrationRegistry;
use shortstore::error::StorageError;
use shortstore::infrastructure::persistence::dialect::SqlDialect;
use shortstore::infrastructure::persistence::table_names::shortened_table;
use shortstore::infrastructure::persistence::{StorageHandles, connect};
use shortstore::utils::code_generator::CodeGenerator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn unique_prefix() -> String {
    format!("t{}_", uuid::Uuid::new_v4().simple())
}

fn dialect(kind: StorageBackend) -> Option<SqlDialect> {
    match kind {
        StorageBackend::Postgres => Some(SqlDialect::Postgres),
        StorageBackend::MySql => Some(SqlDialect::MySql),
        StorageBackend::Sqlite => Some(SqlDialect::Sqlite),
        StorageBackend::MongoDb => None,
    }
}

/// Precondition that finds `target` when it exists.
fn exists_precondition(kind: StorageBackend, target: &str) -> String {
    match dialect(kind) {
        Some(dialect) => dialect.table_exists_query().to_string(),
        None => json!({ "name": target }).to_string(),
    }
}

/// Precondition that never finds the target, as seen by an instance that
/// lost a creation race.
fn stale_precondition(kind: StorageBackend) -> String {
    match kind {
        StorageBackend::Postgres => "SELECT 1 WHERE $1::text IS NULL".to_string(),
        StorageBackend::MySql => "SELECT 1 FROM DUAL WHERE ? IS NULL".to_string(),
        StorageBackend::Sqlite => "SELECT 1 WHERE ? IS NULL".to_string(),
        StorageBackend::MongoDb => json!({ "name": "" }).to_string(),
    }
}

/// Creates `target`, then fails.
fn failing_statements(kind: StorageBackend, target: &str) -> Vec<String> {
    match dialect(kind) {
        Some(dialect) => vec![
            format!("CREATE TABLE {} (id INT NOT NULL)", dialect.quote(target)),
            "INSERT INTO no_such_table_for_migration (id) VALUES (1)".to_string(),
        ],
        None => vec![
            json!({ "create": target }).to_string(),
            json!({ "noSuchCommand": 1 }).to_string(),
        ],
    }
}

fn create_shortened_statements(kind: StorageBackend, target: &str) -> Vec<String> {
    match dialect(kind) {
        Some(dialect) => dialect.shortened_table_ddl(target),
        None => vec![json!({ "create": target }).to_string()],
    }
}

async fn target_present(handles: &StorageHandles, target: &str) -> bool {
    let kind = handles.schema.kind();
    let mut registry = MigrationRegistry::new();
    registry.register(
        "Check",
        target,
        Some(exists_precondition(kind, target)),
        Vec::new(),
    );

    handles
        .schema
        .target_exists(&registry.migrations()[0])
        .await
        .unwrap()
}

async fn failed_apply_leaves_nothing(handles: &StorageHandles, prefix: &str) {
    let kind = handles.schema.kind();
    let target = format!("{prefix}broken");

    let mut registry = MigrationRegistry::new();
    handles.schema.register_migrations(&mut registry);
    registry.register(
        "Add Broken Table",
        target.as_str(),
        Some(exists_precondition(kind, &target)),
        failing_statements(kind, &target),
    );
    let broken_name = registry.migrations()[2].name.clone();

    let result = SchemaInitializer::new(handles.schema.clone(), Arc::new(registry))
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(StorageError::MigrationApply { ref migration, .. }) if *migration == broken_name
    ));
    assert!(!target_present(handles, &target).await);

    let applied = handles.schema.applied_migrations().await.unwrap();
    assert!(applied.iter().all(|m| m.migration_name != broken_name));
}

async fn lost_creation_race_keeps_data(handles: &StorageHandles, prefix: &str, code: &str) {
    let kind = handles.schema.kind();
    let shortened = shortened_table(prefix);

    let mut registry = MigrationRegistry::new();
    registry.register(
        "Add ShortenedUrl Table",
        shortened.as_str(),
        Some(stale_precondition(kind)),
        create_shortened_statements(kind, &shortened),
    );

    let result = SchemaInitializer::new(handles.schema.clone(), Arc::new(registry))
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(StorageError::MigrationApply { .. })));
    assert!(target_present(handles, &shortened).await);
    assert!(handles.repository.exists(code).await.unwrap());
}

async fn round_trip(handles: StorageHandles, prefix: &str) {
    let schema = handles.schema.clone();

    let first = SchemaInitializer::for_backend(schema.clone())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.applied.len(), 2);

    let second = SchemaInitializer::for_backend(schema.clone())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.skipped.len(), 2);

    assert_eq!(schema.applied_migrations().await.unwrap().len(), 2);

    let generator = Arc::new(CodeGenerator::new(DEFAULT_ALPHABET, 7).unwrap());
    let service = ShorteningService::new(handles.repository.clone(), generator);

    let record = service
        .create_short_url("https://example.com/external", "http", "localhost")
        .await
        .unwrap();

    let url = service.get_original_url(Some(&record.code)).await.unwrap();
    assert_eq!(url.as_deref(), Some("https://example.com/external"));

    let duplicate = handles.repository.add(&record).await;
    assert!(matches!(duplicate, Err(StorageError::DuplicateKey(_))));

    let upper = record.code.to_ascii_uppercase();
    if upper != record.code {
        assert!(!handles.repository.exists(&upper).await.unwrap());
    }

    failed_apply_leaves_nothing(&handles, prefix).await;
    lost_creation_race_keeps_data(&handles, prefix, &record.code).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_round_trip() {
    let url = std::env::var("TEST_POSTGRES_URL").expect("TEST_POSTGRES_URL not set");
    let prefix = unique_prefix();
    let options = StorageOptions::new(StorageBackend::Postgres, url).with_table_prefix(&prefix);

    round_trip(connect(&options).await.unwrap(), &prefix).await;
}

#[tokio::test]
#[ignore]
async fn test_mysql_round_trip() {
    let url = std::env::var("TEST_MYSQL_URL").expect("TEST_MYSQL_URL not set");
    let prefix = unique_prefix();
    let options = StorageOptions::new(StorageBackend::MySql, url).with_table_prefix(&prefix);

    round_trip(connect(&options).await.unwrap(), &prefix).await;
}

#[tokio::test]
#[ignore]
async fn test_mongodb_round_trip() {
    let url = std::env::var("TEST_MONGODB_URL").expect("TEST_MONGODB_URL not set");
    let database =
        std::env::var("TEST_MONGODB_DATABASE").unwrap_or_else(|_| "shortstore_test".to_string());
    let prefix = unique_prefix();
    let options = StorageOptions::new(StorageBackend::MongoDb, url)
        .with_database_name(database)
        .with_table_prefix(&prefix);

    round_trip(connect(&options).await.unwrap(), &prefix).await;
}
