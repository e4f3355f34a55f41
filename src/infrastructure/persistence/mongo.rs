//! MongoDB backend.
//!
//! A standalone server offers no multi-statement transactions, so migrations
//! run their commands and bookkeeping upsert in sequence and compensate a
//! failure by dropping the target collection, if this apply created it.
//!
//! Migration statements are JSON command documents (`{"create": ...}`,
//! `{"createIndexes": ...}`) and preconditions are `listCollections` filters.
//! Both are parsed into BSON in document order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Collection, Database};
use serde_json::json;

use super::table_names::{migrations_table, shortened_table};
use crate::config::StorageBackend;
use crate::domain::MigrationRegistry;
use crate::domain::entities::{AppliedMigration, MigrationDescriptor, ShortenedUrl};
use crate::domain::repositories::{SchemaBackend, ShortenedUrlRepository};
use crate::error::{StorageError, StorageResult};

const DUPLICATE_KEY: i32 = 11000;
const MAX_DATABASE_NAME_BYTES: usize = 64;
const FORBIDDEN_NAME_CHARS: &[char] = &[
    '/', '\\', '.', '"', '$', '*', '<', '>', ':', '|', '?', ' ', '\0',
];

/// MongoDB repository for shortened URLs.
///
/// Documents use the record id as `_id` and the relational column names for
/// every other field.
#[derive(Debug, Clone)]
pub struct MongoShortenedUrlRepository {
    collection: Collection<Document>,
}

impl MongoShortenedUrlRepository {
    pub fn new(database: &Database, table_prefix: &str) -> Self {
        Self {
            collection: database.collection(&shortened_table(table_prefix)),
        }
    }
}

#[async_trait]
impl ShortenedUrlRepository for MongoShortenedUrlRepository {
    async fn exists(&self, code: &str) -> StorageResult<bool> {
        let found = self
            .collection
            .find_one(doc! { "code": code })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(map_mongo_error)?
            .is_some();

        Ok(found)
    }

    async fn add(&self, record: &ShortenedUrl) -> StorageResult<()> {
        let document = doc! {
            "_id": record.id.to_string(),
            "original_url": record.original_url.as_str(),
            "short_url": record.short_url.as_str(),
            "code": record.code.as_str(),
            "created_on_utc": bson::DateTime::from_millis(record.created_at.timestamp_millis()),
        };

        match self.collection.insert_one(document).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                Err(StorageError::DuplicateKey(record.code.clone()))
            }
            Err(err) => Err(map_mongo_error(err)),
        }
    }

    async fn get_original_url(&self, code: &str) -> StorageResult<Option<String>> {
        let Some(document) = self
            .collection
            .find_one(doc! { "code": code })
            .projection(doc! { "original_url": 1, "_id": 0 })
            .await
            .map_err(map_mongo_error)?
        else {
            return Ok(None);
        };

        document
            .get_str("original_url")
            .map(|url| Some(url.to_string()))
            .map_err(|e| StorageError::InvalidData(e.to_string()))
    }
}

/// MongoDB schema backend.
#[derive(Debug, Clone)]
pub struct MongoSchema {
    database: Database,
    table_prefix: String,
}

impl MongoSchema {
    pub fn new(database: Database, table_prefix: &str) -> Self {
        Self {
            database,
            table_prefix: table_prefix.to_string(),
        }
    }

    fn migrations(&self) -> Collection<Document> {
        self.database.collection(&migrations_table(&self.table_prefix))
    }

    /// Runs the commands, then upserts the bookkeeping document.
    ///
    /// `target_created` is set once a command of a guarded migration has
    /// succeeded; the precondition saw the collection absent, so it is ours.
    async fn run_statements(
        &self,
        migration: &MigrationDescriptor,
        target_created: &mut bool,
    ) -> StorageResult<()> {
        for statement in &migration.statements {
            let command = parse_document(statement)?;
            self.database
                .run_command(command)
                .await
                .map_err(map_mongo_error)?;
            *target_created = !migration.is_unconditional();
        }

        self.migrations()
            .update_one(
                doc! { "_id": migration.name.as_str() },
                doc! {
                    "$setOnInsert": {
                        "applied_at": bson::DateTime::from_millis(Utc::now().timestamp_millis()),
                    }
                },
            )
            .upsert(true)
            .await
            .map_err(map_mongo_error)?;

        Ok(())
    }
}

#[async_trait]
impl SchemaBackend for MongoSchema {
    fn kind(&self) -> StorageBackend {
        StorageBackend::MongoDb
    }

    fn transactional_ddl(&self) -> bool {
        false
    }

    fn check_database_name(&self) -> StorageResult<()> {
        check_database_name(self.database.name())
    }

    async fn check_connection(&self) -> StorageResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_mongo_error)?;
        Ok(())
    }

    fn register_migrations(&self, registry: &mut MigrationRegistry) {
        let migrations = migrations_table(&self.table_prefix);
        registry.register(
            "Add Migration Table",
            migrations.as_str(),
            Some(collection_filter(&migrations)),
            vec![json!({ "create": &migrations }).to_string()],
        );

        let shortened = shortened_table(&self.table_prefix);
        registry.register(
            "Add ShortenedUrl Table",
            shortened.as_str(),
            Some(collection_filter(&shortened)),
            vec![
                json!({ "create": &shortened }).to_string(),
                json!({
                    "createIndexes": &shortened,
                    "indexes": [{ "key": { "code": 1 }, "name": "ux_code", "unique": true }],
                })
                .to_string(),
            ],
        );
    }

    async fn target_exists(&self, migration: &MigrationDescriptor) -> StorageResult<bool> {
        let Some(precondition) = migration.precondition.as_deref() else {
            return Ok(false);
        };

        let names = self
            .database
            .list_collection_names()
            .filter(parse_document(precondition)?)
            .await
            .map_err(map_mongo_error)?;

        Ok(names.iter().any(|name| name == &migration.target))
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

        if let Err(drop_err) = self
            .database
            .collection::<Document>(&migration.target)
            .drop()
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
        let mut cursor = self
            .migrations()
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(map_mongo_error)?;

        let mut applied = Vec::new();
        while cursor.advance().await.map_err(map_mongo_error)? {
            let document = cursor.deserialize_current().map_err(map_mongo_error)?;
            applied.push(applied_from_document(&document)?);
        }

        Ok(applied)
    }
}

fn collection_filter(target: &str) -> String {
    json!({ "name": target }).to_string()
}

fn parse_document(json: &str) -> StorageResult<Document> {
    serde_json::from_str::<Document>(json)
        .map_err(|e| StorageError::InvalidData(format!("invalid command document: {e}")))
}

fn applied_from_document(document: &Document) -> StorageResult<AppliedMigration> {
    let invalid = |e: bson::document::ValueAccessError| StorageError::InvalidData(e.to_string());

    let migration_name = document.get_str("_id").map_err(invalid)?.to_string();
    let millis = document
        .get_datetime("applied_at")
        .map_err(invalid)?
        .timestamp_millis();
    let applied_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        StorageError::InvalidData(format!("applied_at out of range for {migration_name}"))
    })?;

    Ok(AppliedMigration {
        migration_name,
        applied_at,
    })
}

/// Validates a MongoDB database name.
///
/// # Errors
///
/// Returns [`StorageError::Configuration`] if the name is empty, 64 bytes or
/// longer, or contains a character MongoDB forbids.
pub fn check_database_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::configuration("database name must not be empty"));
    }

    if name.len() >= MAX_DATABASE_NAME_BYTES {
        return Err(StorageError::configuration(format!(
            "database name must be shorter than {MAX_DATABASE_NAME_BYTES} bytes"
        )));
    }

    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(StorageError::configuration(format!(
            "database name contains forbidden character {c:?}"
        )));
    }

    Ok(())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

pub(crate) fn map_mongo_error(err: mongodb::error::Error) -> StorageError {
    let message = err.to_string();

    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StorageError::Connectivity(message),
        ErrorKind::InvalidArgument { .. } => StorageError::Configuration(message),
        ErrorKind::BsonDeserialization(_) => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}
