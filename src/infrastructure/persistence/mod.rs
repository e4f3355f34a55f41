//! Storage backends.
//!
//! One repository and one schema backend per supported store:
//!
//! - [`postgres`] - [`PgShortenedUrlRepository`], [`PgSchema`]
//! - [`mysql`] - [`MySqlShortenedUrlRepository`], [`MySqlSchema`]
//! - [`sqlite`] - [`SqliteShortenedUrlRepository`], [`SqliteSchema`]
//! - [`mongo`] - [`MongoShortenedUrlRepository`], [`MongoSchema`]
//!
//! [`connect`] builds the pair for the configured backend. Pools are created
//! lazily, so no connection is opened until the first query; connectivity is
//! checked by the schema task.

pub mod dialect;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod table_names;

use mongodb::Client;
use mongodb::options::ClientOptions;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageOptions};
use crate::domain::repositories::{SchemaBackend, ShortenedUrlRepository};
use crate::error::StorageResult;

pub use mongo::{MongoSchema, MongoShortenedUrlRepository};
pub use mysql::{MySqlSchema, MySqlShortenedUrlRepository};
pub use postgres::{PgSchema, PgShortenedUrlRepository};
pub use sqlite::{SqliteSchema, SqliteShortenedUrlRepository};

/// Repository and schema backend sharing one pool.
#[derive(Clone)]
pub struct StorageHandles {
    pub repository: Arc<dyn ShortenedUrlRepository>,
    pub schema: Arc<dyn SchemaBackend>,
}

/// Builds the storage handles for the configured backend.
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Configuration`] if the options are
/// invalid or the connection string cannot be parsed.
pub async fn connect(options: &StorageOptions) -> StorageResult<StorageHandles> {
    options.validate()?;

    let prefix = options.table_prefix.as_str();
    let database_name = options.database_name.as_str();
    let settings = &options.pool;

    tracing::info!(backend = %options.backend, "Creating storage pool");

    let handles = match options.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .acquire_timeout(settings.connect_timeout())
                .idle_timeout(settings.idle_timeout())
                .max_lifetime(settings.max_lifetime())
                .connect_lazy(&options.connection_string)
                .map_err(dialect::map_sqlx_error)?;

            StorageHandles {
                repository: Arc::new(PgShortenedUrlRepository::new(pool.clone(), prefix)),
                schema: Arc::new(PgSchema::new(pool, database_name, prefix)),
            }
        }
        StorageBackend::MySql => {
            let pool = MySqlPoolOptions::new()
                .max_connections(settings.max_connections)
                .acquire_timeout(settings.connect_timeout())
                .idle_timeout(settings.idle_timeout())
                .max_lifetime(settings.max_lifetime())
                .connect_lazy(&options.connection_string)
                .map_err(dialect::map_sqlx_error)?;

            StorageHandles {
                repository: Arc::new(MySqlShortenedUrlRepository::new(pool.clone(), prefix)),
                schema: Arc::new(MySqlSchema::new(pool, database_name, prefix)),
            }
        }
        StorageBackend::Sqlite => {
            let connect_options = SqliteConnectOptions::from_str(&options.connection_string)
                .map_err(dialect::map_sqlx_error)?
                .create_if_missing(true)
                .busy_timeout(settings.connect_timeout());

            let pool_options = SqlitePoolOptions::new().acquire_timeout(settings.connect_timeout());

            // Every connection to an in-memory database is a separate database.
            let pool_options = if is_sqlite_memory(&options.connection_string) {
                pool_options
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
            } else {
                pool_options
                    .max_connections(settings.max_connections)
                    .idle_timeout(settings.idle_timeout())
                    .max_lifetime(settings.max_lifetime())
            };

            let pool = pool_options.connect_lazy_with(connect_options);

            StorageHandles {
                repository: Arc::new(SqliteShortenedUrlRepository::new(pool.clone(), prefix)),
                schema: Arc::new(SqliteSchema::new(pool, database_name, prefix)),
            }
        }
        StorageBackend::MongoDb => {
            let mut client_options = ClientOptions::parse(&options.connection_string)
                .await
                .map_err(mongo::map_mongo_error)?;
            client_options.max_pool_size = Some(settings.max_connections);
            client_options.connect_timeout = Some(settings.connect_timeout());
            client_options.server_selection_timeout = Some(settings.connect_timeout());
            client_options.max_idle_time = Some(settings.idle_timeout());

            let client = Client::with_options(client_options).map_err(mongo::map_mongo_error)?;
            let database = client.database(database_name);

            StorageHandles {
                repository: Arc::new(MongoShortenedUrlRepository::new(&database, prefix)),
                schema: Arc::new(MongoSchema::new(database, prefix)),
            }
        }
    };

    Ok(handles)
}

fn is_sqlite_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_is_sqlite_memory() {
        assert!(is_sqlite_memory("sqlite::memory:"));
        assert!(is_sqlite_memory("sqlite://file:shared?mode=memory&cache=shared"));
        assert!(!is_sqlite_memory("sqlite://data/links.db"));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_options() {
        let options = StorageOptions::new(StorageBackend::Sqlite, "sqlite::memory:").with_code("", 7);

        let result = connect(&options).await;

        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_sqlite_memory_is_usable() {
        let options = StorageOptions::new(StorageBackend::Sqlite, "sqlite::memory:");

        let handles = connect(&options).await.unwrap();

        assert_eq!(handles.schema.kind(), StorageBackend::Sqlite);
        assert!(handles.schema.check_connection().await.is_ok());
    }
}
