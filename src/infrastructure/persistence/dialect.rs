//! SQL text shared by the relational backends.
//!
//! Table names come from [`super::table_names`] and are quoted; user values
//! are always bound parameters.

use regex::Regex;
use std::sync::LazyLock;

use super::table_names::{migrations_table, shortened_table};
use crate::domain::MigrationRegistry;
use crate::error::{StorageError, StorageResult};
use crate::utils::code_generator::MAX_CODE_LENGTH;

static PG_DATABASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{0,127}$").expect("valid postgres name regex")
});

static MYSQL_DATABASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").expect("valid mysql name regex"));

/// The relational dialects with a sqlx driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    pub fn quote(&self, ident: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{ident}`"),
            SqlDialect::Postgres | SqlDialect::Sqlite => format!("\"{ident}\""),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${index}"),
            SqlDialect::MySql | SqlDialect::Sqlite => "?".to_string(),
        }
    }

    /// Precondition query; binds the table name as its single parameter.
    pub fn table_exists_query(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => {
                "SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1 LIMIT 1"
            }
            SqlDialect::MySql => {
                "SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ? LIMIT 1"
            }
            SqlDialect::Sqlite => {
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ? LIMIT 1"
            }
        }
    }

    pub fn migrations_table_ddl(&self, table: &str) -> Vec<String> {
        let (name_type, time_type) = match self {
            SqlDialect::Postgres => ("VARCHAR(255)", "TIMESTAMPTZ"),
            SqlDialect::MySql => ("VARCHAR(255)", "DATETIME(6)"),
            SqlDialect::Sqlite => ("TEXT", "TEXT"),
        };

        vec![format!(
            "CREATE TABLE {} (\
             migration_name {name_type} NOT NULL PRIMARY KEY, \
             applied_at {time_type} NOT NULL)",
            self.quote(table)
        )]
    }

    pub fn shortened_table_ddl(&self, table: &str) -> Vec<String> {
        let quoted = self.quote(table);

        match self {
            SqlDialect::Postgres => vec![
                format!(
                    "CREATE TABLE {quoted} (\
                     id UUID NOT NULL PRIMARY KEY, \
                     original_url TEXT NOT NULL, \
                     short_url TEXT NOT NULL, \
                     code VARCHAR({MAX_CODE_LENGTH}) NOT NULL, \
                     created_on_utc TIMESTAMPTZ NOT NULL)"
                ),
                format!(
                    "CREATE UNIQUE INDEX {} ON {quoted} (code)",
                    self.quote(&format!("ux_{table}_code"))
                ),
            ],
            // Codes are case-sensitive, so the column gets a binary collation.
            SqlDialect::MySql => vec![format!(
                "CREATE TABLE {quoted} (\
                 id CHAR(36) NOT NULL PRIMARY KEY, \
                 original_url TEXT NOT NULL, \
                 short_url TEXT NOT NULL, \
                 code VARCHAR({MAX_CODE_LENGTH}) CHARACTER SET ascii COLLATE ascii_bin NOT NULL, \
                 created_on_utc DATETIME(6) NOT NULL, \
                 UNIQUE KEY ux_code (code))"
            )],
            SqlDialect::Sqlite => vec![
                format!(
                    "CREATE TABLE {quoted} (\
                     id TEXT NOT NULL PRIMARY KEY, \
                     original_url TEXT NOT NULL, \
                     short_url TEXT NOT NULL, \
                     code TEXT NOT NULL, \
                     created_on_utc TEXT NOT NULL)"
                ),
                format!(
                    "CREATE UNIQUE INDEX {} ON {quoted} (code)",
                    self.quote(&format!("ux_{table}_code"))
                ),
            ],
        }
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote(table))
    }

    /// Bookkeeping insert. A row that is already present is kept as is, so
    /// re-running an unconditional migration succeeds.
    pub fn insert_applied_migration(&self, table: &str) -> String {
        let quoted = self.quote(table);
        let (name, applied_at) = (self.placeholder(1), self.placeholder(2));

        match self {
            SqlDialect::Postgres | SqlDialect::Sqlite => format!(
                "INSERT INTO {quoted} (migration_name, applied_at) VALUES ({name}, {applied_at}) \
                 ON CONFLICT (migration_name) DO NOTHING"
            ),
            SqlDialect::MySql => format!(
                "INSERT IGNORE INTO {quoted} (migration_name, applied_at) VALUES ({name}, {applied_at})"
            ),
        }
    }

    pub fn select_applied_migrations(&self, table: &str) -> String {
        format!(
            "SELECT migration_name, applied_at FROM {} ORDER BY migration_name",
            self.quote(table)
        )
    }

    /// Validates a logical database name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if the name is empty or does
    /// not match the dialect's identifier rules.
    pub fn check_database_name(&self, name: &str) -> StorageResult<()> {
        if name.is_empty() {
            return Err(StorageError::configuration("database name must not be empty"));
        }

        let valid = match self {
            SqlDialect::Postgres | SqlDialect::Sqlite => PG_DATABASE_NAME.is_match(name),
            SqlDialect::MySql => MYSQL_DATABASE_NAME.is_match(name),
        };

        if valid {
            Ok(())
        } else {
            Err(StorageError::configuration(format!(
                "invalid database name '{name}'"
            )))
        }
    }
}

/// DML for the shortened URL table, built once per repository.
#[derive(Debug, Clone)]
pub struct ShortenedUrlStatements {
    pub exists: String,
    pub insert: String,
    pub original_url: String,
}

impl ShortenedUrlStatements {
    pub fn new(dialect: SqlDialect, table: &str) -> Self {
        let quoted = dialect.quote(table);
        let p = |i| dialect.placeholder(i);

        Self {
            exists: format!("SELECT 1 FROM {quoted} WHERE code = {} LIMIT 1", p(1)),
            insert: format!(
                "INSERT INTO {quoted} (id, original_url, short_url, code, created_on_utc) \
                 VALUES ({}, {}, {}, {}, {})",
                p(1),
                p(2),
                p(3),
                p(4),
                p(5)
            ),
            original_url: format!(
                "SELECT original_url FROM {quoted} WHERE code = {} LIMIT 1",
                p(1)
            ),
        }
    }
}

/// Registers the two relational migrations in order.
pub fn register_relational_migrations(
    dialect: SqlDialect,
    prefix: &str,
    registry: &mut MigrationRegistry,
) {
    let precondition = Some(dialect.table_exists_query().to_string());

    let migrations = migrations_table(prefix);
    registry.register(
        "Add Migration Table",
        migrations.as_str(),
        precondition.clone(),
        dialect.migrations_table_ddl(&migrations),
    );

    let shortened = shortened_table(prefix);
    registry.register(
        "Add ShortenedUrl Table",
        shortened.as_str(),
        precondition,
        dialect.shortened_table_ddl(&shortened),
    );
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Connectivity(message),
        sqlx::Error::Configuration(_) => StorageError::Configuration(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

/// Maps an insert failure, treating unique violations as duplicates.
pub(crate) fn map_insert_error(err: sqlx::Error, code: &str) -> StorageError {
    if is_unique_violation(&err) {
        StorageError::DuplicateKey(code.to_string())
    } else {
        map_sqlx_error(err)
    }
}
