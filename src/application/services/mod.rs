//! Services for the application layer.

pub mod schema_initializer;
pub mod shortening_service;

pub use schema_initializer::{
    MigrationReport, SchemaInitializer, SchemaStatus, spawn_schema_task,
};
pub use shortening_service::{MAX_CODE_RETRIES, ShorteningService};
