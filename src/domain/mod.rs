//! Domain layer: entities, the migration registry and data access traits.
//!
//! - [`entities`] - Core data structures
//! - [`migration_registry`] - Ordered, uniquely named migrations
//! - [`repositories`] - Traits implemented by the infrastructure layer
//!
//! The domain layer has no dependency on concrete drivers.

pub mod entities;
pub mod migration_registry;
pub mod repositories;

pub use migration_registry::MigrationRegistry;
