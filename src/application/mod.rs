//! Application layer services.
//!
//! Services consume the domain traits and are used by the HTTP handlers, the
//! admin CLI and the startup sequence.
//!
//! - [`services::ShorteningService`] - Short URL creation and lookup
//! - [`services::SchemaInitializer`] - Validation and migration of the store

pub mod services;
