//! Data access trait definitions for the domain layer.
//!
//! Implementations live in `crate::infrastructure::persistence`; mocks are
//! generated via `mockall` for unit tests.
//!
//! - [`ShortenedUrlRepository`] - Short code lookups and inserts
//! - [`SchemaBackend`] - Migration protocol primitives

pub mod schema_backend;
pub mod shortened_url_repository;

pub use schema_backend::SchemaBackend;
pub use shortened_url_repository::ShortenedUrlRepository;

#[cfg(test)]
pub use schema_backend::MockSchemaBackend;
#[cfg(test)]
pub use shortened_url_repository::MockShortenedUrlRepository;
