//! Core domain entities.
//!
//! - [`ShortenedUrl`] - A short code mapped to its original URL
//! - [`MigrationDescriptor`] - A registered schema change
//! - [`AppliedMigration`] - A bookkeeping record of an applied schema change

pub mod migration;
pub mod shortened_url;

pub use migration::{AppliedMigration, MigrationDescriptor};
pub use shortened_url::ShortenedUrl;
