//! Repository trait for shortened URL data access.

use crate::domain::entities::ShortenedUrl;
use crate::error::StorageResult;
use async_trait::async_trait;

/// Provider-agnostic access to the shortened URL store.
///
/// Exactly one implementation exists per backend kind, see
/// [`crate::infrastructure::persistence`]. Every call takes a connection from
/// the backend pool and returns it on all exit paths.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortenedUrlRepository: Send + Sync {
    /// Returns true if a record with this code is stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::Connectivity`] if the backend is
    /// unreachable and [`crate::error::StorageError::Query`] on other failures.
    async fn exists(&self, code: &str) -> StorageResult<bool>;

    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::DuplicateKey`] if the code is
    /// already taken. This is expected when two writers race on the same code.
    async fn add(&self, record: &ShortenedUrl) -> StorageResult<()>;

    /// Looks up the original URL for a code. Absence is `Ok(None)`.
    async fn get_original_url(&self, code: &str) -> StorageResult<Option<String>>;
}
