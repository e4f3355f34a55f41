//! Short URL creation and lookup.

use std::sync::Arc;

use crate::domain::entities::ShortenedUrl;
use crate::domain::repositories::ShortenedUrlRepository;
use crate::error::ShortenError;
use crate::utils::code_generator::CodeGenerator;
use crate::utils::url_validator::validate_absolute_url;

/// Retries after the first candidate code collides.
pub const MAX_CODE_RETRIES: usize = 3;

/// Composes the code generator with a repository.
///
/// The repository's unique index is the source of truth for uniqueness; the
/// `exists` probe only saves a failed insert in the common case.
pub struct ShorteningService<R: ShortenedUrlRepository + ?Sized> {
    repository: Arc<R>,
    generator: Arc<CodeGenerator>,
}

impl<R: ShortenedUrlRepository + ?Sized> ShorteningService<R> {
    pub fn new(repository: Arc<R>, generator: Arc<CodeGenerator>) -> Self {
        Self {
            repository,
            generator,
        }
    }

    /// Creates and stores a short URL for `url`.
    ///
    /// # Code Generation
    ///
    /// Up to `1 + MAX_CODE_RETRIES` candidates are tried. A candidate is
    /// rejected when `exists` reports it taken or when `add` fails with a
    /// duplicate key because another writer stored it first.
    ///
    /// # Errors
    ///
    /// - [`ShortenError::InvalidUrl`] if `url` is not an absolute http/https
    ///   URL. No repository call is made.
    /// - [`ShortenError::CodeSpaceExhausted`] if every candidate collided.
    /// - [`ShortenError::Storage`] on any other repository failure.
    pub async fn create_short_url(
        &self,
        url: &str,
        scheme: &str,
        host: &str,
    ) -> Result<ShortenedUrl, ShortenError> {
        let original_url =
            validate_absolute_url(url).map_err(|e| ShortenError::InvalidUrl(e.to_string()))?;

        let attempts = MAX_CODE_RETRIES + 1;

        for attempt in 1..=attempts {
            let code = self.generator.generate();

            let taken = self.repository.exists(&code).await.inspect_err(|e| {
                tracing::error!(code = %code, attempt, error = %e, "Code lookup failed");
            })?;

            if taken {
                tracing::debug!(code = %code, attempt, "Code collision");
                continue;
            }

            let record = ShortenedUrl::new(
                original_url.clone(),
                code.clone(),
                self.short_url(scheme, host, &code),
            );

            match self.repository.add(&record).await {
                Ok(()) => {
                    tracing::info!(code = %record.code, attempt, "Short URL created");
                    return Ok(record);
                }
                Err(e) if e.is_duplicate_key() => {
                    tracing::debug!(code = %code, attempt, "Code taken by concurrent insert");
                }
                Err(e) => {
                    tracing::error!(code = %code, attempt, error = %e, "Failed to store short URL");
                    return Err(e.into());
                }
            }
        }

        tracing::warn!(attempts, "No free short code found");
        Err(ShortenError::CodeSpaceExhausted { attempts })
    }

    /// Resolves a code to its original URL.
    ///
    /// A missing or blank code resolves to `Ok(None)` without touching the
    /// repository. Any other code is looked up exactly as given.
    pub async fn get_original_url(
        &self,
        code: Option<&str>,
    ) -> Result<Option<String>, ShortenError> {
        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            return Ok(None);
        };

        let url = self
            .repository
            .get_original_url(code)
            .await
            .inspect_err(|e| {
                tracing::error!(code = %code, error = %e, "Failed to resolve short code");
            })?;

        Ok(url)
    }

    /// Builds the public short URL for a code.
    pub fn short_url(&self, scheme: &str, host: &str, code: &str) -> String {
        ShortenedUrl::build_short_url(scheme, host, code)
    }

    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }
}
