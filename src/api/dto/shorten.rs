//! DTOs for the shortening endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::ShortenedUrl;

/// Longest URL accepted for shortening.
pub const MAX_URL_LENGTH: u64 = 8192;

/// Request to shorten one URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// Absolute HTTP/HTTPS URL. Format is checked by the shortening service.
    #[validate(length(min = 1, max = 8192, message = "URL must be 1 to 8192 characters"))]
    pub url: String,
}

/// A created short URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ShortenedUrl> for ShortenResponse {
    fn from(record: ShortenedUrl) -> Self {
        Self {
            code: record.code,
            short_url: record.short_url,
            original_url: record.original_url,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_fails_validation() {
        let request = ShortenRequest { url: String::new() };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_oversized_url_fails_validation() {
        let request = ShortenRequest {
            url: format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH as usize)),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_response_from_record() {
        let record = ShortenedUrl::new(
            "https://example.com".to_string(),
            "abc1234".to_string(),
            "http://localhost/abc1234".to_string(),
        );
        let created_at = record.created_at;

        let response = ShortenResponse::from(record);

        assert_eq!(response.code, "abc1234");
        assert_eq!(response.short_url, "http://localhost/abc1234");
        assert_eq!(response.created_at, created_at);
    }
}
