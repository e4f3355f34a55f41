//! Shortened URL entity representing one code → URL mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored mapping between a short code and the original URL.
///
/// Records are created once by the shortening service and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenedUrl {
    pub id: Uuid,
    pub original_url: String,
    pub code: String,
    /// `{scheme}://{host}/{code}` as seen by the client that created it.
    pub short_url: String,
    pub created_at: DateTime<Utc>,
}

impl ShortenedUrl {
    /// Creates a new record with a fresh id and the current UTC time.
    pub fn new(original_url: String, code: String, short_url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_url,
            code,
            short_url,
            created_at: Utc::now(),
        }
    }

    /// Builds the public short URL for a code.
    pub fn build_short_url(scheme: &str, host: &str, code: &str) -> String {
        format!("{}://{}/{}", scheme, host.trim_end_matches('/'), code)
    }

    /// Extracts the code from a short URL built by [`Self::build_short_url`].
    pub fn code_from_short_url(short_url: &str) -> Option<&str> {
        short_url
            .rsplit_once('/')
            .map(|(_, code)| code)
            .filter(|code| !code.is_empty())
    }
}
