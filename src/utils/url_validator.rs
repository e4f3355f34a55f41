//! Validation of URLs submitted for shortening.
//!
//! Only absolute `http`/`https` URLs with a host are accepted. The stored form
//! is the serialized URL, which is always a valid `Location` header value.

use url::Url;

/// Errors that can occur during URL validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,
}

/// Parses `input` as an absolute URL and returns its serialized form.
///
/// # Rules
///
/// 1. Surrounding whitespace is ignored
/// 2. The URL must be absolute (`example.com/path` is rejected)
/// 3. The scheme must be `http` or `https`
/// 4. A host is required
///
/// # Errors
///
/// Returns [`UrlValidationError`] describing the first rule that failed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(validate_absolute_url("https://example.com/a").unwrap(), "https://example.com/a");
/// assert!(validate_absolute_url("/relative/path").is_err());
/// ```
pub fn validate_absolute_url(input: &str) -> Result<String, UrlValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url = Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_https_url_is_preserved() {
        assert_eq!(
            validate_absolute_url("https://example.com/a").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_query_and_fragment_are_preserved() {
        assert_eq!(
            validate_absolute_url("https://example.com/search?q=rust&lang=en#top").unwrap(),
            "https://example.com/search?q=rust&lang=en#top"
        );
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert_eq!(
            validate_absolute_url("  http://example.com/x  ").unwrap(),
            "http://example.com/x"
        );
    }

    #[test]
    fn test_spaces_are_percent_encoded() {
        let url = validate_absolute_url("https://example.com/a b").unwrap();
        assert_eq!(url, "https://example.com/a%20b");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(validate_absolute_url(""), Err(UrlValidationError::Empty));
        assert_eq!(validate_absolute_url("   "), Err(UrlValidationError::Empty));
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(matches!(
            validate_absolute_url("/path/only"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_absolute_url("example.com"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unsupported_protocols_rejected() {
        for input in [
            "ftp://example.com/file.txt",
            "javascript:alert('xss')",
            "mailto:test@example.com",
            "file:///etc/passwd",
        ] {
            assert_eq!(
                validate_absolute_url(input),
                Err(UrlValidationError::UnsupportedProtocol),
                "{input}"
            );
        }
    }

    #[test]
    fn test_ip_and_port_accepted() {
        assert_eq!(
            validate_absolute_url("http://192.168.1.1:8080/api").unwrap(),
            "http://192.168.1.1:8080/api"
        );
    }

    #[test]
    fn test_very_long_url() {
        let url = format!("https://example.com/{}", "a".repeat(4000));
        assert!(validate_absolute_url(&url).unwrap().len() > 4000);
    }
}
