//! Request origin extraction for building short URLs.

use crate::AppError;
use axum::http::{HeaderMap, header};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Extracts the authority (host and optional port) from the `Host` header.
///
/// The port is kept because it is part of the public short URL.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if:
/// - The `Host` header is missing or empty
/// - The header value contains invalid UTF-8 or whitespace
pub fn extract_host_from_headers(headers: &HeaderMap) -> Result<String, AppError> {
    let host = headers
        .get(header::HOST)
        .ok_or_else(|| AppError::bad_request("Missing Host header", serde_json::json!({})))?
        .to_str()
        .map_err(|_| AppError::bad_request("Invalid Host header", serde_json::json!({})))?
        .trim();

    if host.is_empty() || host.contains(char::is_whitespace) || host.contains('/') {
        return Err(AppError::bad_request(
            "Invalid Host header",
            serde_json::json!({ "host": host }),
        ));
    }

    Ok(host.to_ascii_lowercase())
}

/// Returns the scheme announced by a reverse proxy, or `default`.
///
/// Only `http` and `https` are honoured; anything else falls back to `default`.
pub fn extract_scheme_from_headers<'a>(headers: &'a HeaderMap, default: &'a str) -> &'a str {
    headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| v.eq_ignore_ascii_case("http") || v.eq_ignore_ascii_case("https"))
        .map(|v| if v.eq_ignore_ascii_case("https") { "https" } else { "http" })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};

    #[test]
    fn test_extract_host_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("example.com"));

        assert_eq!(extract_host_from_headers(&headers).unwrap(), "example.com");
    }

    #[test]
    fn test_extract_host_keeps_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:3000"));

        assert_eq!(
            extract_host_from_headers(&headers).unwrap(),
            "localhost:3000"
        );
    }

    #[test]
    fn test_extract_host_lowercases() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("S.Example.COM"));

        assert_eq!(extract_host_from_headers(&headers).unwrap(), "s.example.com");
    }

    #[test]
    fn test_extract_host_ipv6_with_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("[::1]:8080"));

        assert_eq!(extract_host_from_headers(&headers).unwrap(), "[::1]:8080");
    }

    #[test]
    fn test_extract_host_missing_header() {
        let headers = HeaderMap::new();
        assert!(extract_host_from_headers(&headers).is_err());
    }

    #[test]
    fn test_extract_host_rejects_path_characters() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("evil.com/x"));

        assert!(extract_host_from_headers(&headers).is_err());
    }

    #[test]
    fn test_extract_host_invalid_utf8() {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_bytes(&[0xFF, 0xFE, 0xFD]) {
            headers.insert(header::HOST, value);
            assert!(extract_host_from_headers(&headers).is_err());
        }
    }

    #[test]
    fn test_scheme_defaults_without_proxy_header() {
        let headers = HeaderMap::new();
        assert_eq!(extract_scheme_from_headers(&headers, "http"), "http");
    }

    #[test]
    fn test_scheme_from_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS, http"));

        assert_eq!(extract_scheme_from_headers(&headers, "http"), "https");
    }

    #[test]
    fn test_scheme_ignores_unknown_proto() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("gopher"));

        assert_eq!(extract_scheme_from_headers(&headers, "https"), "https");
    }
}
