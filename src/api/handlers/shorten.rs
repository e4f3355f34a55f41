//! Handler for the shortening endpoint.

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::extract_host::{extract_host_from_headers, extract_scheme_from_headers};

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/some/long/path" }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "code": "Xy12abC",
///   "short_url": "https://s.example.com/Xy12abC",
///   "original_url": "https://example.com/some/long/path",
///   "created_at": "2024-01-01T00:00:00Z"
/// }
/// ```
///
/// The short URL uses the request `Host` header and the scheme from
/// `X-Forwarded-Proto`, falling back to the configured public scheme.
///
/// # Errors
///
/// - 400 if the body fails validation, the URL is not absolute HTTP/HTTPS or
///   the `Host` header is missing
/// - 500 if no free code was found
/// - 503 if the store is unreachable
pub async fn shorten_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let host = extract_host_from_headers(&headers)?;
    let scheme = extract_scheme_from_headers(&headers, &state.public_scheme);

    let record = state
        .shortening_service
        .create_short_url(&payload.url, scheme, &host)
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}
