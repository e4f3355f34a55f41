//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown and 503 if the store is
/// unreachable.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    match state
        .shortening_service
        .get_original_url(Some(&code))
        .await?
    {
        Some(url) => Ok(Redirect::temporary(&url)),
        None => {
            tracing::debug!(code = %code, "Short code not found");
            Err(AppError::not_found(
                "Short link not found",
                json!({ "code": code }),
            ))
        }
    }
}
