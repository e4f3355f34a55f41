//! Shared state injected into every HTTP handler.

use std::sync::Arc;
use tokio::sync::watch;

use crate::application::services::{SchemaStatus, ShorteningService};
use crate::domain::repositories::{SchemaBackend, ShortenedUrlRepository};

#[derive(Clone)]
pub struct AppState {
    pub shortening_service: Arc<ShorteningService<dyn ShortenedUrlRepository>>,
    pub schema: Arc<dyn SchemaBackend>,
    pub schema_status: watch::Receiver<SchemaStatus>,
    /// Scheme used in short URLs when no `X-Forwarded-Proto` header is present.
    pub public_scheme: String,
}

impl AppState {
    pub fn new(
        shortening_service: Arc<ShorteningService<dyn ShortenedUrlRepository>>,
        schema: Arc<dyn SchemaBackend>,
        schema_status: watch::Receiver<SchemaStatus>,
        public_scheme: impl Into<String>,
    ) -> Self {
        Self {
            shortening_service,
            schema,
            schema_status,
            public_scheme: public_scheme.into(),
        }
    }
}
