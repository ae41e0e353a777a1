//! Caller-visible failure taxonomy for page retrieval.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::browser::BrowserError;
use crate::http_client::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The requested index does not exist for this chapter
    #[error("Invalid page number {index} (chapter has {available} pages)")]
    InvalidPage { index: usize, available: usize },

    #[error("Chapter {0} not found")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Failed to download page: {0}")]
    Render(#[from] BrowserError),
}

impl RetrievalError {
    /// Short machine-readable kind, used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalError::InvalidPage { .. } => "invalid_page",
            RetrievalError::NotFound(_) => "not_found",
            RetrievalError::UpstreamUnavailable(_) => "upstream_unavailable",
            RetrievalError::Render(_) => "render_error",
        }
    }
}

impl From<FetchError> for RetrievalError {
    fn from(e: FetchError) -> Self {
        RetrievalError::UpstreamUnavailable(e.to_string())
    }
}

impl ResponseError for RetrievalError {
    fn status_code(&self) -> StatusCode {
        match self {
            RetrievalError::InvalidPage { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": self.to_string(), "kind": self.kind()}))
    }
}
