//! Page retrieval: locate the chapter, pick the page URL, download it directly
//! and fall back to a browser capture when the direct download fails.
//!
//! Each collaborator sits behind a trait so the fallback decision can be
//! exercised without network or browser.

use async_trait::async_trait;
use std::sync::Arc;

use crate::artifact::{ArtifactKey, TransientArtifact};
use crate::browser::BrowserError;
use crate::error::RetrievalError;
use crate::http_client::{EnhancedHttpClient, FetchError, FetchedPage, PageBody};
use crate::metrics::{track_request, MetricsTracker, RetrievalPath};
use crate::models::{ChapterPageManifest, PageRequest, ResolvedPageUrl};
use crate::selector;

/// Content type of render captures
pub const CAPTURE_CONTENT_TYPE: &str = "image/png";

/// Resolves a chapter id to its delivery manifest
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn locate(&self, chapter_id: &str) -> Result<ChapterPageManifest, RetrievalError>;
}

/// Primary transport for page images
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Secondary path: render the page and capture the image
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn capture(&self, url: &str, key: &ArtifactKey) -> Result<TransientArtifact, BrowserError>;
}

#[async_trait]
impl PageFetcher for EnhancedHttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_page(url).await
    }
}

/// Terminal state of one retrieval
#[derive(Debug)]
pub enum RetrievalOutcome {
    Served {
        content_type: String,
        body: PageBody,
        path: RetrievalPath,
    },
    Failed(RetrievalError),
}

impl RetrievalOutcome {
    pub fn into_result(self) -> Result<(String, PageBody, RetrievalPath), RetrievalError> {
        match self {
            RetrievalOutcome::Served { content_type, body, path } => Ok((content_type, body, path)),
            RetrievalOutcome::Failed(e) => Err(e),
        }
    }
}

/// Composes the locator, the direct fetcher and the optional render fallback
pub struct RetrievalOrchestrator {
    locator: Arc<dyn ManifestSource>,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    metrics: Arc<MetricsTracker>,
}

impl RetrievalOrchestrator {
    pub fn new(
        locator: Arc<dyn ManifestSource>,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
        metrics: Arc<MetricsTracker>,
    ) -> Self {
        Self {
            locator,
            fetcher,
            renderer,
            metrics,
        }
    }

    /// Run one request through locate, select, direct fetch and (maybe) render.
    ///
    /// Each path is attempted at most once.
    pub async fn retrieve(&self, request: &PageRequest) -> RetrievalOutcome {
        let manifest = match self.locator.locate(&request.chapter_id).await {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!("Could not locate chapter {}: {}", request.chapter_id, e);
                return RetrievalOutcome::Failed(e);
            }
        };

        let resolved = match selector::select(&manifest, request.tier, request.page_index) {
            Ok(resolved) => resolved,
            Err(e) => return RetrievalOutcome::Failed(e),
        };

        match self.fetch_direct(&resolved).await {
            Ok(page) => RetrievalOutcome::Served {
                content_type: page.content_type,
                body: page.body,
                path: RetrievalPath::Direct,
            },
            Err(direct_error) => self.render_fallback(request, &resolved, direct_error).await,
        }
    }

    async fn fetch_direct(&self, resolved: &ResolvedPageUrl) -> Result<FetchedPage, FetchError> {
        track_request(&self.metrics, RetrievalPath::Direct, self.fetcher.fetch(&resolved.url)).await
    }

    async fn render_fallback(
        &self,
        request: &PageRequest,
        resolved: &ResolvedPageUrl,
        direct_error: FetchError,
    ) -> RetrievalOutcome {
        let Some(renderer) = &self.renderer else {
            log::warn!("Direct download of {} failed and rendering is disabled: {}", resolved, direct_error);
            return RetrievalOutcome::Failed(RetrievalError::from(direct_error));
        };

        log::info!(
            "Direct download of {} failed ({}), falling back to browser capture",
            resolved,
            direct_error
        );

        let key = ArtifactKey::new(&request.chapter_id, request.page_index);
        let capture = renderer.capture(&resolved.url, &key);
        match track_request(&self.metrics, RetrievalPath::Render, capture).await {
            Ok(artifact) => RetrievalOutcome::Served {
                content_type: CAPTURE_CONTENT_TYPE.to_string(),
                body: PageBody::Artifact(artifact),
                path: RetrievalPath::Render,
            },
            Err(e) => {
                log::error!("Browser capture of {} failed: {}", resolved, e);
                RetrievalOutcome::Failed(RetrievalError::Render(e))
            }
        }
    }
}
