//! Application state for the Actix-web server
//!
//! `AppState` is wrapped in `web::Data` and shared across all HTTP handlers.
//! It owns the MangaDex client, the retrieval orchestrator and a handle on the
//! shared headless browser (when the render fallback is enabled).

use std::sync::Arc;

use crate::browser::{BrowserManager, BrowserRenderer};
use crate::config::Config;
use crate::http_client::EnhancedHttpClient;
use crate::metrics::MetricsTracker;
use crate::retrieval::{PageRenderer, RetrievalOrchestrator};
use crate::sources::mangadex::MangaDexClient;

/// Shared application state for Actix-web handlers
pub struct AppState {
    /// MangaDex API client for the metadata endpoints
    pub mangadex: MangaDexClient,
    /// Page retrieval with direct and render paths
    pub orchestrator: RetrievalOrchestrator,
    /// Per-path retrieval metrics
    pub metrics: Arc<MetricsTracker>,
    /// Shared browser, `None` when the render fallback is disabled
    pub browser_manager: Option<Arc<BrowserManager>>,
}

impl AppState {
    /// Wire the production collaborators together
    pub fn new(
        config: &Config,
        http: EnhancedHttpClient,
        browser_manager: Option<Arc<BrowserManager>>,
    ) -> Self {
        let metrics = Arc::new(MetricsTracker::new());
        let mangadex = MangaDexClient::new(http.clone(), &config.upstream.api_base_url);

        let renderer = browser_manager.as_ref().map(|manager| {
            Arc::new(BrowserRenderer::new(Arc::clone(manager), config.temp_dir())) as Arc<dyn PageRenderer>
        });

        let orchestrator = RetrievalOrchestrator::new(
            Arc::new(mangadex.clone()),
            Arc::new(http),
            renderer,
            Arc::clone(&metrics),
        );

        Self {
            mangadex,
            orchestrator,
            metrics,
            browser_manager,
        }
    }
}
