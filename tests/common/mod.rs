//! Fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use manga_page_gateway::app_state::AppState;
use manga_page_gateway::artifact::{ArtifactKey, TransientArtifact};
use manga_page_gateway::browser::BrowserError;
use manga_page_gateway::error::RetrievalError;
use manga_page_gateway::http_client::{
    EnhancedHttpClient, FetchError, FetchedPage, HttpClientConfig, PageBody,
};
use manga_page_gateway::metrics::MetricsTracker;
use manga_page_gateway::models::ChapterPageManifest;
use manga_page_gateway::retrieval::{
    ManifestSource, PageFetcher, PageRenderer, RetrievalOrchestrator,
};
use manga_page_gateway::sources::mangadex::MangaDexClient;

/// Nothing listens on the discard port
pub const UNREACHABLE_API: &str = "http://127.0.0.1:9";

/// Every chapter has five standard and three reduced pages
pub struct StaticLocator;

#[async_trait]
impl ManifestSource for StaticLocator {
    async fn locate(&self, chapter_id: &str) -> Result<ChapterPageManifest, RetrievalError> {
        if chapter_id == "missing" {
            return Err(RetrievalError::NotFound(chapter_id.to_string()));
        }
        Ok(ChapterPageManifest {
            delivery_base_url: "https://cdn.example".to_string(),
            content_hash: chapter_id.to_string(),
            standard_refs: (0..5).map(|i| format!("s{}.png", i)).collect(),
            reduced_refs: (0..3).map(|i| format!("r{}.jpg", i)).collect(),
        })
    }
}

/// Answers with the URL as body, or a 503 when `fail` is set
#[derive(Default)]
pub struct EchoFetcher {
    pub fail: bool,
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl PageFetcher for EchoFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(FetchedPage {
            content_type: "image/jpeg".to_string(),
            body: PageBody::Bytes(Bytes::from(url.to_string())),
        })
    }
}

/// Writes `capture:{url}` to disk, optionally stalling after the write
pub struct DiskRenderer {
    pub dir: PathBuf,
    pub stall: Option<Duration>,
    pub calls: AtomicUsize,
    pub written: AtomicUsize,
}

impl DiskRenderer {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            stall: None,
            calls: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
        }
    }

    pub fn stalling(dir: PathBuf, stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::new(dir)
        }
    }
}

#[async_trait]
impl PageRenderer for DiskRenderer {
    async fn capture(&self, url: &str, key: &ArtifactKey) -> Result<TransientArtifact, BrowserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let artifact = TransientArtifact::write(&self.dir, key, format!("capture:{}", url).as_bytes())
            .map_err(|e| BrowserError::ArtifactError(e.to_string()))?;
        self.written.fetch_add(1, Ordering::SeqCst);

        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        Ok(artifact)
    }
}

pub fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

pub fn orchestrator(
    fetcher: Arc<EchoFetcher>,
    renderer: Option<Arc<DiskRenderer>>,
    metrics: Arc<MetricsTracker>,
) -> RetrievalOrchestrator {
    RetrievalOrchestrator::new(
        Arc::new(StaticLocator),
        fetcher,
        renderer.map(|r| r as Arc<dyn PageRenderer>),
        metrics,
    )
}

pub fn http_client() -> EnhancedHttpClient {
    EnhancedHttpClient::with_config(HttpClientConfig {
        timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap()
}

/// App state with fake retrieval seams and an unreachable metadata API
pub fn app_state(fetcher: Arc<EchoFetcher>, renderer: Option<Arc<DiskRenderer>>) -> AppState {
    app_state_with_api(UNREACHABLE_API, fetcher, renderer)
}

pub fn app_state_with_api(
    api_base_url: &str,
    fetcher: Arc<EchoFetcher>,
    renderer: Option<Arc<DiskRenderer>>,
) -> AppState {
    let metrics = Arc::new(MetricsTracker::new());

    AppState {
        mangadex: MangaDexClient::new(http_client(), api_base_url),
        orchestrator: orchestrator(fetcher, renderer, metrics.clone()),
        metrics,
        browser_manager: None,
    }
}
