use super::config::BrowserConfig;
use super::manager::{BrowserError, BrowserManager};
use crate::artifact::{ArtifactKey, TransientArtifact};
use crate::retrieval::PageRenderer;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::Tab;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Ready state, loaded resource count and DOM size, as one JSON array
const PAGE_SIGNATURE_SCRIPT: &str = r#"JSON.stringify([
    document.readyState,
    performance.getEntriesByType('resource').length,
    document.documentElement ? document.documentElement.outerHTML.length : 0
])"#;

const IMAGE_STATE_SCRIPT: &str = r#"(() => {
    const img = document.querySelector('img');
    if (!img) return 'missing';
    const rect = img.getBoundingClientRect();
    const style = window.getComputedStyle(img);
    const shown = style.display !== 'none' && style.visibility !== 'hidden' && style.opacity !== '0';
    return img.complete && img.naturalWidth > 0 && rect.width > 0 && rect.height > 0 && shown
        ? 'visible'
        : 'pending';
})()"#;

/// Snapshot of page activity used to detect quiescence
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
struct PageSignature(String, u64, u64);

impl PageSignature {
    fn is_complete(&self) -> bool {
        self.0 == "complete"
    }
}

/// Tracks how long the page signature has stayed the same
struct SettleTracker {
    settle_window: Duration,
    last: Option<PageSignature>,
    unchanged_since: Instant,
}

impl SettleTracker {
    fn new(settle_window: Duration, now: Instant) -> Self {
        Self {
            settle_window,
            last: None,
            unchanged_since: now,
        }
    }

    /// Record an observation; true once a complete page has been unchanged for the window
    fn observe(&mut self, signature: PageSignature, now: Instant) -> bool {
        if self.last.as_ref() != Some(&signature) {
            self.last = Some(signature);
            self.unchanged_since = now;
            return false;
        }
        signature.is_complete() && now.duration_since(self.unchanged_since) >= self.settle_window
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageState {
    Missing,
    Pending,
    Visible,
}

impl ImageState {
    fn from_script(value: Option<&str>) -> Self {
        match value {
            Some("visible") => ImageState::Visible,
            Some("pending") => ImageState::Pending,
            _ => ImageState::Missing,
        }
    }
}

/// Drives one isolated tab through a single page capture.
///
/// Every wait is a bounded poll that also checks the cancellation flag.
pub struct PageCapture<'a> {
    tab: &'a Tab,
    config: &'a BrowserConfig,
    cancel: &'a AtomicBool,
}

impl<'a> PageCapture<'a> {
    pub fn new(tab: &'a Tab, config: &'a BrowserConfig, cancel: &'a AtomicBool) -> Self {
        Self { tab, config, cancel }
    }

    fn check_cancelled(&self) -> Result<(), BrowserError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(BrowserError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Start navigating to a URL and wait until the tab has left its blank page.
    ///
    /// Load completion is covered by [`PageCapture::wait_until_stable`].
    pub fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.check_cancelled()?;
        let start_url = self.tab.get_url();
        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationError(format!("Failed to navigate to {}: {}", url, e)))?;

        let committed = poll_until(self.cancel, self.config.timeout(), self.config.poll_interval, || {
            self.tab.get_url() != start_url
        })?;
        if !committed {
            return Err(BrowserError::NavigationError(format!("Navigation timeout for {}", url)));
        }
        Ok(())
    }

    fn page_signature(&self) -> Option<PageSignature> {
        let result = self.tab.evaluate(PAGE_SIGNATURE_SCRIPT, false).ok()?;
        let raw = result.value?;
        serde_json::from_str(raw.as_str()?).ok()
    }

    /// Wait until the document is loaded and nothing changed for the settle window
    pub fn wait_until_stable(&self) -> Result<(), BrowserError> {
        let start = Instant::now();
        let deadline = start + self.config.stability_timeout;
        let mut tracker = SettleTracker::new(self.config.settle_window, start);

        loop {
            self.check_cancelled()?;

            let now = Instant::now();
            if let Some(signature) = self.page_signature() {
                if tracker.observe(signature, now) {
                    log::debug!("Page stable after {}ms", start.elapsed().as_millis());
                    return Ok(());
                }
            }

            if now >= deadline {
                return Err(BrowserError::Timeout("page to become stable".to_string()));
            }

            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Wait until the first image is decoded and laid out on screen
    pub fn wait_for_visible_image(&self) -> Result<(), BrowserError> {
        let deadline = Instant::now() + self.config.visibility_timeout;
        let mut state = ImageState::Missing;

        loop {
            self.check_cancelled()?;

            if let Ok(result) = self.tab.evaluate(IMAGE_STATE_SCRIPT, false) {
                state = ImageState::from_script(result.value.as_ref().and_then(|v| v.as_str()));
                if state == ImageState::Visible {
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(match state {
                    ImageState::Missing => BrowserError::ElementNotFound("img".to_string()),
                    _ => BrowserError::Timeout("image element to become visible".to_string()),
                });
            }

            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Capture the rendered pixels of the first image as PNG
    pub fn screenshot_image(&self) -> Result<Vec<u8>, BrowserError> {
        self.check_cancelled()?;

        let element = self
            .tab
            .find_element("img")
            .map_err(|e| BrowserError::ElementNotFound(format!("img: {}", e)))?;

        if let Err(e) = element.scroll_into_view() {
            log::debug!("Could not scroll image into view: {}", e);
        }

        let pixels = element
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png)
            .map_err(|e| BrowserError::CaptureError(e.to_string()))?;

        if pixels.is_empty() {
            return Err(BrowserError::CaptureError("empty screenshot".to_string()));
        }
        Ok(pixels)
    }
}

/// Poll `ready` until it holds or `timeout` elapses; `Ok(false)` on timeout.
///
/// The cancellation flag is checked before every poll.
fn poll_until<F>(cancel: &AtomicBool, timeout: Duration, interval: Duration, mut ready: F) -> Result<bool, BrowserError>
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(BrowserError::Cancelled);
        }
        if ready() {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        std::thread::sleep(interval);
    }
}

/// Render `url` in its own tab and persist the image to `dir`.
///
/// Blocking; the tab is closed before the capture is written.
pub fn capture_page(
    manager: &BrowserManager,
    url: &str,
    key: &ArtifactKey,
    dir: &Path,
    cancel: &AtomicBool,
) -> Result<TransientArtifact, BrowserError> {
    let pixels = {
        let tab = manager.new_tab()?;
        let capture = PageCapture::new(&tab, manager.config(), cancel);
        capture.navigate(url)?;
        capture.wait_until_stable()?;
        capture.wait_for_visible_image()?;
        capture.screenshot_image()?
    };

    if cancel.load(Ordering::Relaxed) {
        return Err(BrowserError::Cancelled);
    }

    TransientArtifact::write(dir, key, &pixels).map_err(|e| BrowserError::ArtifactError(e.to_string()))
}

/// Raises the cancellation flag when the owning future is dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Render fallback backed by the shared headless browser
pub struct BrowserRenderer {
    manager: Arc<BrowserManager>,
    temp_dir: PathBuf,
}

impl BrowserRenderer {
    pub fn new(manager: Arc<BrowserManager>, temp_dir: PathBuf) -> Self {
        Self { manager, temp_dir }
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn capture(&self, url: &str, key: &ArtifactKey) -> Result<TransientArtifact, BrowserError> {
        let cancel = CancelOnDrop(Arc::new(AtomicBool::new(false)));
        let flag = Arc::clone(&cancel.0);
        let manager = Arc::clone(&self.manager);
        let dir = self.temp_dir.clone();
        let url = url.to_string();
        let key = key.clone();

        log::info!("Rendering {} in headless browser", url);

        // If this future is dropped the task still finishes, but sees the
        // flag and its artifact (if any) is dropped with the join output.
        let result = tokio::task::spawn_blocking(move || capture_page(&manager, &url, &key, &dir, &flag))
            .await
            .map_err(|e| BrowserError::TaskError(e.to_string()))?;

        drop(cancel);
        result
    }
}
