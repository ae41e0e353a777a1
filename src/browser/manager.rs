use super::config::BrowserConfig;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::ops::Deref;
use std::sync::{Arc, RwLock};

/// Owns the single headless browser process of the gateway.
///
/// The browser is launched once by [`BrowserManager::new`] and torn down by
/// [`BrowserManager::shutdown`]. Callers only ever get isolated tabs.
pub struct BrowserManager {
    browser: RwLock<Option<Browser>>,
    config: BrowserConfig,
}

impl BrowserManager {
    /// Launch a browser with the given configuration
    pub fn new(config: BrowserConfig) -> Result<Self, BrowserError> {
        let browser = {
            let launch_options = Self::build_launch_options(&config)?;
            Browser::new(launch_options)
                .map_err(|e| BrowserError::InitializationError(e.to_string()))?
        };

        log::info!(
            "Headless browser launched (headless: {}, window: {}x{})",
            config.headless,
            config.window_size.0,
            config.window_size.1
        );

        Ok(Self {
            browser: RwLock::new(Some(browser)),
            config,
        })
    }

    /// Build Chrome launch options from our config
    fn build_launch_options(config: &BrowserConfig) -> Result<LaunchOptions<'_>, BrowserError> {
        let args: Vec<&OsStr> = config.chrome_flags.iter().map(OsStr::new).collect();

        LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some((config.window_size.0, config.window_size.1)))
            .idle_browser_timeout(config.idle_timeout)
            .args(args)
            .build()
            .map_err(|e| BrowserError::ConfigurationError(e.to_string()))
    }

    /// Open a fresh tab that no other caller can see.
    ///
    /// The tab is closed when the returned guard is dropped.
    pub fn new_tab(&self) -> Result<IsolatedTab, BrowserError> {
        let guard = self
            .browser
            .read()
            .map_err(|_| BrowserError::TabCreationError("browser lock poisoned".to_string()))?;
        let browser = guard.as_ref().ok_or(BrowserError::Unavailable)?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::TabCreationError(e.to_string()))?;
        tab.set_default_timeout(self.config.timeout());

        Ok(IsolatedTab { tab })
    }

    /// Close the browser process. Later `new_tab` calls fail with `Unavailable`.
    pub fn shutdown(&self) {
        let taken = match self.browser.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if taken.is_some() {
            log::info!("Headless browser shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.browser.read().map(|b| b.is_some()).unwrap_or(false)
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

/// A browser tab owned by exactly one capture
pub struct IsolatedTab {
    tab: Arc<Tab>,
}

impl Deref for IsolatedTab {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.tab
    }
}

impl Drop for IsolatedTab {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            log::debug!("Closing tab failed: {}", e);
        }
    }
}

/// Errors that can occur during browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    #[error("Browser configuration error: {0}")]
    ConfigurationError(String),

    #[error("Browser is not running")]
    Unavailable,

    #[error("Tab creation failed: {0}")]
    TabCreationError(String),

    #[error("Navigation error: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Screenshot failed: {0}")]
    CaptureError(String),

    #[error("Could not persist capture: {0}")]
    ArtifactError(String),

    #[error("Capture cancelled")]
    Cancelled,

    #[error("Capture task failed: {0}")]
    TaskError(String),
}
