use std::time::Duration;

/// Configuration for the shared headless browser and page captures
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,

    /// Run Chrome with its sandbox (off in containers)
    pub sandbox: bool,

    /// Browser window size
    pub window_size: (u32, u32),

    /// Navigation timeout in seconds
    pub timeout_seconds: u64,

    /// Upper bound for a page to become quiescent
    pub stability_timeout: Duration,

    /// How long a page must stay unchanged to count as quiescent
    pub settle_window: Duration,

    /// Upper bound for the image element to become visible
    pub visibility_timeout: Duration,

    /// Delay between polls while waiting
    pub poll_interval: Duration,

    /// How long the browser may sit without any tab activity before
    /// headless_chrome shuts it down
    pub idle_timeout: Duration,

    /// Additional Chrome flags
    pub chrome_flags: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            window_size: (1920, 1080),
            timeout_seconds: 30,
            stability_timeout: Duration::from_secs(15),
            settle_window: Duration::from_millis(500),
            visibility_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            idle_timeout: Duration::from_secs(60 * 60 * 24 * 365),
            chrome_flags: vec![],
        }
    }
}

impl BrowserConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
