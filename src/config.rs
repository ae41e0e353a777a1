use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::BrowserConfig;
use crate::http_client::HttpClientConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory that holds transient page captures
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// First port tried when binding
    #[serde(default = "default_port")]
    pub port: u16,

    /// Last port tried when binding
    #[serde(default = "default_max_port")]
    pub max_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// MangaDex API base URL
    #[serde(default = "default_api_base")]
    pub api_base_url: String,

    /// Timeout for metadata and page requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Fixed user agent; a browser-like one is picked at random when unset
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Enable gzip/brotli compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Launch headless Chrome for the render fallback
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Keep Chrome's sandbox on; usually off inside containers
    #[serde(default)]
    pub sandbox: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Navigation timeout in seconds
    #[serde(default = "default_timeout")]
    pub navigation_timeout_secs: u64,

    /// Upper bound for the page to become quiescent, in milliseconds
    #[serde(default = "default_stability_timeout")]
    pub stability_timeout_ms: u64,

    /// How long the page must stay unchanged to count as stable, in milliseconds
    #[serde(default = "default_settle_window")]
    pub settle_window_ms: u64,

    /// Upper bound for the image element to become visible, in milliseconds
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_ms: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Additional Chrome flags
    #[serde(default)]
    pub chrome_flags: Vec<String>,
}

fn default_true() -> bool { true }
fn default_temp_dir() -> String { std::env::temp_dir().join("manga_page_gateway").to_string_lossy().into_owned() }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_port() -> u16 { 8090 }
fn default_api_base() -> String { crate::sources::mangadex::BASE_URL.to_string() }
fn default_timeout() -> u64 { 30 }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_stability_timeout() -> u64 { 15_000 }
fn default_settle_window() -> u64 { 500 }
fn default_visibility_timeout() -> u64 { 10_000 }
fn default_poll_interval() -> u64 { 100 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_port: default_max_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base(),
            timeout_secs: default_timeout(),
            user_agent: None,
            enable_compression: true,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            sandbox: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            navigation_timeout_secs: default_timeout(),
            stability_timeout_ms: default_stability_timeout(),
            settle_window_ms: default_settle_window(),
            visibility_timeout_ms: default_visibility_timeout(),
            poll_interval_ms: default_poll_interval(),
            chrome_flags: vec![],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load from an explicit path, falling back to defaults when the file
    /// is missing or malformed
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring malformed {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Could not read {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn temp_dir(&self) -> PathBuf {
        PathBuf::from(&self.temp_dir)
    }
}

impl UpstreamConfig {
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            enable_gzip: self.enable_compression,
        }
    }
}

impl BrowserSettings {
    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            headless: self.headless,
            sandbox: self.sandbox,
            window_size: (self.window_width, self.window_height),
            timeout_seconds: self.navigation_timeout_secs,
            stability_timeout: Duration::from_millis(self.stability_timeout_ms),
            settle_window: Duration::from_millis(self.settle_window_ms),
            visibility_timeout: Duration::from_millis(self.visibility_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            chrome_flags: self.chrome_flags.clone(),
            ..BrowserConfig::default()
        }
    }
}
