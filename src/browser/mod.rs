//! Headless browser used as the render fallback for page images
//!
//! One Chrome process is launched per gateway process. Every capture opens its
//! own tab, waits for the page to settle, screenshots the first image and
//! closes the tab again.
//!
//! # Example
//!
//! ```no_run
//! use manga_page_gateway::artifact::ArtifactKey;
//! use manga_page_gateway::browser::{capture_page, BrowserConfig, BrowserManager};
//! use std::sync::atomic::AtomicBool;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = BrowserManager::new(BrowserConfig::default())?;
//! let key = ArtifactKey::new("chapter-id", 0);
//! let cancel = AtomicBool::new(false);
//!
//! let artifact = capture_page(
//!     &manager,
//!     "https://uploads.mangadex.org/data/hash/page.png",
//!     &key,
//!     &std::env::temp_dir(),
//!     &cancel,
//! )?;
//! println!("Captured {} bytes to {}", artifact.len(), artifact.path().display());
//!
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod manager;

// Re-export main types for convenience
pub use capture::{capture_page, BrowserRenderer, PageCapture};
pub use config::BrowserConfig;
pub use manager::{BrowserError, BrowserManager, IsolatedTab};
