use async_trait::async_trait;
use serde_json::Value;

use crate::error::RetrievalError;
use crate::http_client::{EnhancedHttpClient, FetchError};
use crate::models::{AtHomeServerResponse, ChapterPageManifest};
use crate::retrieval::ManifestSource;

pub const BASE_URL: &str = "https://api.mangadex.org";

/// Read-only MangaDex API client.
///
/// Nothing is cached: at-home hashes expire, so every lookup goes upstream.
#[derive(Clone)]
pub struct MangaDexClient {
    http: EnhancedHttpClient,
    base_url: String,
}

impl MangaDexClient {
    pub fn new(http: EnhancedHttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search manga by title
    pub async fn search_manga(&self, title: &str, limit: u32) -> Result<Value, FetchError> {
        let url = format!("{}/manga", self.base_url);
        let limit = limit.to_string();
        self.http
            .get_json(
                &url,
                &[
                    ("title", title),
                    ("limit", limit.as_str()),
                    ("includes[]", "cover_art"),
                    ("includes[]", "author"),
                ],
            )
            .await
    }

    pub async fn get_manga(&self, manga_id: &str) -> Result<Value, FetchError> {
        let url = format!("{}/manga/{}", self.base_url, manga_id);
        self.http
            .get_json(&url, &[("includes[]", "cover_art"), ("includes[]", "author")])
            .await
    }

    /// One page of a manga's chapter feed, newest volume and chapter first
    pub async fn get_chapters(
        &self,
        manga_id: &str,
        language: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Value, FetchError> {
        let url = format!("{}/manga/{}/feed", self.base_url, manga_id);
        let limit = limit.to_string();
        let offset = offset.to_string();
        self.http
            .get_json(
                &url,
                &[
                    ("translatedLanguage[]", language),
                    ("limit", limit.as_str()),
                    ("offset", offset.as_str()),
                    ("order[volume]", "desc"),
                    ("order[chapter]", "desc"),
                ],
            )
            .await
    }

    /// Fetch the at-home delivery manifest for a chapter
    pub async fn get_chapter_pages(&self, chapter_id: &str) -> Result<ChapterPageManifest, RetrievalError> {
        let url = format!("{}/at-home/server/{}", self.base_url, chapter_id);
        let response: AtHomeServerResponse = match self.http.get_json(&url, &[]).await {
            Ok(response) => response,
            Err(e) if e.status() == Some(404) => {
                return Err(RetrievalError::NotFound(chapter_id.to_string()))
            }
            Err(e) => return Err(RetrievalError::from(e)),
        };

        if response.result != "ok" {
            return Err(RetrievalError::UpstreamUnavailable(format!(
                "at-home server answered result '{}' for chapter {}",
                response.result, chapter_id
            )));
        }

        let manifest = ChapterPageManifest::from(response);
        log::debug!(
            "Located chapter {} on {} ({} pages, {} reduced)",
            chapter_id,
            manifest.delivery_base_url,
            manifest.standard_refs.len(),
            manifest.reduced_refs.len()
        );
        Ok(manifest)
    }
}

#[async_trait]
impl ManifestSource for MangaDexClient {
    async fn locate(&self, chapter_id: &str) -> Result<ChapterPageManifest, RetrievalError> {
        self.get_chapter_pages(chapter_id).await
    }
}
