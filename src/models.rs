use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image fidelity served by the delivery network
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Standard,
    Reduced,
}

impl QualityTier {
    /// Path segment used by the delivery host for this tier
    pub fn path_segment(self) -> &'static str {
        match self {
            QualityTier::Standard => "data",
            QualityTier::Reduced => "data-saver",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Standard => f.write_str("standard"),
            QualityTier::Reduced => f.write_str("reduced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality tier '{0}' (expected standard, reduced, data or data-saver)")]
pub struct UnknownQualityTier(pub String);

impl FromStr for QualityTier {
    type Err = UnknownQualityTier;

    // "data" and "data-saver" are the upstream segment names, kept as aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standard" | "data" => Ok(QualityTier::Standard),
            "reduced" | "data-saver" | "datasaver" => Ok(QualityTier::Reduced),
            other => Err(UnknownQualityTier(other.to_string())),
        }
    }
}

/// Delivery information for one chapter.
///
/// Built fresh for every retrieval: the hash is a time-bound token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPageManifest {
    pub delivery_base_url: String,
    pub content_hash: String,
    pub standard_refs: Vec<String>,
    pub reduced_refs: Vec<String>,
}

impl ChapterPageManifest {
    pub fn page_count(&self) -> usize {
        self.standard_refs.len()
    }
}

/// A page URL on the delivery host together with the tier it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPageUrl {
    pub url: String,
    pub tier: QualityTier,
}

impl fmt::Display for ResolvedPageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// A page retrieval request as received from the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub chapter_id: String,
    pub page_index: usize,
    pub tier: QualityTier,
}

/// `GET /at-home/server/{chapterId}` response, also the shape served by
/// `/api/chapter/{id}/pages`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeServerResponse {
    pub result: String,
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}

impl From<AtHomeServerResponse> for ChapterPageManifest {
    fn from(resp: AtHomeServerResponse) -> Self {
        Self {
            delivery_base_url: resp.base_url.trim_end_matches('/').to_string(),
            content_hash: resp.chapter.hash,
            standard_refs: resp.chapter.data,
            reduced_refs: resp.chapter.data_saver,
        }
    }
}

impl From<ChapterPageManifest> for AtHomeServerResponse {
    fn from(manifest: ChapterPageManifest) -> Self {
        Self {
            result: "ok".to_string(),
            base_url: manifest.delivery_base_url,
            chapter: AtHomeChapter {
                hash: manifest.content_hash,
                data: manifest.standard_refs,
                data_saver: manifest.reduced_refs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_aliases() {
        assert_eq!("standard".parse::<QualityTier>().unwrap(), QualityTier::Standard);
        assert_eq!("data".parse::<QualityTier>().unwrap(), QualityTier::Standard);
        assert_eq!("Reduced".parse::<QualityTier>().unwrap(), QualityTier::Reduced);
        assert_eq!("data-saver".parse::<QualityTier>().unwrap(), QualityTier::Reduced);
        assert!("hd".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(QualityTier::Standard.path_segment(), "data");
        assert_eq!(QualityTier::Reduced.path_segment(), "data-saver");
    }

    #[test]
    fn test_at_home_response_into_manifest() {
        let json = r#"{
            "result": "ok",
            "baseUrl": "https://uploads.mangadex.org/",
            "chapter": {
                "hash": "abc123",
                "data": ["1-a.png", "2-b.png"],
                "dataSaver": ["1-a.jpg"]
            }
        }"#;
        let resp: AtHomeServerResponse = serde_json::from_str(json).unwrap();
        let manifest = ChapterPageManifest::from(resp);

        assert_eq!(manifest.delivery_base_url, "https://uploads.mangadex.org");
        assert_eq!(manifest.content_hash, "abc123");
        assert_eq!(manifest.page_count(), 2);
        assert_eq!(manifest.reduced_refs, vec!["1-a.jpg"]);
    }

    #[test]
    fn test_manifest_serializes_in_at_home_shape() {
        let manifest = ChapterPageManifest {
            delivery_base_url: "https://cdn.example".to_string(),
            content_hash: "abc123".to_string(),
            standard_refs: vec!["1-a.png".to_string()],
            reduced_refs: vec!["1-a.jpg".to_string()],
        };

        let value = serde_json::to_value(AtHomeServerResponse::from(manifest)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "result": "ok",
                "baseUrl": "https://cdn.example",
                "chapter": {"hash": "abc123", "data": ["1-a.png"], "dataSaver": ["1-a.jpg"]}
            })
        );
    }
}
