use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use std::fmt;
use std::time::Duration;

use crate::artifact::TransientArtifact;

/// User agents picked from when no fixed agent is configured
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

/// Content type assumed when the delivery host omits one
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Configuration for the outbound HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub enable_gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            enable_gzip: true,
        }
    }
}

/// Errors from a single outbound request
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            FetchError::Decode { .. } => None,
        }
    }
}

/// Body of a page served to the caller
pub enum PageBody {
    /// Fully buffered bytes
    Bytes(Bytes),
    /// Bytes streamed straight from the delivery host
    Stream(BoxStream<'static, Result<Bytes, std::io::Error>>),
    /// A render capture on disk, removed once the body is consumed or dropped
    Artifact(TransientArtifact),
}

impl PageBody {
    /// Buffer the whole body in memory
    pub async fn into_bytes(self) -> Result<Bytes, std::io::Error> {
        match self {
            PageBody::Bytes(bytes) => Ok(bytes),
            PageBody::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
            PageBody::Artifact(artifact) => {
                let bytes = tokio::fs::read(artifact.path()).await;
                drop(artifact);
                bytes.map(Bytes::from)
            }
        }
    }

    /// Turn the body into a response stream.
    ///
    /// An artifact body owns its file until the stream yields or is dropped.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, std::io::Error>> {
        match self {
            PageBody::Bytes(bytes) => futures::stream::once(async move { Ok(bytes) }).boxed(),
            PageBody::Stream(stream) => stream,
            body @ PageBody::Artifact(_) => futures::stream::once(body.into_bytes()).boxed(),
        }
    }
}

impl fmt::Debug for PageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageBody::Bytes(bytes) => write!(f, "PageBody::Bytes({} bytes)", bytes.len()),
            PageBody::Stream(_) => f.write_str("PageBody::Stream"),
            PageBody::Artifact(artifact) => {
                write!(f, "PageBody::Artifact({})", artifact.path().display())
            }
        }
    }
}

/// A successful direct page download
#[derive(Debug)]
pub struct FetchedPage {
    pub content_type: String,
    pub body: PageBody,
}

/// Outbound HTTP client shared by the metadata lookups and the direct page path.
///
/// Every call makes exactly one attempt; callers decide what happens on failure.
#[derive(Clone)]
pub struct EnhancedHttpClient {
    client: Client,
}

impl EnhancedHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| Self::random_user_agent().to_string());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(user_agent)
            .gzip(config.enable_gzip)
            .brotli(config.enable_gzip)
            .default_headers(headers)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// Get a random user agent from the pool
    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        let index = rng.gen_range(0..USER_AGENTS.len());
        USER_AGENTS[index]
    }

    /// GET a URL and deserialize the JSON body.
    ///
    /// Non-2xx answers are reported as [`FetchError::Status`] without reading the body.
    pub async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, FetchError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch a page image once and hand back its body as a stream
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, IMAGE_ACCEPT)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = content_type_or_default(response.headers());
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();

        Ok(FetchedPage {
            content_type,
            body: PageBody::Stream(stream),
        })
    }
}

fn content_type_or_default(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_IMAGE_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = EnhancedHttpClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_random_user_agent() {
        let ua1 = EnhancedHttpClient::random_user_agent();
        let ua2 = EnhancedHttpClient::random_user_agent();
        assert!(USER_AGENTS.contains(&ua1));
        assert!(USER_AGENTS.contains(&ua2));
    }

    #[test]
    fn test_content_type_default() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_type_or_default(&headers), "image/jpeg");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static(""));
        assert_eq!(content_type_or_default(&headers), "image/jpeg");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert_eq!(content_type_or_default(&headers), "image/png");
    }

    #[tokio::test]
    async fn test_stream_body_into_bytes() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let body = PageBody::Stream(futures::stream::iter(chunks).boxed());
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn test_artifact_body_is_removed_after_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let key = crate::artifact::ArtifactKey::new("c1", 2);
        let artifact = TransientArtifact::write(dir.path(), &key, b"pixels").unwrap();
        let path = artifact.path().to_path_buf();

        let mut stream = PageBody::Artifact(artifact).into_stream();
        assert!(path.exists());
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"pixels"));
        assert!(!path.exists());
    }

    #[test]
    fn test_unconsumed_artifact_body_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let key = crate::artifact::ArtifactKey::new("c1", 2);
        let artifact = TransientArtifact::write(dir.path(), &key, b"pixels").unwrap();
        let path = artifact.path().to_path_buf();

        let stream = PageBody::Artifact(artifact).into_stream();
        drop(stream);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = EnhancedHttpClient::with_config(HttpClientConfig {
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        let result = client.fetch_page("http://127.0.0.1:9/page.png").await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
