use crate::api::{read_limited_bytes, FetchError};
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of images kept in memory.
pub const DEFAULT_IMAGE_CACHE_ENTRIES: usize = 200;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Not an image (content type {0})")]
    NotAnImage(String),
    #[error("Image fetch failed unexpectedly: {0}")]
    Panicked(String),
}

/// Raw image bytes as served. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Arc<[u8]>,
    pub content_type: Option<String>,
}

impl ImageData {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fetches image bytes for a URL. Implementations must not retry.
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<ImageData, ImageError>> + Send;
}

/// HTTP image fetcher with an in-memory LRU cache keyed by URL.
pub struct HttpImageFetcher {
    http: reqwest::Client,
    timeout: Duration,
    cache: Mutex<LruCache<String, ImageData>>,
}

impl HttpImageFetcher {
    pub fn new(http: reqwest::Client, cache_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            http,
            timeout: DEFAULT_TIMEOUT,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn cached(&self, url: &str) -> Option<ImageData> {
        match self.cache.lock() {
            Ok(mut cache) => cache.get(url).cloned(),
            Err(_) => None,
        }
    }

    fn store(&self, url: &str, image: &ImageData) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(url.to_string(), image.clone());
        }
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<ImageData, ImageError> {
        let parsed = Url::parse(url).map_err(|e| ImageError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        if let Some(hit) = self.cached(url) {
            tracing::trace!(url, "Image cache hit");
            return Ok(hit);
        }

        let response = tokio::time::timeout(self.timeout, self.http.get(parsed).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Transport)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()).into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = &content_type {
            if !ct.starts_with("image/") {
                return Err(ImageError::NotAnImage(ct.clone()));
            }
        }

        let bytes = read_limited_bytes(response, MAX_IMAGE_SIZE).await?;
        let image = ImageData {
            bytes: Arc::from(bytes),
            content_type,
        };
        self.store(url, &image);
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn fetcher() -> HttpImageFetcher {
        HttpImageFetcher::new(reqwest::Client::new(), 4)
    }

    #[tokio::test]
    async fn test_fetch_image() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mickey.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(PNG_MAGIC)
                    .insert_header("Content-Type", "image/png"),
            )
            .mount(&mock_server)
            .await;

        let image = fetcher()
            .fetch(&format!("{}/mickey.png", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(&*image.bytes, PNG_MAGIC);
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(PNG_MAGIC)
                    .insert_header("Content-Type", "image/png"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = fetcher();
        let url = format!("{}/a.png", mock_server.uri());
        let first = fetcher.fetch(&url).await.unwrap();
        let second = fetcher.fetch(&url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_html_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .insert_header("Content-Type", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/page", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::NotAnImage(_)));
    }

    #[tokio::test]
    async fn test_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing.png", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Fetch(FetchError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_bad_urls_rejected() {
        let fetcher = fetcher();
        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(ImageError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch("file:///etc/passwd").await,
            Err(ImageError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_zero_capacity_cache_is_clamped() {
        let fetcher = HttpImageFetcher::new(reqwest::Client::new(), 0);
        assert_eq!(fetcher.cache.lock().unwrap().cap().get(), 1);
    }
}
