use crate::api::types::{Character, DetailEnvelope, PageEnvelope};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.disneyapi.dev";
/// Page size used by the official clients.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const COLLECTION_PATH: &str = "character";

// ============================================================================
// Error Types
// ============================================================================

/// The three failure classes observers are told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Transport,
    Decode,
}

/// Errors that can occur while talking to the collection endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request target could not be built (bad base URL, page 0, empty name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not the expected JSON envelope
    #[error("Failed to decode response: {0}")]
    Decode(String),
    /// The task running the request panicked
    #[error("Request failed unexpectedly: {0}")]
    Panicked(String),
}

impl FetchError {
    /// Classify this error into one of the observer-facing kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            FetchError::Transport(_)
            | FetchError::Timeout
            | FetchError::HttpStatus(_)
            | FetchError::ResponseTooLarge
            | FetchError::Panicked(_) => ErrorKind::Transport,
            FetchError::Decode(_) => ErrorKind::Decode,
        }
    }
}

// ============================================================================
// Source Trait
// ============================================================================

/// The three request kinds the feed controller depends on.
///
/// [`CollectionClient`] is the HTTP implementation; tests substitute
/// scripted sources to control completion order.
pub trait CollectionSource: Send + Sync + 'static {
    /// Fetch 1-based page `page` with `page_size` entries.
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<PageEnvelope, FetchError>> + Send;

    fn fetch_by_id(&self, id: i64) -> impl Future<Output = Result<Character, FetchError>> + Send;

    /// Search by name. Results carry no usable pagination.
    fn search_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<PageEnvelope, FetchError>> + Send;
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client for the paginated character collection.
///
/// No retries: failures are returned to the caller immediately.
#[derive(Debug, Clone)]
pub struct CollectionClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CollectionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base}/character[/extra]`, keeping any path prefix on the base.
    fn endpoint(&self, extra: Option<&str>) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            FetchError::InvalidRequest(format!("bad base URL '{}': {}", self.base_url, e))
        })?;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FetchError::InvalidRequest(format!("base URL '{}' cannot hold a path", self.base_url))
            })?;
            segments.pop_if_empty().push(COLLECTION_PATH);
            if let Some(extra) = extra {
                segments.push(extra);
            }
        }

        Ok(url)
    }

    fn page_url(&self, page: u32, page_size: u32) -> Result<Url, FetchError> {
        if page == 0 {
            return Err(FetchError::InvalidRequest("pages are 1-based".into()));
        }
        if page_size == 0 {
            return Err(FetchError::InvalidRequest("page size must be positive".into()));
        }

        let mut url = self.endpoint(None)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());
        Ok(url)
    }

    fn search_url(&self, name: &str) -> Result<Url, FetchError> {
        if name.is_empty() {
            return Err(FetchError::InvalidRequest("search name is empty".into()));
        }

        let mut url = self.endpoint(None)?;
        // append_pair percent-encodes the name
        url.query_pairs_mut().append_pair("name", name);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        tracing::debug!(url = %url, "GET");

        let response = tokio::time::timeout(self.timeout, self.http.get(url.clone()).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Transport)?;

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Collection request failed");
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Response did not match envelope");
            FetchError::Decode(e.to_string())
        })
    }
}

impl CollectionSource for CollectionClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<PageEnvelope, FetchError> {
        let url = self.page_url(page, page_size)?;
        self.get_json(url).await
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Character, FetchError> {
        let url = self.endpoint(Some(&id.to_string()))?;
        let envelope: DetailEnvelope = self.get_json(url).await?;
        Ok(envelope.data)
    }

    async fn search_by_name(&self, name: &str) -> Result<PageEnvelope, FetchError> {
        let url = self.search_url(name)?;
        self.get_json(url).await
    }
}

/// Read a response body, failing once it grows past `limit` bytes.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Transport)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHARACTER: &str = r#"{
        "_id": 308, "name": "Ariel", "imageUrl": null, "sourceUrl": null,
        "films": ["The Little Mermaid"], "shortFilms": [], "tvShows": [],
        "videoGames": [], "parkAttractions": [], "allies": [], "enemies": ["Ursula"],
        "url": "https://api.disneyapi.dev/characters/308"
    }"#;

    fn page_body(total_pages: Option<u32>) -> String {
        let total = total_pages
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".into());
        format!(r#"{{"info": {{"totalPages": {total}, "count": 1}}, "data": [{CHARACTER}]}}"#)
    }

    #[tokio::test]
    async fn test_fetch_page_sends_query() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/character"))
            .and(query_param("page", "3"))
            .and(query_param("pageSize", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_body(Some(7))))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CollectionClient::new(reqwest::Client::new(), mock_server.uri());
        let page = client.fetch_page(3, 20).await.unwrap();
        assert_eq!(page.info.total_pages, Some(7));
        assert_eq!(page.data[0].name, "Ariel");
    }

    #[tokio::test]
    async fn test_fetch_by_id_uses_path() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/character/308"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"info": {{"count": 1}}, "data": {CHARACTER}}}"#)),
            )
            .mount(&mock_server)
            .await;

        let client = CollectionClient::new(reqwest::Client::new(), mock_server.uri());
        let character = client.fetch_by_id(308).await.unwrap();
        assert_eq!(character.id, 308);
        assert_eq!(character.enemies, vec!["Ursula".to_string()]);
    }

    #[tokio::test]
    async fn test_search_escapes_name() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/character"))
            .and(query_param("name", "Mickey & Minnie?"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_body(None)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CollectionClient::new(reqwest::Client::new(), mock_server.uri());
        let result = client.search_by_name("Mickey & Minnie?").await.unwrap();
        assert_eq!(result.info.total_pages, None);
        assert_eq!(result.data.len(), 1);
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_kept() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/character"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_body(Some(1))))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            CollectionClient::new(reqwest::Client::new(), format!("{}/v1/", mock_server.uri()));
        assert!(client.fetch_page(1, 50).await.is_ok());
    }

    #[tokio::test]
    async fn test_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"unexpected": true}"#))
            .mount(&mock_server)
            .await;

        let client = CollectionClient::new(reqwest::Client::new(), mock_server.uri());
        let err = client.fetch_page(1, 50).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_http_status_is_transport_kind() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1) // no retries
            .mount(&mock_server)
            .await;

        let client = CollectionClient::new(reqwest::Client::new(), mock_server.uri());
        let err = client.fetch_page(1, 50).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(503)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_body(Some(1)))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = CollectionClient::new(reqwest::Client::new(), mock_server.uri())
            .with_timeout(Duration::from_millis(50));
        let err = client.fetch_page(1, 50).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Port 9 (discard) on loopback is almost never listening
        let client = CollectionClient::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = client.fetch_page(1, 50).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let client = CollectionClient::new(reqwest::Client::new(), "not a url");
        let err = client.fetch_page(1, 50).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let client = CollectionClient::new(reqwest::Client::new(), "mailto:someone@example.com");
        let err = client.fetch_by_id(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let client = CollectionClient::new(reqwest::Client::new(), DEFAULT_BASE_URL);
        assert!(matches!(
            client.fetch_page(0, 50).await,
            Err(FetchError::InvalidRequest(_))
        ));
        assert!(matches!(
            client.search_by_name("").await,
            Err(FetchError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
        assert_eq!(FetchError::HttpStatus(404).to_string(), "HTTP error: status 404");
        assert!(FetchError::Decode("missing field `data`".into())
            .to_string()
            .contains("missing field"));
    }
}
