//! HTTP fetching for pages and the images they reference.
//!
//! One [`Fetcher`] (and so one connection pool) is built per batch. Every
//! request is a single attempt: failures are reported, never retried.

use crate::config::ConversionConfig;
use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use std::time::Duration;
use tracing::{debug, info};

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";

/// Thin wrapper over a configured `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_image_bytes: u64,
}

impl Fetcher {
    pub fn new(config: &ConversionConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            max_image_bytes: config.max_image_bytes,
        })
    }

    /// Download a page and decode its body as text.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching page: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, PAGE_ACCEPT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, self.timeout_secs, e))?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.timeout_secs, e))?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Download an image referenced by `referer`, refusing bodies larger
    /// than the configured limit.
    pub async fn fetch_image(&self, url: &str, referer: &str) -> Result<Vec<u8>, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));
        if let Ok(v) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, v);
        }

        let mut response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, self.timeout_secs, e))?;

        let too_large = || FetchError::ImageTooLarge {
            url: url.to_string(),
            limit: self.max_image_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_image_bytes)
        {
            return Err(too_large());
        }

        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.timeout_secs, e))?
        {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_image_bytes {
                return Err(too_large());
            }
        }

        debug!("Fetched image {} ({} bytes)", url, data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_image_bytes: u64) -> Fetcher {
        let config = ConversionConfig::builder()
            .timeout_secs(5)
            .max_image_bytes(max_image_bytes)
            .build()
            .unwrap();
        Fetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn fetch_page_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
            .mount(&server)
            .await;

        let body = fetcher(1024)
            .fetch_page(&format!("{}/page1", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<p>hello</p>");
    }

    #[tokio::test]
    async fn fetch_page_non_2xx_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher(1024)
            .fetch_page(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, FetchError::HttpStatus { status: 404, .. }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn fetch_page_invalid_url_is_request_error() {
        let err = fetcher(1024).fetch_page("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn fetch_image_sends_referer_and_respects_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/small.png"))
            .and(header("referer", "http://a.example/page"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 16]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/big.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let f = fetcher(1024);
        let small = f
            .fetch_image(&format!("{}/small.png", server.uri()), "http://a.example/page")
            .await
            .unwrap();
        assert_eq!(small.len(), 16);

        let err = f
            .fetch_image(&format!("{}/big.png", server.uri()), "http://a.example/page")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ImageTooLarge { limit: 1024, .. }));
    }
}
