use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;

use crate::document::Document;
use crate::error::FetchError;

/// Served when the upstream response carries no content-type.
pub const FALLBACK_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

fn build_user_agent() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers
}

/// Client shared by the feed fetcher and the translator.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder().default_headers(build_user_agent()).build()
}

#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl FetchedFeed {
    pub fn document(&self) -> Result<Document, FetchError> {
        Ok(Document::parse(&self.body)?)
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed, FetchError> {
        tracing::debug!("Fetching feed from: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let body = response.bytes().await?.to_vec();

        tracing::debug!("Fetched {} bytes ({}) from {}", body.len(), content_type, url);
        Ok(FetchedFeed { body, content_type })
    }
}
