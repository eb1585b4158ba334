use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use url::Url;

use crate::app::Result;
use crate::config::SourceConfig;
use crate::fetcher::{FetchError, Fetcher};

pub struct HttpFetcher {
    client: Client,
    listing_url: String,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(source.user_agent.as_str())
            .build()?;

        let token = source
            .token
            .clone()
            .or_else(|| std::env::var("POSTDECK_TOKEN").ok())
            .filter(|t| !t.trim().is_empty());

        Ok(Self {
            client,
            listing_url: listing_url(source),
            token,
        })
    }

    fn listing_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }
}

/// Contents API URL for the configured owner/repo/path triple.
pub fn listing_url(source: &SourceConfig) -> String {
    let base = source.api_base.trim_end_matches('/');
    let path = source.path.trim_matches('/');
    let mut url = format!(
        "{}/repos/{}/{}/contents/{}",
        base, source.owner, source.repo, path
    );
    if let Some(branch) = source.branch.as_deref().filter(|b| !b.is_empty()) {
        url.push_str("?ref=");
        url.push_str(branch);
    }
    url
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_listing(&self) -> std::result::Result<Vec<u8>, FetchError> {
        let url = Url::parse(&self.listing_url)
            .map_err(|e| FetchError::List(format!("invalid listing URL {}: {}", self.listing_url, e)))?;

        let response = self
            .client
            .get(url)
            .headers(self.listing_headers())
            .send()
            .await
            .map_err(|e| FetchError::List(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::List(format!(
                "{} returned {}",
                self.listing_url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::List(e.to_string()))?;

        Ok(body.to_vec())
    }

    async fn fetch_document(&self, url: &str) -> std::result::Result<String, FetchError> {
        let download = |cause: String| FetchError::Download {
            name: url.to_string(),
            cause,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download(e.to_string()))?;

        response
            .error_for_status_ref()
            .map_err(|e| download(e.to_string()))?;

        response.text().await.map_err(|e| download(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url_from_defaults() {
        let source = SourceConfig::default();
        let url = listing_url(&source);
        assert!(url.starts_with("https://api.github.com/repos/"));
        assert!(url.contains("/contents/"));
        assert!(!url.contains("?ref="));
    }

    #[test]
    fn test_listing_url_trims_slashes_and_adds_ref() {
        let source = SourceConfig {
            api_base: "https://api.example.com/".into(),
            owner: "acme".into(),
            repo: "site".into(),
            path: "/content/blog/".into(),
            branch: Some("main".into()),
            ..SourceConfig::default()
        };
        assert_eq!(
            listing_url(&source),
            "https://api.example.com/repos/acme/site/contents/content/blog?ref=main"
        );
    }

    #[test]
    fn test_new_builds_client() {
        let fetcher = HttpFetcher::new(&SourceConfig::default());
        assert!(fetcher.is_ok());
    }
}
