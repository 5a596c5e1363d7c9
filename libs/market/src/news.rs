use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::MarketError;

const NEWS_API_BASE: &str = "https://newsapi.org";
const PLACEHOLDER_KEY: &str = "YOUR_NEWS_API_KEY";

/// Most articles handed back to a caller.
pub const MAX_ARTICLES: usize = 5;

/// Most articles requested from the provider per query.
pub const PROVIDER_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Runs `query` and returns the provider's results, newest first.
    async fn search(&self, query: &str, page_size: usize) -> Result<Vec<NewsArticle>, Error>;
}

/// Stand-in used when no news API key is configured.
pub struct Unconfigured;

#[async_trait]
impl NewsProvider for Unconfigured {
    async fn search(&self, _query: &str, _page_size: usize) -> Result<Vec<NewsArticle>, Error> {
        Err(MarketError::ProviderUnavailable("news provider not configured".into()).into())
    }
}

#[derive(Clone)]
pub struct NewsApiClient {
    client: Client,
    base_api: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(base_api: String, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() || api_key == PLACEHOLDER_KEY {
            bail!(MarketError::ProviderUnavailable(
                "news api key is missing".into()
            ));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_api,
            api_key,
        })
    }

    /// Expects NEWS_API_KEY; NEWS_API_BASE_URL is optional.
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("NEWS_API_KEY")?;
        let base_api =
            std::env::var("NEWS_API_BASE_URL").unwrap_or_else(|_| NEWS_API_BASE.to_string());
        Self::new(base_api, api_key, timeout)
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn search(&self, query: &str, page_size: usize) -> Result<Vec<NewsArticle>, Error> {
        let url = format!("{}/v2/everything", self.base_api.trim_end_matches('/'));
        let page_size = page_size.to_string();

        let res: EverythingResponse = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if res.status != "ok" {
            bail!(
                "news api returned status {}: {}",
                res.status,
                res.message.unwrap_or_default()
            );
        }

        Ok(res.articles.into_iter().map(NewsArticle::from).collect())
    }
}

//
// Match NewsAPI JSON
// https://newsapi.org/docs/endpoints/everything
//
#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<RawSource>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl From<RawArticle> for NewsArticle {
    fn from(raw: RawArticle) -> Self {
        Self {
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            source: raw.source.and_then(|s| s.name).unwrap_or_default(),
            published_at: raw.published_at.unwrap_or_default(),
        }
    }
}

pub struct NewsFetcher {
    provider: Arc<dyn NewsProvider>,
    timeout: Duration,
}

impl NewsFetcher {
    pub fn new(provider: Arc<dyn NewsProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// At most [`MAX_ARTICLES`] articles; empty on any provider failure.
    #[instrument(name = "fetch_news", skip(self))]
    pub async fn fetch(&self, keywords: &[String]) -> Vec<NewsArticle> {
        let query = build_query(keywords);
        if query.is_empty() {
            debug!("no keywords, skipping news query");
            return Vec::new();
        }

        match tokio::time::timeout(
            self.timeout,
            self.provider.search(&query, PROVIDER_PAGE_SIZE),
        )
        .await
        {
            Ok(Ok(mut articles)) => {
                articles.truncate(MAX_ARTICLES);
                debug!(count = articles.len(), "fetched news");
                articles
            }
            Ok(Err(e)) => {
                warn!(error = ?e, "news provider failed");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "news provider timed out");
                Vec::new()
            }
        }
    }
}

/// Keywords joined with a logical OR, blanks dropped.
pub fn build_query(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(" OR ")
}
