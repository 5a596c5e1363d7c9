use std::time::Duration;

use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;

const YAHOO_BASE_API: &str = "https://query1.finance.yahoo.com";
const CHART_RANGE: &str = "1d";
const CHART_INTERVAL: &str = "5m";

/// Latest intraday snapshot for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub display_name: Option<String>,
    pub close: f64,
    pub day_open: f64,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// `Ok(None)` means the provider answered but has no history for today.
    async fn snapshot(&self, symbol: &str) -> Result<Option<PriceSnapshot>, Error>;
}

#[derive(Clone)]
pub struct PriceClient {
    client: Client,
    base_api: String,
}

impl PriceClient {
    pub fn new(base_api: String, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (compatible; market-monitor/0.1)"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_api })
    }

    /// Uses `PRICE_API_BASE_URL` when set, otherwise Yahoo Finance.
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let base_api =
            std::env::var("PRICE_API_BASE_URL").unwrap_or_else(|_| YAHOO_BASE_API.to_string());
        Self::new(base_api, timeout)
    }

    pub async fn fetch_chart(&self, symbol: &str) -> Result<ChartResult, Error> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_api.trim_end_matches('/'),
            symbol
        );

        let res: ChartResponse = self
            .client
            .get(url)
            .query(&[("range", CHART_RANGE), ("interval", CHART_INTERVAL)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = res.chart.error {
            bail!("chart error for {symbol}: {} {}", err.code, err.description);
        }

        match res.chart.result.and_then(|r| r.into_iter().next()) {
            Some(result) => Ok(result),
            None => bail!("empty chart result for {symbol}"),
        }
    }
}

#[async_trait]
impl PriceProvider for PriceClient {
    async fn snapshot(&self, symbol: &str) -> Result<Option<PriceSnapshot>, Error> {
        let chart = self.fetch_chart(symbol).await?;
        Ok(chart.snapshot())
    }
}

//
// Match Yahoo Finance chart JSON
// /v8/finance/chart/{symbol}?range=1d&interval=5m
//
#[derive(Debug, Deserialize, Clone)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartResult {
    pub meta: ChartMeta,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartMeta {
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,

    #[serde(rename = "longName")]
    pub long_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct QuoteSeries {
    #[serde(default)]
    pub open: Vec<Option<f64>>,

    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartResult {
    /// First non-null open and last non-null close of the day.
    pub fn snapshot(&self) -> Option<PriceSnapshot> {
        let series = self.indicators.quote.first()?;
        let day_open = series.open.iter().flatten().copied().next()?;
        let close = series.close.iter().rev().flatten().copied().next()?;

        Some(PriceSnapshot {
            display_name: self
                .meta
                .short_name
                .clone()
                .or_else(|| self.meta.long_name.clone()),
            close,
            day_open,
        })
    }
}
