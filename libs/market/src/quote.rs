use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use crate::price_client::{PriceProvider, PriceSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub display_name: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
}

impl Quote {
    pub fn unavailable(symbol: &str, display_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            display_name: display_name.into(),
            price: None,
            change: None,
            change_percent: None,
        }
    }

    /// Change is measured against the day's opening price.
    pub fn from_snapshot(symbol: &str, snap: PriceSnapshot) -> Self {
        let change = snap.close - snap.day_open;
        let change_percent = if snap.day_open != 0.0 {
            Some(change / snap.day_open * 100.0)
        } else {
            None
        };

        Self {
            symbol: symbol.to_string(),
            display_name: snap.display_name.unwrap_or_else(|| symbol.to_string()),
            price: Some(snap.close),
            change: Some(change),
            change_percent,
        }
    }

    pub fn is_available(&self) -> bool {
        self.price.is_some()
    }
}

/// Symbols for which no live provider exists.
pub fn default_offline_symbols() -> HashMap<String, String> {
    HashMap::from([("DSE".to_string(), "DSE Index".to_string())])
}

pub struct QuoteFetcher {
    provider: Arc<dyn PriceProvider>,
    timeout: Duration,
    offline: HashMap<String, String>,
}

impl QuoteFetcher {
    pub fn new(provider: Arc<dyn PriceProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            offline: default_offline_symbols(),
        }
    }

    /// One entry per distinct requested symbol, always.
    #[instrument(name = "fetch_quotes", skip(self, symbols), fields(count = symbols.len()))]
    pub async fn fetch(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = symbols.iter().filter(|s| seen.insert(s.as_str())).collect();

        let quotes = join_all(unique.into_iter().map(|s| self.fetch_one(s))).await;

        quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect()
    }

    pub async fn fetch_one(&self, symbol: &str) -> Quote {
        if let Some(name) = self.offline.get(symbol) {
            debug!(symbol, "offline symbol, skipping provider");
            return Quote::unavailable(symbol, name.clone());
        }

        match tokio::time::timeout(self.timeout, self.provider.snapshot(symbol)).await {
            Ok(Ok(Some(snap))) => Quote::from_snapshot(symbol, snap),
            Ok(Ok(None)) => {
                debug!(symbol, "provider returned no history");
                Quote::unavailable(symbol, symbol)
            }
            Ok(Err(e)) => {
                warn!(symbol, error = ?e, "price provider failed");
                Quote::unavailable(symbol, symbol)
            }
            Err(_) => {
                warn!(symbol, timeout = ?self.timeout, "price provider timed out");
                Quote::unavailable(symbol, symbol)
            }
        }
    }
}
