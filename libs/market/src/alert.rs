use std::{collections::HashMap, sync::Arc};

use anyhow::{Error, Result};
use futures_util::{StreamExt, stream};
use tracing::{debug, info, instrument, warn};
use tracing_futures::Instrument;

use crate::{
    delivery::Delivery,
    format::format_percent,
    preferences::{PreferenceStore, Subscriber},
    quote::{Quote, QuoteFetcher},
    registry::Registry,
};

pub const ALERT_HEADER: &str = "🚨 **Market Alert**";

#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Absolute percentage move that must be exceeded.
    pub threshold_percent: f64,
    pub max_lines: usize,
    /// Subscribers processed at once.
    pub concurrency: usize,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            threshold_percent: 2.0,
            max_lines: 5,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertLine {
    pub symbol: String,
    pub display_name: String,
    pub change_percent: f64,
}

impl AlertLine {
    pub fn render(&self) -> String {
        let marker = if self.change_percent > 0.0 { "🚀" } else { "📉" };
        format!(
            "{marker} {}: {}",
            self.display_name,
            format_percent(self.change_percent)
        )
    }
}

/// Symbols of the subscriber's tracked venues in registry order. Names that
/// are no longer in the registry are skipped.
pub fn tracked_symbols(registry: &Registry, subscriber: &Subscriber) -> Vec<String> {
    for name in &subscriber.tracked_venues {
        if let Err(e) = registry.lookup(name) {
            debug!(subscriber = %subscriber.id, error = %e, "skipping venue");
        }
    }

    registry
        .venues()
        .iter()
        .filter(|v| subscriber.tracked_venues.contains(&v.name))
        .flat_map(|v| v.symbols.iter().cloned())
        .collect()
}

/// One line per symbol whose move strictly exceeds `threshold_percent`.
pub fn detect_moves(
    symbols: &[String],
    quotes: &HashMap<String, Quote>,
    threshold_percent: f64,
) -> Vec<AlertLine> {
    symbols
        .iter()
        .filter_map(|s| quotes.get(s))
        .filter_map(|q| {
            let pct = q.change_percent?;
            (pct.abs() > threshold_percent).then(|| AlertLine {
                symbol: q.symbol.clone(),
                display_name: q.display_name.clone(),
                change_percent: pct,
            })
        })
        .collect()
}

pub fn compose_alert(lines: &[AlertLine], max_lines: usize) -> Option<String> {
    if lines.is_empty() {
        return None;
    }

    let body: Vec<String> = lines.iter().take(max_lines).map(AlertLine::render).collect();
    Some(format!("{ALERT_HEADER}\n\n{}", body.join("\n")))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub subscribers: usize,
    pub alerted: usize,
    pub quiet: usize,
    pub failures: usize,
}

enum Outcome {
    Quiet,
    Alerted(usize),
}

pub struct AlertScanner {
    registry: Arc<Registry>,
    quotes: Arc<QuoteFetcher>,
    store: Arc<PreferenceStore>,
    delivery: Arc<dyn Delivery>,
    settings: AlertSettings,
}

impl AlertScanner {
    pub fn new(
        registry: Arc<Registry>,
        quotes: Arc<QuoteFetcher>,
        store: Arc<PreferenceStore>,
        delivery: Arc<dyn Delivery>,
        settings: AlertSettings,
    ) -> Self {
        Self {
            registry,
            quotes,
            store,
            delivery,
            settings,
        }
    }

    /// Checks every notification-enabled subscriber once.
    #[instrument(name = "alert_scan", skip(self))]
    pub async fn scan(&self) -> ScanSummary {
        let subscribers = self.store.enabled_subscribers();
        info!(total_subscribers = subscribers.len(), "starting alert scan");

        let mut tasks = stream::iter(subscribers)
            .map(|subscriber| {
                let span = tracing::info_span!("alert_subscriber", subscriber = %subscriber.id);
                async move { self.scan_subscriber(&subscriber).await }.instrument(span)
            })
            .buffer_unordered(self.settings.concurrency.max(1));

        let mut summary = ScanSummary::default();

        while let Some(res) = tasks.next().await {
            summary.subscribers += 1;

            match res {
                Ok(Outcome::Alerted(lines)) => {
                    summary.alerted += 1;
                    debug!(lines, "alert delivered");
                }
                Ok(Outcome::Quiet) => summary.quiet += 1,
                Err(e) => {
                    summary.failures += 1;
                    warn!(error = ?e, "alert delivery failed");
                }
            }
        }

        info!(
            subscribers = summary.subscribers,
            alerted = summary.alerted,
            failures = summary.failures,
            "completed alert scan"
        );
        summary
    }

    async fn scan_subscriber(&self, subscriber: &Subscriber) -> Result<Outcome, Error> {
        let symbols = tracked_symbols(&self.registry, subscriber);
        if symbols.is_empty() {
            debug!("no tracked symbols");
            return Ok(Outcome::Quiet);
        }

        let quotes = self.quotes.fetch(&symbols).await;
        let lines = detect_moves(&symbols, &quotes, self.settings.threshold_percent);

        let Some(message) = compose_alert(&lines, self.settings.max_lines) else {
            debug!("no moves above threshold");
            return Ok(Outcome::Quiet);
        };

        self.delivery.send(&subscriber.id, &message).await?;

        Ok(Outcome::Alerted(lines.len().min(self.settings.max_lines)))
    }
}
