use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Error, anyhow};
use async_trait::async_trait;
use market::{
    AlertScanner, AlertSettings, Delivery, PreferenceDefaults, PreferenceStore, PriceProvider,
    PriceSnapshot, QuoteFetcher, Registry, Venue,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    layer::{Context, Layer, SubscriberExt},
    registry,
};

/// Serves a fixed percentage move per symbol off a day open of 100.
struct Moves {
    pct: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl Moves {
    fn new(entries: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            pct: entries.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PriceProvider for Moves {
    async fn snapshot(&self, symbol: &str) -> Result<Option<PriceSnapshot>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pct.get(symbol) {
            Some(p) => Ok(Some(PriceSnapshot {
                display_name: Some(format!("{symbol} Index")),
                close: 100.0 + p,
                day_open: 100.0,
            })),
            None => Err(anyhow!("no data for {symbol}")),
        }
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(String, String)>>,
    fail_for: Option<String>,
}

#[async_trait]
impl Delivery for Outbox {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), Error> {
        if self.fail_for.as_deref() == Some(subscriber_id) {
            return Err(anyhow!("recipient blocked the bot"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscriber_id.to_string(), text.to_string()));
        Ok(())
    }
}

impl Outbox {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

fn venue(name: &str, symbols: &[&str]) -> Venue {
    serde_json::from_value(serde_json::json!({
        "name": name,
        "timezone": "America/New_York",
        "open": "09:30",
        "close": "16:00",
        "symbols": symbols,
        "currency": "USD",
    }))
    .unwrap()
}

struct Harness {
    store: Arc<PreferenceStore>,
    outbox: Arc<Outbox>,
    provider: Arc<Moves>,
    scanner: AlertScanner,
}

fn harness(venues: Vec<Venue>, moves: &[(&str, f64)], outbox: Outbox) -> Harness {
    let registry = Arc::new(Registry::new(venues).unwrap());
    let store = Arc::new(PreferenceStore::new(PreferenceDefaults::new(registry.names())));
    let provider = Moves::new(moves);
    let quotes = Arc::new(QuoteFetcher::new(provider.clone(), Duration::from_secs(1)));
    let outbox = Arc::new(outbox);

    let scanner = AlertScanner::new(
        registry,
        quotes,
        store.clone(),
        outbox.clone(),
        AlertSettings::default(),
    );

    Harness {
        store,
        outbox,
        provider,
        scanner,
    }
}

#[tokio::test]
async fn move_above_threshold_sends_one_line() {
    let h = harness(vec![venue("NYSE", &["^GSPC"])], &[("^GSPC", 2.5)], Outbox::default());
    h.store.get_or_create("alice");

    let summary = h.scanner.scan().await;

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "alice");
    assert!(sent[0].1.contains("🚀 ^GSPC Index: +2.50%"));
    assert_eq!(sent[0].1.lines().filter(|l| l.starts_with("🚀")).count(), 1);
    assert_eq!(summary.alerted, 1);
    assert_eq!(summary.failures, 0);
}

#[tokio::test]
async fn small_move_sends_nothing() {
    let h = harness(vec![venue("NYSE", &["^GSPC"])], &[("^GSPC", 1.0)], Outbox::default());
    h.store.get_or_create("alice");

    let summary = h.scanner.scan().await;

    assert!(h.outbox.sent().is_empty());
    assert_eq!(summary.quiet, 1);
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn muted_subscribers_are_not_scanned() {
    let h = harness(vec![venue("NYSE", &["^GSPC"])], &[("^GSPC", -5.0)], Outbox::default());
    h.store.get_or_create("muted");
    h.store.toggle_notifications("muted");

    let summary = h.scanner.scan().await;

    assert_eq!(summary.subscribers, 0);
    assert!(h.outbox.sent().is_empty());
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delivery_failure_does_not_stop_the_scan() {
    let outbox = Outbox {
        fail_for: Some("blocked".to_string()),
        ..Default::default()
    };
    let h = harness(vec![venue("NYSE", &["^GSPC"])], &[("^GSPC", -3.0)], outbox);
    for id in ["blocked", "bob", "carol"] {
        h.store.get_or_create(id);
    }

    let summary = h.scanner.scan().await;

    let mut recipients: Vec<String> = h.outbox.sent().into_iter().map(|(id, _)| id).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["bob", "carol"]);
    assert_eq!(summary.subscribers, 3);
    assert_eq!(summary.alerted, 2);
    assert_eq!(summary.failures, 1);
}

/// Counts WARN and ERROR events.
struct Diagnostics(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for Diagnostics {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() <= Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn failed_delivery_is_reported_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let _guard = tracing::subscriber::set_default(registry().with(Diagnostics(count.clone())));

    let outbox = Outbox {
        fail_for: Some("blocked".to_string()),
        ..Default::default()
    };
    let h = harness(vec![venue("NYSE", &["^GSPC"])], &[("^GSPC", 3.0)], outbox);
    h.store.get_or_create("blocked");

    let summary = h.scanner.scan().await;

    assert_eq!(summary.failures, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_errors_degrade_to_no_alert() {
    let h = harness(
        vec![venue("NYSE", &["^GSPC", "^BROKEN"])],
        &[("^GSPC", 4.0)],
        Outbox::default(),
    );
    h.store.get_or_create("alice");

    h.scanner.scan().await;

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("^GSPC"));
    assert!(!sent[0].1.contains("^BROKEN"));
}

#[tokio::test]
async fn only_tracked_venues_are_polled() {
    let h = harness(
        vec![venue("NYSE", &["^GSPC"]), venue("Bursa", &["^KLSE"])],
        &[("^GSPC", 3.0), ("^KLSE", -3.0)],
        Outbox::default(),
    );
    h.store
        .set_tracked_venues("alice", ["Bursa".to_string(), "Delisted".to_string()])
        .unwrap();

    h.scanner.scan().await;

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("📉 ^KLSE Index: -3.00%"));
    assert!(!sent[0].1.contains("^GSPC"));
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn alert_is_capped_at_five_lines() {
    let symbols = ["A", "B", "C", "D", "E", "F", "G"];
    let moves: Vec<(&str, f64)> = symbols.iter().map(|s| (*s, 6.0)).collect();
    let h = harness(vec![venue("Big", &symbols)], &moves, Outbox::default());
    h.store.get_or_create("alice");

    h.scanner.scan().await;

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.lines().filter(|l| l.starts_with("🚀")).count(), 5);
}

#[tokio::test]
async fn offline_symbol_is_never_requested() {
    let h = harness(vec![venue("Dhaka", &["DSE"])], &[], Outbox::default());
    h.store.get_or_create("alice");

    let summary = h.scanner.scan().await;

    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.quiet, 1);
}
