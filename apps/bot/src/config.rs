use std::{env::var, str::FromStr, time::Duration};

use market::preferences::default_news_keywords;
use tracing::warn;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub version: String,
    pub alert_threshold_percent: f64,
    pub alert_interval: Duration,
    pub request_timeout: Duration,
    pub default_news_keywords: Vec<String>,
    pub default_notifications_enabled: bool,
    pub default_timezone: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            discord_token: var("DISCORD_TOKEN").expect("DISCORD_TOKEN not set"),
            version: var("APP_VERSION").unwrap_or_else(|_| "Unknown".to_string()),
            alert_threshold_percent: parsed("ALERT_THRESHOLD_PERCENT", 2.0),
            alert_interval: Duration::from_secs(60 * parsed("ALERT_INTERVAL_MINUTES", 30u64).max(1)),
            request_timeout: Duration::from_secs(parsed("REQUEST_TIMEOUT_SECONDS", 10u64).max(1)),
            default_news_keywords: var("DEFAULT_NEWS_KEYWORDS")
                .ok()
                .and_then(|raw| non_empty(split_keywords(&raw)))
                .unwrap_or_else(default_news_keywords),
            default_notifications_enabled: var("DEFAULT_NOTIFICATIONS_ENABLED")
                .ok()
                .and_then(|raw| parse_bool(&raw))
                .unwrap_or(true),
            default_timezone: var("DEFAULT_TIMEZONE")
                .ok()
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or_else(|| "UTC".to_string()),
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, "unparsable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Comma-separated list, blanks dropped.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(v: Vec<String>) -> Option<Vec<String>> {
    if v.is_empty() { None } else { Some(v) }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
