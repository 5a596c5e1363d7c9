use std::collections::BTreeSet;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::{
    error::{MarketError, Result},
    status::parse_timezone,
};

pub fn default_news_keywords() -> Vec<String> {
    ["stock market", "trading", "finance", "economy"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub id: String,
    pub timezone: Option<String>,
    pub notifications_enabled: bool,
    pub tracked_venues: BTreeSet<String>,
    pub news_keywords: Vec<String>,
}

/// Values a subscriber starts with on first contact.
#[derive(Debug, Clone)]
pub struct PreferenceDefaults {
    pub notifications_enabled: bool,
    pub tracked_venues: BTreeSet<String>,
    pub news_keywords: Vec<String>,
}

impl PreferenceDefaults {
    pub fn new(tracked_venues: impl IntoIterator<Item = String>) -> Self {
        Self {
            notifications_enabled: true,
            tracked_venues: tracked_venues.into_iter().collect(),
            news_keywords: default_news_keywords(),
        }
    }

    fn subscriber(&self, id: &str) -> Subscriber {
        Subscriber {
            id: id.to_string(),
            timezone: None,
            notifications_enabled: self.notifications_enabled,
            tracked_venues: self.tracked_venues.clone(),
            news_keywords: self.news_keywords.clone(),
        }
    }
}

/// In-memory subscriber preferences shared by the command handlers and the
/// alert scanner. Each mutation holds the entry lock for its subscriber only.
pub struct PreferenceStore {
    defaults: PreferenceDefaults,
    subscribers: DashMap<String, Subscriber>,
}

impl PreferenceStore {
    pub fn new(defaults: PreferenceDefaults) -> Self {
        Self {
            defaults,
            subscribers: DashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Subscriber> {
        self.subscribers.get(id).map(|s| s.value().clone())
    }

    pub fn get_or_create(&self, id: &str) -> Subscriber {
        self.update(id, |s| s.clone())
    }

    pub fn set_timezone(&self, id: &str, timezone: &str) -> Result<Subscriber> {
        let timezone = timezone.trim();
        parse_timezone(timezone)?;

        let updated = self.update(id, |s| {
            s.timezone = Some(timezone.to_string());
            s.clone()
        });
        info!(subscriber = id, timezone, "timezone updated");
        Ok(updated)
    }

    /// Flips the notification flag and returns the new value.
    pub fn toggle_notifications(&self, id: &str) -> bool {
        let enabled = self.update(id, |s| {
            s.notifications_enabled = !s.notifications_enabled;
            s.notifications_enabled
        });
        info!(subscriber = id, enabled, "notifications toggled");
        enabled
    }

    pub fn set_news_keywords(&self, id: &str, keywords: Vec<String>) -> Result<Subscriber> {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(MarketError::InvalidInput(
                "at least one news keyword is required".into(),
            ));
        }

        Ok(self.update(id, |s| {
            s.news_keywords = keywords;
            s.clone()
        }))
    }

    pub fn set_tracked_venues(
        &self,
        id: &str,
        venues: impl IntoIterator<Item = String>,
    ) -> Result<Subscriber> {
        let venues: BTreeSet<String> = venues.into_iter().collect();
        if venues.is_empty() {
            return Err(MarketError::InvalidInput(
                "at least one market must be tracked".into(),
            ));
        }

        Ok(self.update(id, |s| {
            s.tracked_venues = venues;
            s.clone()
        }))
    }

    /// Snapshot of subscribers with notifications on.
    pub fn enabled_subscribers(&self) -> Vec<Subscriber> {
        self.subscribers
            .iter()
            .filter(|s| s.notifications_enabled)
            .map(|s| s.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn update<T>(&self, id: &str, f: impl FnOnce(&mut Subscriber) -> T) -> T {
        let mut entry = self
            .subscribers
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(subscriber = id, "creating subscriber with defaults");
                self.defaults.subscriber(id)
            });
        f(entry.value_mut())
    }
}
