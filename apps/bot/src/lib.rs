use std::sync::Arc;

use market::{NewsFetcher, PreferenceStore, QuoteFetcher, Registry, TimezoneLocator};

pub mod command;
pub mod config;
pub mod delivery;

pub struct Data {
    pub registry: Arc<Registry>,
    pub quotes: Arc<QuoteFetcher>,
    pub news: Arc<NewsFetcher>,
    pub preferences: Arc<PreferenceStore>,
    pub locator: Arc<dyn TimezoneLocator>,
    /// Viewer timezone for subscribers without an override.
    pub default_timezone: String,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;
