use std::time::Duration;

use anyhow::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::status::parse_timezone;

const TIME_API_BASE: &str = "https://timeapi.io";

/// Translates coordinates into an IANA timezone identifier.
#[async_trait]
pub trait TimezoneLocator: Send + Sync {
    async fn timezone_at(&self, latitude: f64, longitude: f64) -> Result<Option<String>, Error>;
}

#[derive(Clone)]
pub struct TimeApiLocator {
    client: Client,
    base_api: String,
}

impl TimeApiLocator {
    pub fn new(base_api: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_api })
    }

    pub fn from_env(timeout: Duration) -> Result<Self> {
        let base_api =
            std::env::var("TIMEZONE_API_BASE_URL").unwrap_or_else(|_| TIME_API_BASE.to_string());
        Self::new(base_api, timeout)
    }
}

#[derive(Debug, Deserialize)]
struct CoordinateResponse {
    #[serde(rename = "timeZone")]
    time_zone: Option<String>,
}

#[async_trait]
impl TimezoneLocator for TimeApiLocator {
    async fn timezone_at(&self, latitude: f64, longitude: f64) -> Result<Option<String>, Error> {
        let url = format!(
            "{}/api/TimeZone/coordinate",
            self.base_api.trim_end_matches('/')
        );

        let res: CoordinateResponse = self
            .client
            .get(url)
            .query(&[("latitude", latitude), ("longitude", longitude)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(res.time_zone)
    }
}

/// Resolves coordinates to a timezone the rest of the system accepts.
/// Lookup failures and unrecognised identifiers both come back as `None`.
pub async fn locate_timezone(
    locator: &dyn TimezoneLocator,
    latitude: f64,
    longitude: f64,
) -> Option<String> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        debug!(latitude, longitude, "coordinates out of range");
        return None;
    }

    match locator.timezone_at(latitude, longitude).await {
        Ok(Some(tz)) if parse_timezone(&tz).is_ok() => Some(tz),
        Ok(Some(tz)) => {
            warn!(timezone = %tz, "locator returned unknown timezone");
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = ?e, latitude, longitude, "timezone lookup failed");
            None
        }
    }
}
