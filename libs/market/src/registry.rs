use std::{collections::HashSet, fmt, path::Path, str::FromStr};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{MarketError, Result};

/// Wall-clock time of day, stored as minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct SessionTime(u16);

impl SessionTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn minute_of_day(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 60)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.0 % 60)
    }
}

impl FromStr for SessionTime {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MarketError::InvalidVenue(format!("malformed time of day '{s}'"));

        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;

        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SessionTime {
    type Error = MarketError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for SessionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Inclusive `[start, end]` window of local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: SessionTime,
    pub end: SessionTime,
}

impl TimeWindow {
    pub fn contains(&self, t: SessionTime) -> bool {
        self.start <= t && t <= self.end
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Venue {
    pub name: String,
    pub timezone: String,
    pub open: SessionTime,
    pub close: SessionTime,
    #[serde(default)]
    pub break_start: Option<SessionTime>,
    #[serde(default)]
    pub break_end: Option<SessionTime>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Venue {
    pub fn session(&self) -> TimeWindow {
        TimeWindow {
            start: self.open,
            end: self.close,
        }
    }

    pub fn lunch_break(&self) -> Option<TimeWindow> {
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) => Some(TimeWindow { start, end }),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MarketError::InvalidVenue("venue name is empty".into()));
        }
        if self.open > self.close {
            return Err(MarketError::InvalidVenue(format!(
                "{}: open {} is after close {}",
                self.name, self.open, self.close
            )));
        }
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) if start > end => Err(MarketError::InvalidVenue(format!(
                "{}: break start {} is after break end {}",
                self.name, start, end
            ))),
            (Some(_), None) | (None, Some(_)) => Err(MarketError::InvalidVenue(format!(
                "{}: break_start and break_end must be set together",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

/// Static catalog of venues, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct Registry {
    venues: Vec<Venue>,
}

impl Registry {
    pub fn new(venues: Vec<Venue>) -> Result<Self> {
        let mut seen = HashSet::new();
        for venue in &venues {
            venue.validate()?;
            if !seen.insert(venue.name.as_str()) {
                return Err(MarketError::InvalidVenue(format!(
                    "duplicate venue name '{}'",
                    venue.name
                )));
            }
        }

        Ok(Self { venues })
    }

    /// The built-in US, Malaysia and Dhaka venues.
    pub fn reference() -> Self {
        Self {
            venues: reference_venues(),
        }
    }

    /// Reference venues followed by the venues listed in a JSON file.
    pub fn with_additional_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let extra: Vec<Venue> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), count = extra.len(), "loaded additional venues");

        let mut venues = reference_venues();
        venues.extend(extra);
        Self::new(venues)
    }

    /// Reads `MARKETS_FILE` when set, otherwise the reference registry.
    pub fn from_env() -> Result<Self> {
        match std::env::var("MARKETS_FILE") {
            Ok(path) if !path.trim().is_empty() => Self::with_additional_file(path.trim()),
            _ => {
                debug!("MARKETS_FILE not set, using reference venues");
                Ok(Self::reference())
            }
        }
    }

    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    pub fn get(&self, name: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<&Venue> {
        self.get(name)
            .ok_or_else(|| MarketError::UnknownVenue(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.venues.iter().map(|v| v.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Every tracked symbol, in registry order.
    pub fn all_symbols(&self) -> Vec<String> {
        self.venues
            .iter()
            .flat_map(|v| v.symbols.iter().cloned())
            .collect()
    }
}

fn hm(hour: u32, minute: u32) -> SessionTime {
    SessionTime((hour * 60 + minute) as u16)
}

fn reference_venues() -> Vec<Venue> {
    vec![
        Venue {
            name: "🇺🇸 US (NYSE)".to_string(),
            timezone: "America/New_York".to_string(),
            open: hm(9, 30),
            close: hm(16, 0),
            break_start: None,
            break_end: None,
            symbols: vec!["^GSPC".into(), "^DJI".into(), "^IXIC".into()],
            currency: "USD".to_string(),
        },
        Venue {
            name: "🇲🇾 Malaysia (Bursa)".to_string(),
            timezone: "Asia/Kuala_Lumpur".to_string(),
            open: hm(9, 0),
            close: hm(17, 0),
            break_start: Some(hm(12, 30)),
            break_end: Some(hm(14, 30)),
            symbols: vec!["^KLSE".into()],
            currency: "MYR".to_string(),
        },
        Venue {
            name: "🇧🇩 Dhaka (DSE)".to_string(),
            timezone: "Asia/Dhaka".to_string(),
            open: hm(10, 0),
            close: hm(14, 30),
            break_start: None,
            break_end: None,
            symbols: vec!["DSE".into()],
            currency: "BDT".to_string(),
        },
    ]
}
