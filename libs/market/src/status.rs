use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::{
    error::{MarketError, Result},
    registry::{SessionTime, Venue},
};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketState {
    Open,
    ClosedWeekend,
    ClosedBreak,
    ClosedHours,
    Error,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketState::Open => "OPEN",
            MarketState::ClosedWeekend => "CLOSED_WEEKEND",
            MarketState::ClosedBreak => "CLOSED_BREAK",
            MarketState::ClosedHours => "CLOSED_HOURS",
            MarketState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub venue_name: String,
    pub local_time: String,
    pub display_time: String,
    pub state: MarketState,
    pub is_open: bool,
    pub currency: String,
    pub closes_at: Option<SessionTime>,
}

impl StatusRecord {
    fn error(venue: &Venue) -> Self {
        Self {
            venue_name: venue.name.clone(),
            local_time: NOT_AVAILABLE.to_string(),
            display_time: NOT_AVAILABLE.to_string(),
            state: MarketState::Error,
            is_open: false,
            currency: venue.currency.clone(),
            closes_at: None,
        }
    }

    /// Human-readable state, e.g. `🟢 OPEN (Closes at 16:00)`.
    pub fn label(&self) -> String {
        match self.state {
            MarketState::Open => match self.closes_at {
                Some(close) => format!("🟢 OPEN (Closes at {close})"),
                None => "🟢 OPEN".to_string(),
            },
            MarketState::ClosedWeekend => "🔴 CLOSED (Weekend)".to_string(),
            MarketState::ClosedBreak => "🟡 LUNCH BREAK".to_string(),
            MarketState::ClosedHours => "🔴 CLOSED".to_string(),
            MarketState::Error => "❌ ERROR".to_string(),
        }
    }
}

pub fn parse_timezone(id: &str) -> Result<Tz> {
    id.parse::<Tz>()
        .map_err(|_| MarketError::InvalidTimezone(id.to_string()))
}

/// Computes the trading state of `venue` at `now`.
///
/// Never fails: a venue whose definition cannot be evaluated comes back as an
/// [`MarketState::Error`] record. When `viewer_timezone` names a zone other
/// than the venue's, the viewer's wall-clock time is appended to
/// `display_time`; an unusable viewer zone is ignored.
pub fn evaluate(venue: &Venue, now: DateTime<Utc>, viewer_timezone: Option<&str>) -> StatusRecord {
    match try_evaluate(venue, now, viewer_timezone) {
        Ok(record) => record,
        Err(e) => {
            warn!(venue = %venue.name, error = %e, "status evaluation failed");
            StatusRecord::error(venue)
        }
    }
}

/// Evaluates every venue independently.
pub fn evaluate_all<'a>(
    venues: impl IntoIterator<Item = &'a Venue>,
    now: DateTime<Utc>,
    viewer_timezone: Option<&str>,
) -> Vec<StatusRecord> {
    venues
        .into_iter()
        .map(|v| evaluate(v, now, viewer_timezone))
        .collect()
}

fn try_evaluate(
    venue: &Venue,
    now: DateTime<Utc>,
    viewer_timezone: Option<&str>,
) -> Result<StatusRecord> {
    let tz = venue
        .timezone
        .parse::<Tz>()
        .map_err(|_| MarketError::Evaluation(format!("unknown timezone '{}'", venue.timezone)))?;

    let local = now.with_timezone(&tz);
    let clock = SessionTime::new(local.hour(), local.minute())
        .ok_or_else(|| MarketError::Evaluation(format!("bad local time {local}")))?;
    let local_time = clock.to_string();

    // Monday = 0 .. Sunday = 6
    let weekday = local.weekday().num_days_from_monday();

    let (state, closes_at) = if weekday >= 5 {
        (MarketState::ClosedWeekend, None)
    } else if venue.lunch_break().is_some_and(|w| w.contains(clock)) {
        (MarketState::ClosedBreak, None)
    } else if venue.session().contains(clock) {
        (MarketState::Open, Some(venue.close))
    } else {
        (MarketState::ClosedHours, None)
    };

    let display_time = match viewer_timezone {
        Some(viewer) if viewer != venue.timezone => match viewer.parse::<Tz>() {
            Ok(viewer_tz) => {
                let theirs = local.with_timezone(&viewer_tz);
                format!("{local_time} ({} your time)", theirs.format("%H:%M"))
            }
            Err(_) => local_time.clone(),
        },
        _ => local_time.clone(),
    };

    Ok(StatusRecord {
        venue_name: venue.name.clone(),
        local_time,
        display_time,
        state,
        is_open: state == MarketState::Open,
        currency: venue.currency.clone(),
        closes_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::registry::Registry;

    fn nyse() -> Venue {
        Registry::reference().get("🇺🇸 US (NYSE)").unwrap().clone()
    }

    fn bursa() -> Venue {
        Registry::reference()
            .get("🇲🇾 Malaysia (Bursa)")
            .unwrap()
            .clone()
    }

    /// Instant at the given wall-clock time in `tz`.
    fn at(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    const NY: Tz = chrono_tz::America::New_York;
    const KL: Tz = chrono_tz::Asia::Kuala_Lumpur;

    #[test]
    fn tuesday_mid_session_is_open() {
        // 2024-03-12 is a Tuesday
        let s = evaluate(&nyse(), at(NY, 2024, 3, 12, 10, 30), None);
        assert_eq!(s.state, MarketState::Open);
        assert!(s.is_open);
        assert_eq!(s.local_time, "10:30");
        assert_eq!(s.display_time, "10:30");
        assert_eq!(s.label(), "🟢 OPEN (Closes at 16:00)");
    }

    #[test]
    fn session_bounds_are_inclusive() {
        let v = nyse();
        let state = |h, m| evaluate(&v, at(NY, 2024, 3, 12, h, m), None).state;

        assert_eq!(state(9, 30), MarketState::Open);
        assert_eq!(state(16, 0), MarketState::Open);
        assert_eq!(state(9, 29), MarketState::ClosedHours);
        assert_eq!(state(16, 1), MarketState::ClosedHours);
    }

    #[test]
    fn weekend_wins_over_clock() {
        // 2024-03-16 Saturday, 2024-03-17 Sunday
        for v in [nyse(), bursa()] {
            let tz: Tz = v.timezone.parse().unwrap();
            for day in [16, 17] {
                for hour in [0, 10, 13, 23] {
                    let s = evaluate(&v, at(tz, 2024, 3, day, hour, 0), None);
                    assert_eq!(s.state, MarketState::ClosedWeekend);
                    assert!(!s.is_open);
                }
            }
        }
    }

    #[test]
    fn break_bounds_are_inclusive() {
        let v = bursa();
        let state = |h, m| evaluate(&v, at(KL, 2024, 3, 12, h, m), None).state;

        assert_eq!(state(12, 29), MarketState::Open);
        assert_eq!(state(12, 30), MarketState::ClosedBreak);
        assert_eq!(state(13, 45), MarketState::ClosedBreak);
        assert_eq!(state(14, 30), MarketState::ClosedBreak);
        assert_eq!(state(14, 31), MarketState::Open);
    }

    #[test]
    fn venue_without_break_never_reports_break() {
        let v = nyse();
        for minute in (0..24 * 60).step_by(7) {
            let s = evaluate(&v, at(NY, 2024, 3, 13, minute / 60, minute % 60), None);
            assert_ne!(s.state, MarketState::ClosedBreak);
        }
    }

    #[test]
    fn appends_viewer_time_when_zones_differ() {
        // 10:30 New York (EDT) is 14:30 UTC
        let s = evaluate(&nyse(), at(NY, 2024, 3, 12, 10, 30), Some("UTC"));
        assert_eq!(s.display_time, "10:30 (14:30 your time)");
        assert_eq!(s.local_time, "10:30");
    }

    #[test]
    fn same_viewer_zone_shows_venue_time_only() {
        let s = evaluate(
            &nyse(),
            at(NY, 2024, 3, 12, 10, 30),
            Some("America/New_York"),
        );
        assert_eq!(s.display_time, "10:30");
    }

    #[test]
    fn bad_viewer_zone_is_swallowed() {
        let s = evaluate(&nyse(), at(NY, 2024, 3, 12, 10, 30), Some("Not/AZone"));
        assert_eq!(s.state, MarketState::Open);
        assert_eq!(s.display_time, "10:30");
    }

    #[test]
    fn unknown_venue_zone_yields_error_record() {
        let mut v = nyse();
        v.timezone = "Mars/Olympus_Mons".to_string();

        let s = evaluate(&v, Utc::now(), Some("UTC"));
        assert_eq!(s.state, MarketState::Error);
        assert!(!s.is_open);
        assert_eq!(s.local_time, NOT_AVAILABLE);
        assert_eq!(s.display_time, NOT_AVAILABLE);
    }

    #[test]
    fn one_broken_venue_does_not_blank_the_report() {
        let mut broken = bursa();
        broken.timezone = "Nowhere/Special".to_string();
        let venues = [nyse(), broken];

        let records = evaluate_all(venues.iter(), at(NY, 2024, 3, 12, 10, 30), None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state, MarketState::Open);
        assert_eq!(records[1].state, MarketState::Error);
    }
}
