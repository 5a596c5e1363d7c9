//! Markdown message bodies for the chat front end.

use std::collections::{HashMap, HashSet};

use crate::{
    news::NewsArticle,
    preferences::Subscriber,
    quote::Quote,
    status::{NOT_AVAILABLE, StatusRecord},
};

pub fn format_percent(pct: f64) -> String {
    format!("{pct:+.2}%")
}

// keeps five articles under Discord's 2000 character message limit
const DESCRIPTION_LIMIT: usize = 200;

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

/// Discord rejects messages longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Splits `text` at blank lines into messages of at most `limit` characters.
/// A single block longer than `limit` is clipped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for block in text.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let block = clip(block, limit.saturating_sub(1));
        let joined = current.chars().count() + 2 + block.chars().count();
        if !current.is_empty() && joined > limit {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&block);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn status_report(records: &[StatusRecord]) -> String {
    let mut msg = String::from("🔔 **Market Status Update**\n\n");
    for r in records {
        msg.push_str(&format!(
            "**{}**\nLocal Time: {}\nStatus: {}\n\n",
            r.venue_name,
            r.display_time,
            r.label()
        ));
    }
    msg
}

/// One block per symbol in `symbols` order.
pub fn stocks_report(symbols: &[String], quotes: &HashMap<String, Quote>) -> String {
    let mut msg = String::from("📈 **Stock Indices**\n\n");
    let mut seen = HashSet::new();

    for symbol in symbols {
        if !seen.insert(symbol.as_str()) {
            continue;
        }
        let Some(q) = quotes.get(symbol) else {
            continue;
        };

        let marker = match q.change_percent {
            Some(p) if p > 0.0 => "📈",
            Some(p) if p < 0.0 => "📉",
            _ => "➡️",
        };
        let price = or_na(q.price.map(|p| format!("{p:.2}")));
        let change = or_na(q.change.map(|c| format!("{c:+.2}")));
        let pct = or_na(q.change_percent.map(format_percent));

        msg.push_str(&format!(
            "{marker} **{} ({symbol})**\nPrice: {price}\nChange: {change} ({pct})\n\n",
            q.display_name
        ));
    }
    msg
}

/// `None` when there is nothing to show.
pub fn news_report(articles: &[NewsArticle]) -> Option<String> {
    if articles.is_empty() {
        return None;
    }

    let mut msg = String::from("📰 **Latest Market News**\n\n");
    for (i, a) in articles.iter().enumerate() {
        msg.push_str(&format!("**{}. {}**\n", i + 1, a.title));
        if !a.description.is_empty() {
            msg.push_str(&format!("{}\n", clip(&a.description, DESCRIPTION_LIMIT)));
        }
        msg.push_str(&format!("📰 {}\n[Read more](<{}>)\n\n", a.source, a.url));
    }
    Some(msg)
}

pub fn settings_report(subscriber: &Subscriber) -> String {
    let keywords: Vec<&str> = subscriber
        .news_keywords
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();
    let more = if subscriber.news_keywords.len() > 3 { "..." } else { "" };

    format!(
        "⚙️ **Your Settings**\n\n\
         🕐 Timezone: `{}`\n\
         🔔 Notifications: {}\n\
         📊 Tracked Markets: {}\n\
         📰 News Keywords: {}{more}\n",
        subscriber.timezone.as_deref().unwrap_or("Auto-detect"),
        if subscriber.notifications_enabled {
            "✅ Enabled"
        } else {
            "❌ Disabled"
        },
        subscriber.tracked_venues.len(),
        keywords.join(", "),
    )
}

pub const HELP_TEXT: &str = "📖 **Bot Commands Guide**

`/market status` - Check current market status for all configured markets
`/market stocks` - View current stock indices and prices
`/market news` - Get latest financial news
`/market settings` - Show your preferences
`/market timezone <zone>` - Set your timezone (e.g. Asia/Dhaka)
`/market locate <lat> <lon>` - Detect your timezone from coordinates
`/market notify` - Turn market alerts on or off
`/market keywords <list>` - Comma-separated news keywords
`/market venues` - Choose which markets to track

**Timezone Examples:**
• Asia/Dhaka
• Asia/Kuala_Lumpur
• America/New_York
• Europe/London
• Asia/Tokyo";

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::status::MarketState;

    #[test]
    fn stocks_report_marks_unavailable() {
        let symbols = vec!["^GSPC".to_string(), "DSE".to_string()];
        let quotes = HashMap::from([
            (
                "^GSPC".to_string(),
                Quote {
                    symbol: "^GSPC".into(),
                    display_name: "S&P 500".into(),
                    price: Some(5102.0),
                    change: Some(-12.5),
                    change_percent: Some(-0.24),
                },
            ),
            ("DSE".to_string(), Quote::unavailable("DSE", "DSE Index")),
        ]);

        let msg = stocks_report(&symbols, &quotes);
        assert!(msg.contains("📉 **S&P 500 (^GSPC)**\nPrice: 5102.00\nChange: -12.50 (-0.24%)"));
        assert!(msg.contains("➡️ **DSE Index (DSE)**\nPrice: N/A\nChange: N/A (N/A)"));
    }

    #[test]
    fn status_report_lists_every_venue() {
        let records = vec![
            StatusRecord {
                venue_name: "A".into(),
                local_time: "10:30".into(),
                display_time: "10:30 (14:30 your time)".into(),
                state: MarketState::Open,
                is_open: true,
                currency: "USD".into(),
                closes_at: "16:00".parse().ok(),
            },
            StatusRecord {
                venue_name: "B".into(),
                local_time: NOT_AVAILABLE.into(),
                display_time: NOT_AVAILABLE.into(),
                state: MarketState::Error,
                is_open: false,
                currency: "MYR".into(),
                closes_at: None,
            },
        ];

        let msg = status_report(&records);
        assert!(msg.contains("**A**\nLocal Time: 10:30 (14:30 your time)\nStatus: 🟢 OPEN (Closes at 16:00)"));
        assert!(msg.contains("**B**\nLocal Time: N/A\nStatus: ❌ ERROR"));
    }

    fn open_record(name: String) -> StatusRecord {
        StatusRecord {
            venue_name: name,
            local_time: "10:30".into(),
            display_time: "10:30 (14:30 your time)".into(),
            state: MarketState::Open,
            is_open: true,
            currency: "USD".into(),
            closes_at: "16:00".parse().ok(),
        }
    }

    #[test]
    fn large_status_report_is_split_under_limit() {
        let records: Vec<StatusRecord> = (0..40)
            .map(|i| open_record(format!("Exchange number {i:02} with a long display name")))
            .collect();

        let chunks = split_message(&status_report(&records), MESSAGE_LIMIT);

        assert!(chunks.len() > 1);
        assert!(chunks[0].starts_with("🔔 **Market Status Update**"));
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_LIMIT));
        for i in 0..40 {
            let name = format!("**Exchange number {i:02} with a long display name**");
            assert_eq!(chunks.iter().filter(|c| c.contains(&name)).count(), 1);
        }
    }

    #[test]
    fn short_report_stays_in_one_message() {
        let report = status_report(&[open_record("A".into())]);
        let chunks = split_message(&report, MESSAGE_LIMIT);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], report.trim_end());
    }

    #[test]
    fn oversized_block_is_clipped() {
        let chunks = split_message(&"x".repeat(50), 10);
        assert_eq!(chunks, vec![format!("{}…", "x".repeat(9))]);
    }

    #[test]
    fn long_descriptions_are_clipped() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdef", 3), "abc…");
        assert_eq!(clip("ééééé", 2), "éé…");
    }

    #[test]
    fn empty_news_has_no_report() {
        assert!(news_report(&[]).is_none());
    }

    #[test]
    fn settings_show_first_three_keywords() {
        let s = Subscriber {
            id: "1".into(),
            timezone: None,
            notifications_enabled: false,
            tracked_venues: BTreeSet::from(["A".to_string()]),
            news_keywords: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        };
        let msg = settings_report(&s);
        assert!(msg.contains("`Auto-detect`"));
        assert!(msg.contains("❌ Disabled"));
        assert!(msg.contains("Tracked Markets: 1"));
        assert!(msg.contains("News Keywords: a, b, c..."));
    }
}
