//! Message bodies and inline buttons.
//!
//! Telegram bodies use the Bot API's HTML parse mode, so every piece of
//! upstream text goes through [`escape_html`] first.

use serde::Serialize;
use url::Url;

use crate::{config::UpdateStyle, market::MarketSnapshot, notify::FollowUp};

pub const CHART_URL: &str = "https://dexscreener.com/solana";
pub const TRADE_URL: &str = "https://jup.ag/swap/SOL-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `$1.23B`, `$4.56M`, `$78.9K`, `$950`.
pub fn format_mcap(mcap: f64) -> String {
    const UNITS: [(&str, f64, usize); 4] = [
        ("", 1.0, 0),
        ("K", 1_000.0, 1),
        ("M", 1_000_000.0, 2),
        ("B", 1_000_000_000.0, 2),
    ];
    let mcap = if mcap.is_finite() { mcap.max(0.0) } else { 0.0 };

    // the unit is picked after rounding, so 999_990 reads $1.00M
    let mut rendered = String::new();
    for (suffix, scale, digits) in UNITS {
        let value = format!("{:.*}", digits, mcap / scale);
        let fits = value.parse::<f64>().map_or(true, |v| v < 1_000.0);
        rendered = format!("${value}{suffix}");
        if fits {
            break;
        }
    }
    rendered
}

fn host_of(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| link.to_string())
}

/// Comma separated hostnames of the links, `None` when there are none.
pub fn link_hosts(links: &[String]) -> String {
    if links.is_empty() {
        return "None".to_string();
    }
    links.iter().map(|l| host_of(l)).collect::<Vec<_>>().join(", ")
}

fn ticker(snapshot: &MarketSnapshot) -> String {
    if snapshot.symbol.is_empty() {
        "?".to_string()
    } else {
        format!("${}", snapshot.symbol)
    }
}

/// Chart and trade links, one row.
pub fn action_buttons(address: &str) -> Vec<Vec<InlineButton>> {
    vec![vec![
        InlineButton {
            text: "📈 Chart".to_string(),
            url: format!("{}/{}", CHART_URL, address),
        },
        InlineButton {
            text: "💱 Trade".to_string(),
            url: format!("{}{}", TRADE_URL, address),
        },
    ]]
}

pub fn render_initial(snapshot: &MarketSnapshot) -> String {
    format!(
        "🎓 <b>New graduate: {} ({})</b>\n\n\
         📍 <code>{}</code>\n\
         💰 Market cap: <b>{}</b>\n\
         🔗 Links: {}",
        escape_html(&snapshot.name),
        escape_html(&ticker(snapshot)),
        escape_html(&snapshot.address),
        format_mcap(snapshot.mcap),
        escape_html(&link_hosts(&snapshot.social_links)),
    )
}

pub fn render_update(snapshot: &MarketSnapshot, follow_up: &FollowUp, style: UpdateStyle) -> String {
    match style {
        UpdateStyle::Annotated => format!(
            "{}\n\n🚀🚀 <b>{}x</b> since our call ({} → {})",
            render_initial(snapshot),
            follow_up.multiplier,
            format_mcap(follow_up.initial_mcap),
            format_mcap(snapshot.mcap),
        ),
        UpdateStyle::Condensed => format!(
            "🚀 <b>{}</b> hit <b>{}x</b>\n{} → {}",
            escape_html(&ticker(snapshot)),
            follow_up.multiplier,
            format_mcap(follow_up.initial_mcap),
            format_mcap(snapshot.mcap),
        ),
    }
}

/// Plain-text card for channels without HTML support.
pub fn render_plain(snapshot: &MarketSnapshot) -> String {
    format!(
        "🔥 {} ({}) at {} mcap\n{}\nChart: {}/{}\nLinks: {}",
        snapshot.name,
        ticker(snapshot),
        format_mcap(snapshot.mcap),
        snapshot.address,
        CHART_URL,
        snapshot.address,
        link_hosts(&snapshot.social_links),
    )
}
