//! Alert message formatting (Telegram HTML)

use crate::config::FilterConfig;
use crate::feed::{PairSnapshot, ValuationMetric};
use crate::screen::Admission;

/// Compact USD figure: `$1.23K`, `$4.50M`, `$2.00B`
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("${:.2}B", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("${:.2}K", value / 1_000.0)
    } else {
        format!("${value:.2}")
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// `1 min`, `5 mins`
pub fn minutes_label(minutes: i64) -> String {
    if minutes == 1 {
        "1 min".to_string()
    } else {
        format!("{minutes} mins")
    }
}

/// Body of the alert for one admitted pair
pub fn alert_message(snapshot: &PairSnapshot, admission: &Admission, called_minutes_ago: i64) -> String {
    let address = escape_html(&snapshot.address);
    let chart_url = snapshot.url.clone().unwrap_or_else(|| {
        format!(
            "https://dexscreener.com/{}/{}",
            snapshot.chain_id, snapshot.address
        )
    });
    let age = if admission.age_minutes <= 0 {
        "New".to_string()
    } else {
        format!("{} old", minutes_label(admission.age_minutes))
    };
    let valuation_label = match admission.metric {
        ValuationMetric::MarketCap => "Market Cap",
        ValuationMetric::Fdv => "FDV",
    };

    format!(
        "🚀 <b>{name}</b> ({symbol})\n\n\
         💊 <code>{address}</code>\n\n\
         🏦 Venue: {venue}\n\
         💰 {valuation_label}: {valuation}\n\
         📊 Volume (24h): {volume}\n\
         💧 Liquidity: {liquidity}\n\
         ⏰ Called: {called} ago\n\
         🕐 Token Age: {age}\n\n\
         📈 <a href=\"{chart_url}\">View on DexScreener</a>\n\
         📈 <a href=\"https://axiom.trade/t/{address}\">Chart Watch: AXIOM</a>",
        name = escape_html(&snapshot.name),
        symbol = escape_html(&snapshot.symbol),
        venue = escape_html(&snapshot.dex_id),
        valuation = format_usd(admission.valuation),
        volume = format_usd(admission.volume_h24),
        liquidity = format_usd(admission.liquidity),
        called = minutes_label(called_minutes_ago.max(0)),
        chart_url = escape_html(&chart_url),
    )
}

/// Announcement listing the active filters, sent when the scan loop starts
pub fn startup_message(filter: &FilterConfig, scan_interval_secs: u64) -> String {
    format!(
        "🤖 <b>Pair screener online</b>\n\n\
         ✅ Monitoring {chain} pairs on: {venues}\n\
         📊 Active filters:\n\
         • Valuation: {min_cap} - {max_cap}\n\
         • Volume (24h): ≥ {min_volume}\n\
         • Liquidity: ≥ {min_liquidity}\n\
         • Pair age: ≤ {max_age}\n\n\
         🔍 Scanning every {scan_interval_secs} seconds...",
        chain = escape_html(&filter.target_chain),
        venues = escape_html(&filter.allowed_venues.join(", ")),
        min_cap = format_usd(filter.min_cap),
        max_cap = format_usd(filter.max_cap),
        min_volume = format_usd(filter.min_volume),
        min_liquidity = format_usd(filter.min_liquidity),
        max_age = minutes_label(filter.max_age_minutes),
    )
}
