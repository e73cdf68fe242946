// Presentation rows for odds tables. Rounding happens here and nowhere else.

use crate::engine::{MarketSnapshot, MatchOdds, Outcome};
use crate::keys::PoolStatus;
use chrono::{DateTime, Utc};

/// Display row for one bookmaker (or the consensus) in a market table.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub label: String,
    /// One cell per market outcome, in outcome order.
    pub prices: Vec<String>,
    pub fair: Vec<String>,
    pub margin: String,
    /// Outcomes where this row holds the best price.
    pub best: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchHeader {
    pub matchup: String,
    pub commence_time: String,
    pub status: String,
}

pub fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| "-".to_string(), |p| format!("{:.3}", p))
}

pub fn format_margin(margin: Option<f64>) -> String {
    margin.map_or_else(|| "-".to_string(), |m| format!("{:.2}%", m))
}

/// "Live" once kicked off, otherwise time until start.
pub fn match_status(commence_time: &str, now: DateTime<Utc>) -> String {
    let commence = DateTime::parse_from_rfc3339(commence_time)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));
    match commence {
        Some(ct) if ct <= now => "Live".to_string(),
        Some(ct) => {
            let total_secs = (ct - now).num_seconds().max(0) as u64;
            let h = total_secs / 3600;
            let m = (total_secs % 3600) / 60;
            if h > 0 {
                format!("Upcoming ({}h {:02}m)", h, m)
            } else {
                format!("Upcoming ({}m)", m)
            }
        }
        None => "Unknown".to_string(),
    }
}

pub fn match_header(odds: &MatchOdds, now: DateTime<Utc>) -> MatchHeader {
    let commence_time = DateTime::parse_from_rfc3339(&odds.commence_time)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format("%b %d %H:%M UTC").to_string())
        .unwrap_or_else(|| odds.commence_time.clone());
    MatchHeader {
        matchup: format!("{} vs {}", odds.home_team, odds.away_team),
        commence_time,
        status: match_status(&odds.commence_time, now),
    }
}

pub fn market_title(market: &MarketSnapshot) -> String {
    match &market.line {
        Some(line) => format!("{} {}", market.market.api_key(), line),
        None => market.market.api_key().to_string(),
    }
}

/// Consensus row first (when present), then one row per accepted bookmaker.
pub fn market_rows(market: &MarketSnapshot) -> Vec<PriceRow> {
    let mut rows = Vec::with_capacity(market.rows.len() + 1);

    if let Some(consensus) = &market.consensus {
        rows.push(PriceRow {
            label: format!("AVG ({})", consensus.bookmaker_count),
            prices: market.outcomes.iter().map(|o| format_price(consensus.prices.get(o).copied())).collect(),
            fair: market
                .outcomes
                .iter()
                .map(|o| format_price(consensus.fair_prices.as_ref().and_then(|f| f.get(o).copied())))
                .collect(),
            margin: format_margin(consensus.margin_percent),
            best: Vec::new(),
        });
    }

    for row in &market.rows {
        rows.push(PriceRow {
            label: row.title.clone(),
            prices: market.outcomes.iter().map(|o| format_price(row.prices.get(o).copied())).collect(),
            fair: market
                .outcomes
                .iter()
                .map(|o| format_price(row.fair_prices.as_ref().and_then(|f| f.get(o).copied())))
                .collect(),
            margin: format_margin(row.margin_percent),
            best: market
                .outcomes
                .iter()
                .filter(|o| market.best.get(o).is_some_and(|b| b.bookmaker_key == row.key))
                .copied()
                .collect(),
        });
    }

    rows
}

/// Plain-text table for terminal output.
pub fn render_market(market: &MarketSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("  {:<16}", market_title(market)));
    for o in &market.outcomes {
        out.push_str(&format!("{:>10}", o.short_label()));
    }
    out.push_str(&format!("{:>10}\n", "Margin"));

    let rows = market_rows(market);
    if rows.is_empty() {
        out.push_str("  (no sharp prices)\n");
        return out;
    }
    for row in rows {
        out.push_str(&format!("  {:<16}", row.label));
        for (o, cell) in market.outcomes.iter().zip(&row.prices) {
            let marker = if row.best.contains(o) { "*" } else { " " };
            out.push_str(&format!("{:>9}{}", cell, marker));
        }
        out.push_str(&format!("{:>10}\n", row.margin));
    }
    out
}

pub fn render_key_status(status: &PoolStatus) -> String {
    let mut out = format!(
        "  keys: {} total, {} active, {} exhausted, {} blocked, {} requests remaining\n",
        status.total_keys, status.active_keys, status.exhausted_keys, status.blocked_keys, status.total_remaining
    );
    for k in &status.keys {
        let remaining = k.remaining.map_or_else(|| "?".to_string(), |r| r.to_string());
        let state = if k.exhausted {
            "exhausted"
        } else if k.blocked {
            "blocked"
        } else {
            "ok"
        };
        out.push_str(&format!("    {:<12} used={:<6} remaining={:<8} {}\n", k.prefix, k.usage, remaining, state));
    }
    out
}
