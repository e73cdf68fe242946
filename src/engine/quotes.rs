use crate::feed::types::{TheOddsApiBookmaker, TheOddsApiEvent};
use serde::{Deserialize, Serialize};

/// A mutually exclusive outcome set offered by bookmakers.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    /// 1 vs X vs 2 (Draw absent for two-way sports).
    H2h,
    /// Over vs Under a goal line.
    Totals,
}

impl MarketKind {
    pub fn from_api_key(key: &str) -> Option<Self> {
        match key {
            "h2h" => Some(MarketKind::H2h),
            "totals" => Some(MarketKind::Totals),
            _ => None,
        }
    }

    pub fn api_key(&self) -> &'static str {
        match self {
            MarketKind::H2h => "h2h",
            MarketKind::Totals => "totals",
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
    Over,
    Under,
}

impl Outcome {
    pub fn short_label(&self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
            Outcome::Over => "Over",
            Outcome::Under => "Under",
        }
    }
}

/// Market plus line, e.g. totals at 2.5. Each key is devigged on its own.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketKey {
    pub kind: MarketKind,
    pub line: Option<String>,
}

impl MarketKey {
    pub fn new(kind: MarketKind, line: Option<String>) -> Self {
        Self { kind, line }
    }
}

/// One bookmaker's decimal price for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub bookmaker_key: String,
    pub bookmaker_title: String,
    pub market: MarketKey,
    pub outcome: Outcome,
    pub price: f64,
    pub limit: Option<f64>,
}

impl Quote {
    pub fn new(bookmaker_key: &str, bookmaker_title: &str, market: MarketKey, outcome: Outcome, price: f64) -> Self {
        Self {
            bookmaker_key: bookmaker_key.to_string(),
            bookmaker_title: bookmaker_title.to_string(),
            market,
            outcome,
            price,
            limit: None,
        }
    }
}

/// Decimal odds must pay out more than the stake.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 1.0
}

/// Format a totals point as a line label ("2.5", "3").
pub fn line_label(point: f64) -> String {
    format!("{}", point)
}

fn map_outcome(kind: MarketKind, name: &str, event: &TheOddsApiEvent) -> Option<Outcome> {
    match kind {
        MarketKind::H2h if name == event.home_team => Some(Outcome::Home),
        MarketKind::H2h if name == event.away_team => Some(Outcome::Away),
        MarketKind::H2h if name.eq_ignore_ascii_case("draw") => Some(Outcome::Draw),
        MarketKind::Totals if name.eq_ignore_ascii_case("over") => Some(Outcome::Over),
        MarketKind::Totals if name.eq_ignore_ascii_case("under") => Some(Outcome::Under),
        _ => None,
    }
}

/// Flatten the given bookmakers' markets into quotes, in bookmaker order.
/// Unknown markets, unrecognised outcome names and invalid prices are dropped.
pub fn quotes_from_bookmakers(event: &TheOddsApiEvent, bookmakers: &[&TheOddsApiBookmaker]) -> Vec<Quote> {
    let mut quotes = Vec::new();

    for bm in bookmakers {
        for market in &bm.markets {
            let Some(kind) = MarketKind::from_api_key(&market.key) else {
                continue;
            };
            for o in &market.outcomes {
                let Some(outcome) = map_outcome(kind, &o.name, event) else {
                    tracing::debug!(event_id = %event.id, bookmaker = %bm.key, name = %o.name, "unrecognised outcome");
                    continue;
                };
                if !is_valid_price(o.price) {
                    tracing::debug!(event_id = %event.id, bookmaker = %bm.key, price = o.price, "dropping invalid price");
                    continue;
                }
                let line = match kind {
                    MarketKind::Totals => o.point.map(line_label),
                    MarketKind::H2h => None,
                };
                quotes.push(Quote {
                    bookmaker_key: bm.key.clone(),
                    bookmaker_title: bm.title.clone(),
                    market: MarketKey::new(kind, line),
                    outcome,
                    price: o.price,
                    limit: o.bet_limit,
                });
            }
        }
    }

    quotes
}
