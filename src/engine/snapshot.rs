//! Per-match market snapshots: accepted bookmaker rows plus best, consensus
//! and fair (devigged) prices for every market.

use super::bookmakers::BookmakerFilter;
use super::consensus::{group_by_bookmaker, BestPrice, ConsensusPricer};
use super::devig::devig_complete;
use super::quotes::{quotes_from_bookmakers, MarketKey, MarketKind, Outcome, Quote};
use crate::feed::types::TheOddsApiEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmakerRow {
    pub key: String,
    pub title: String,
    pub prices: BTreeMap<Outcome, f64>,
    pub limits: BTreeMap<Outcome, f64>,
    /// Present only when the bookmaker quotes the full outcome set.
    pub margin_percent: Option<f64>,
    pub fair_prices: Option<BTreeMap<Outcome, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusRow {
    pub prices: BTreeMap<Outcome, f64>,
    pub bookmaker_count: usize,
    pub margin_percent: Option<f64>,
    pub fair_prices: Option<BTreeMap<Outcome, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub market: MarketKind,
    pub line: Option<String>,
    pub outcomes: Vec<Outcome>,
    pub rows: Vec<BookmakerRow>,
    pub best: BTreeMap<Outcome, BestPrice>,
    /// `None` when no accepted bookmaker quotes the full outcome set.
    pub consensus: Option<ConsensusRow>,
}

impl MarketSnapshot {
    pub fn row(&self, bookmaker_key: &str) -> Option<&BookmakerRow> {
        self.rows.iter().find(|r| r.key == bookmaker_key)
    }

    /// Build a snapshot from quotes already restricted to one market key.
    pub fn from_quotes(key: MarketKey, quotes: &[Quote]) -> Self {
        let outcomes = outcome_set(key.kind, quotes);
        let pricing = ConsensusPricer::price(quotes, &outcomes);

        let rows = group_by_bookmaker(quotes, &outcomes)
            .into_iter()
            .map(|g| BookmakerRow {
                margin_percent: pricing.margin_for(&g.key),
                fair_prices: devig_complete(&g.prices, &outcomes),
                key: g.key,
                title: g.title,
                prices: g.prices,
                limits: g.limits,
            })
            .collect();

        let consensus = (pricing.consensus_count > 0).then(|| ConsensusRow {
            margin_percent: pricing.consensus_margin_percent(),
            fair_prices: devig_complete(&pricing.consensus, &outcomes),
            bookmaker_count: pricing.consensus_count,
            prices: pricing.consensus.clone(),
        });

        Self {
            market: key.kind,
            line: key.line,
            outcomes,
            rows,
            best: pricing.best,
            consensus,
        }
    }
}

/// Outcome set of a market. Head-to-head is three-way only when some
/// bookmaker prices the draw.
pub fn outcome_set(kind: MarketKind, quotes: &[Quote]) -> Vec<Outcome> {
    match kind {
        MarketKind::H2h if quotes.iter().any(|q| q.outcome == Outcome::Draw) => {
            vec![Outcome::Home, Outcome::Draw, Outcome::Away]
        }
        MarketKind::H2h => vec![Outcome::Home, Outcome::Away],
        MarketKind::Totals => vec![Outcome::Over, Outcome::Under],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOdds {
    pub event_id: String,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    pub markets: Vec<MarketSnapshot>,
    pub fetched_at: DateTime<Utc>,
}

impl MatchOdds {
    pub fn market(&self, kind: MarketKind, line: Option<&str>) -> Option<&MarketSnapshot> {
        self.markets
            .iter()
            .find(|m| m.market == kind && m.line.as_deref() == line)
    }

    /// The single head-to-head market.
    pub fn h2h(&self) -> Option<&MarketSnapshot> {
        self.market(MarketKind::H2h, None)
    }

    /// Human label for an outcome of this match.
    pub fn outcome_label(&self, outcome: Outcome) -> String {
        match outcome {
            Outcome::Home => self.home_team.clone(),
            Outcome::Away => self.away_team.clone(),
            Outcome::Draw => "Draw".to_string(),
            Outcome::Over => "Over".to_string(),
            Outcome::Under => "Under".to_string(),
        }
    }
}

/// Filter, dedup, normalize and price one upstream event.
///
/// Head-to-head and totals snapshots are always present; when nothing was
/// quoted they are empty with no consensus.
pub fn build_match_odds(event: &TheOddsApiEvent, filter: &BookmakerFilter, fetched_at: DateTime<Utc>) -> MatchOdds {
    let accepted = filter.accept(&event.bookmakers);
    let quotes = quotes_from_bookmakers(event, &accepted);

    let mut by_market: BTreeMap<MarketKey, Vec<Quote>> = BTreeMap::new();
    by_market.entry(MarketKey::new(MarketKind::H2h, None)).or_default();
    for q in quotes {
        by_market.entry(q.market.clone()).or_default().push(q);
    }
    if !by_market.keys().any(|k| k.kind == MarketKind::Totals) {
        by_market.entry(MarketKey::new(MarketKind::Totals, None)).or_default();
    }

    let markets = by_market
        .into_iter()
        .map(|(key, quotes)| MarketSnapshot::from_quotes(key, &quotes))
        .collect();

    MatchOdds {
        event_id: event.id.clone(),
        sport_key: event.sport_key.clone(),
        home_team: event.home_team.clone(),
        away_team: event.away_team.clone(),
        commence_time: event.commence_time.clone(),
        markets,
        fetched_at,
    }
}
