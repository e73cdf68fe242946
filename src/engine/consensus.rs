use super::devig::margin_percent;
use super::quotes::{Outcome, Quote};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Highest price seen for an outcome and who offered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPrice {
    pub price: f64,
    pub bookmaker_key: String,
    pub bookmaker_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmakerMargin {
    pub bookmaker_key: String,
    pub bookmaker_title: String,
    pub margin_percent: f64,
}

/// One bookmaker's prices for a market, first quote per outcome wins.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmakerPrices {
    pub key: String,
    pub title: String,
    pub prices: BTreeMap<Outcome, f64>,
    pub limits: BTreeMap<Outcome, f64>,
}

impl BookmakerPrices {
    pub fn is_complete(&self, outcomes: &[Outcome]) -> bool {
        !outcomes.is_empty() && outcomes.iter().all(|o| self.prices.contains_key(o))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pricing {
    pub best: BTreeMap<Outcome, BestPrice>,
    /// Mean price per outcome over bookmakers quoting the full outcome set.
    pub consensus: BTreeMap<Outcome, f64>,
    pub consensus_count: usize,
    /// In bookmaker first-seen order; complete bookmakers only.
    pub margins: Vec<BookmakerMargin>,
}

impl Pricing {
    pub fn margin_for(&self, bookmaker_key: &str) -> Option<f64> {
        self.margins
            .iter()
            .find(|m| m.bookmaker_key == bookmaker_key)
            .map(|m| m.margin_percent)
    }

    /// Margin implied by the consensus prices themselves.
    pub fn consensus_margin_percent(&self) -> Option<f64> {
        if self.consensus_count == 0 {
            return None;
        }
        margin_percent(self.consensus.values())
    }
}

/// Group quotes by bookmaker in first-seen order.
pub fn group_by_bookmaker(quotes: &[Quote], outcomes: &[Outcome]) -> Vec<BookmakerPrices> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<BookmakerPrices> = Vec::new();

    for q in quotes.iter().filter(|q| outcomes.contains(&q.outcome)) {
        let idx = *index.entry(q.bookmaker_key.as_str()).or_insert_with(|| {
            groups.push(BookmakerPrices {
                key: q.bookmaker_key.clone(),
                title: q.bookmaker_title.clone(),
                prices: BTreeMap::new(),
                limits: BTreeMap::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[idx];
        if group.prices.contains_key(&q.outcome) {
            continue;
        }
        group.prices.insert(q.outcome, q.price);
        if let Some(limit) = q.limit {
            group.limits.insert(q.outcome, limit);
        }
    }

    groups
}

/// Stateless best / consensus / margin calculation for one market.
pub struct ConsensusPricer;

impl ConsensusPricer {
    /// Price one market.
    ///
    /// Every quote counts towards `best`. Only bookmakers quoting every
    /// outcome in `outcomes` count towards margins and consensus, so the two
    /// always describe the same set of books.
    pub fn price(quotes: &[Quote], outcomes: &[Outcome]) -> Pricing {
        let mut best: BTreeMap<Outcome, BestPrice> = BTreeMap::new();
        for q in quotes.iter().filter(|q| outcomes.contains(&q.outcome)) {
            let better = best.get(&q.outcome).is_none_or(|b| q.price > b.price);
            if better {
                best.insert(
                    q.outcome,
                    BestPrice {
                        price: q.price,
                        bookmaker_key: q.bookmaker_key.clone(),
                        bookmaker_title: q.bookmaker_title.clone(),
                    },
                );
            }
        }

        let complete: Vec<BookmakerPrices> = group_by_bookmaker(quotes, outcomes)
            .into_iter()
            .filter(|g| g.is_complete(outcomes))
            .collect();

        let margins = complete
            .iter()
            .filter_map(|g| {
                margin_percent(g.prices.values()).map(|m| BookmakerMargin {
                    bookmaker_key: g.key.clone(),
                    bookmaker_title: g.title.clone(),
                    margin_percent: m,
                })
            })
            .collect();

        let consensus_count = complete.len();
        let consensus = if consensus_count == 0 {
            BTreeMap::new()
        } else {
            outcomes
                .iter()
                .map(|o| {
                    let sum: f64 = complete.iter().map(|g| g.prices[o]).sum();
                    (*o, sum / consensus_count as f64)
                })
                .collect()
        };

        Pricing { best, consensus, consensus_count, margins }
    }
}
