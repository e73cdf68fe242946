//! Cross-bookmaker betslip held in memory.
//!
//! A selection freezes the quote it was built from, together with the fair
//! price of that bookmaker's market at selection time. Only the custom price
//! can change afterwards. Storage is left to the caller; selections are
//! serde-serializable for that purpose.

use crate::engine::devig::fair_or_raw;
use crate::engine::quotes::is_valid_price;
use crate::engine::{MarketKind, MarketSnapshot, MatchOdds, Outcome};
use crate::error::BetslipError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetslipSelection {
    pub id: String,
    pub event_id: String,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    pub market: MarketKind,
    pub line: Option<String>,
    pub outcome: Outcome,
    pub outcome_label: String,
    pub bookmaker_key: String,
    pub bookmaker_title: String,
    pub price: f64,
    /// Devigged price of the same bookmaker's market, or the raw price when
    /// that market could not be devigged.
    pub fair_price: f64,
    pub custom_price: Option<f64>,
    pub selected_at: DateTime<Utc>,
}

impl BetslipSelection {
    pub fn effective_price(&self) -> f64 {
        self.custom_price.unwrap_or(self.price)
    }

    /// Expected value per unit staked at the effective price, in percent.
    pub fn edge_percent(&self) -> f64 {
        (self.effective_price() / self.fair_price - 1.0) * 100.0
    }
}

fn selection_id(event_id: &str, market: &MarketSnapshot, outcome: Outcome, bookmaker_key: &str) -> String {
    let line = market.line.as_deref().unwrap_or("-");
    format!(
        "{}:{}:{}:{}:{}",
        event_id,
        market.market.api_key(),
        line,
        outcome.short_label(),
        bookmaker_key
    )
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Betslip {
    selections: Vec<BetslipSelection>,
}

impl Betslip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selections(&self) -> &[BetslipSelection] {
        &self.selections
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BetslipSelection> {
        self.selections.iter().find(|s| s.id == id)
    }

    /// Add a bookmaker's price for `outcome`. Re-adding the same selection
    /// replaces the earlier one (and drops its custom price).
    pub fn add(
        &mut self,
        odds: &MatchOdds,
        market: &MarketSnapshot,
        bookmaker_key: &str,
        outcome: Outcome,
    ) -> Result<&BetslipSelection, BetslipError> {
        let row = market
            .row(bookmaker_key)
            .ok_or_else(|| BetslipError::UnknownBookmaker(bookmaker_key.to_string()))?;
        let price = *row.prices.get(&outcome).ok_or_else(|| BetslipError::OutcomeNotQuoted {
            bookmaker: row.title.clone(),
            outcome: format!("{:?}", outcome),
        })?;
        let fair_price = fair_or_raw(&row.prices, &market.outcomes, &outcome).unwrap_or(price);

        let selection = BetslipSelection {
            id: selection_id(&odds.event_id, market, outcome, bookmaker_key),
            event_id: odds.event_id.clone(),
            sport_key: odds.sport_key.clone(),
            home_team: odds.home_team.clone(),
            away_team: odds.away_team.clone(),
            commence_time: odds.commence_time.clone(),
            market: market.market,
            line: market.line.clone(),
            outcome,
            outcome_label: odds.outcome_label(outcome),
            bookmaker_key: row.key.clone(),
            bookmaker_title: row.title.clone(),
            price,
            fair_price,
            custom_price: None,
            selected_at: Utc::now(),
        };

        let idx = match self.selections.iter().position(|s| s.id == selection.id) {
            Some(idx) => {
                self.selections[idx] = selection;
                idx
            }
            None => {
                self.selections.push(selection);
                self.selections.len() - 1
            }
        };
        Ok(&self.selections[idx])
    }

    /// Set or clear the user's own price for a selection.
    pub fn set_custom_price(&mut self, id: &str, price: Option<f64>) -> Result<(), BetslipError> {
        if let Some(p) = price {
            if !is_valid_price(p) {
                return Err(BetslipError::InvalidCustomPrice(p));
            }
        }
        let selection = self
            .selections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| BetslipError::UnknownSelection(id.to_string()))?;
        selection.custom_price = price;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<BetslipSelection> {
        let idx = self.selections.iter().position(|s| s.id == id)?;
        Some(self.selections.remove(idx))
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{build_match_odds, BookmakerFilter};
    use crate::feed::types::{TheOddsApiBookmaker, TheOddsApiEvent, TheOddsApiMarket, TheOddsApiOutcome};

    fn outcome(name: &str, price: f64) -> TheOddsApiOutcome {
        TheOddsApiOutcome { name: name.to_string(), price, point: None, bet_limit: None }
    }

    fn match_odds() -> MatchOdds {
        let ev = TheOddsApiEvent {
            id: "evt1".to_string(),
            sport_key: "soccer_epl".to_string(),
            sport_title: None,
            commence_time: "2026-10-17T14:00:00Z".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            bookmakers: vec![
                TheOddsApiBookmaker {
                    key: "pinnacle".to_string(),
                    title: "Pinnacle".to_string(),
                    last_update: None,
                    markets: vec![TheOddsApiMarket {
                        key: "h2h".to_string(),
                        outcomes: vec![outcome("Arsenal", 2.0), outcome("Draw", 3.4), outcome("Chelsea", 4.0)],
                    }],
                },
                TheOddsApiBookmaker {
                    key: "smarkets".to_string(),
                    title: "Smarkets".to_string(),
                    last_update: None,
                    markets: vec![TheOddsApiMarket {
                        key: "h2h".to_string(),
                        outcomes: vec![outcome("Arsenal", 2.1), outcome("Chelsea", 3.9)],
                    }],
                },
            ],
        };
        let filter = BookmakerFilter::new(&["pinnacle".to_string(), "smarkets".to_string()], &[]);
        build_match_odds(&ev, &filter, Utc::now())
    }

    #[test]
    fn test_add_freezes_price_and_fair_price() {
        let odds = match_odds();
        let h2h = odds.h2h().unwrap().clone();
        let mut slip = Betslip::new();
        let sel = slip.add(&odds, &h2h, "pinnacle", Outcome::Home).unwrap();

        assert_eq!(sel.price, 2.0);
        let t = 0.5 + 1.0 / 3.4 + 0.25;
        assert!((sel.fair_price - 2.0 * t).abs() < 1e-9);
        assert_eq!(sel.outcome_label, "Arsenal");
        assert_eq!(sel.bookmaker_title, "Pinnacle");
    }

    #[test]
    fn test_incomplete_market_falls_back_to_raw_price() {
        let odds = match_odds();
        let h2h = odds.h2h().unwrap().clone();
        let mut slip = Betslip::new();
        let sel = slip.add(&odds, &h2h, "smarkets", Outcome::Home).unwrap();
        assert_eq!(sel.fair_price, 2.1);
    }

    #[test]
    fn test_missing_quote_is_rejected() {
        let odds = match_odds();
        let h2h = odds.h2h().unwrap().clone();
        let mut slip = Betslip::new();
        assert!(matches!(
            slip.add(&odds, &h2h, "smarkets", Outcome::Draw),
            Err(BetslipError::OutcomeNotQuoted { .. })
        ));
        assert_eq!(
            slip.add(&odds, &h2h, "betway", Outcome::Home).unwrap_err(),
            BetslipError::UnknownBookmaker("betway".to_string())
        );
        assert!(slip.is_empty());
    }

    #[test]
    fn test_readding_replaces_selection() {
        let odds = match_odds();
        let h2h = odds.h2h().unwrap().clone();
        let mut slip = Betslip::new();
        let id = slip.add(&odds, &h2h, "pinnacle", Outcome::Away).unwrap().id.clone();
        slip.set_custom_price(&id, Some(4.5)).unwrap();
        slip.add(&odds, &h2h, "pinnacle", Outcome::Away).unwrap();
        assert_eq!(slip.len(), 1);
        assert_eq!(slip.get(&id).unwrap().custom_price, None);
    }

    #[test]
    fn test_custom_price_validation_and_effective_price() {
        let odds = match_odds();
        let h2h = odds.h2h().unwrap().clone();
        let mut slip = Betslip::new();
        let id = slip.add(&odds, &h2h, "pinnacle", Outcome::Draw).unwrap().id.clone();

        assert_eq!(slip.set_custom_price(&id, Some(1.0)), Err(BetslipError::InvalidCustomPrice(1.0)));
        assert_eq!(
            slip.set_custom_price("missing", Some(2.0)),
            Err(BetslipError::UnknownSelection("missing".to_string()))
        );

        slip.set_custom_price(&id, Some(3.8)).unwrap();
        let sel = slip.get(&id).unwrap();
        assert_eq!(sel.effective_price(), 3.8);
        assert!(sel.edge_percent() > 0.0);

        slip.set_custom_price(&id, None).unwrap();
        assert_eq!(slip.get(&id).unwrap().effective_price(), 3.4);
    }

    #[test]
    fn test_remove_and_clear() {
        let odds = match_odds();
        let h2h = odds.h2h().unwrap().clone();
        let mut slip = Betslip::new();
        let home = slip.add(&odds, &h2h, "pinnacle", Outcome::Home).unwrap().id.clone();
        slip.add(&odds, &h2h, "pinnacle", Outcome::Away).unwrap();
        slip.add(&odds, &h2h, "smarkets", Outcome::Away).unwrap();
        assert_eq!(slip.len(), 3);

        assert_eq!(slip.remove(&home).unwrap().outcome, Outcome::Home);
        assert!(slip.remove(&home).is_none());
        assert_eq!(slip.len(), 2);

        slip.clear();
        assert!(slip.is_empty());
    }
}
