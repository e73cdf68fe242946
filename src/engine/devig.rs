//! Multiplicative (proportional) devig.
//!
//! Implied probabilities `p_i = 1 / price_i` of a mutually exclusive outcome
//! set sum to the overround `T` (normally > 1). The fair probability of each
//! outcome is `p_i / T`, so the fair decimal price is `T / p_i`, which is the
//! same as `price_i * T`.
//!
//! Every function returns `None` when its precondition fails (fewer than two
//! outcomes, a missing outcome, or a price <= 1.0). Callers fall back to the
//! raw price.

use super::quotes::is_valid_price;
use std::collections::BTreeMap;

/// Sum of implied probabilities, or `None` for an invalid price set.
pub fn overround<'a>(prices: impl IntoIterator<Item = &'a f64>) -> Option<f64> {
    let mut total = 0.0;
    let mut count = 0;
    for &price in prices {
        if !is_valid_price(price) {
            return None;
        }
        total += 1.0 / price;
        count += 1;
    }
    (count >= 2).then_some(total)
}

/// Margin of a complete price set, as a percentage (`(T - 1) * 100`).
pub fn margin_percent<'a>(prices: impl IntoIterator<Item = &'a f64>) -> Option<f64> {
    overround(prices).map(|t| (t - 1.0) * 100.0)
}

/// Fair decimal price per outcome.
pub fn devig<K: Ord + Clone>(prices: &BTreeMap<K, f64>) -> Option<BTreeMap<K, f64>> {
    let total = overround(prices.values())?;
    Some(
        prices
            .iter()
            .map(|(k, &price)| (k.clone(), total / (1.0 / price)))
            .collect(),
    )
}

/// Devig only if `prices` covers exactly the outcome set `outcomes`.
pub fn devig_complete<K: Ord + Clone>(prices: &BTreeMap<K, f64>, outcomes: &[K]) -> Option<BTreeMap<K, f64>> {
    if prices.len() != outcomes.len() || !outcomes.iter().all(|o| prices.contains_key(o)) {
        return None;
    }
    devig(prices)
}

/// Fair price for one outcome of a set, falling back to its raw price when
/// the set cannot be devigged. `None` only if the outcome itself is unpriced.
pub fn fair_or_raw<K: Ord + Clone>(prices: &BTreeMap<K, f64>, outcomes: &[K], outcome: &K) -> Option<f64> {
    let raw = *prices.get(outcome)?;
    Some(
        devig_complete(prices, outcomes)
            .and_then(|fair| fair.get(outcome).copied())
            .unwrap_or(raw),
    )
}
