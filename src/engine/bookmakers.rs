use crate::feed::types::TheOddsApiBookmaker;
use std::collections::HashSet;

/// Allow-list filter plus dedup of bookmaker variants that share one
/// liquidity source (e.g. `betfair_ex_eu` / `betfair_ex_uk`).
#[derive(Debug, Clone)]
pub struct BookmakerFilter {
    allowed: HashSet<String>,
    dedup_prefixes: Vec<String>,
}

impl BookmakerFilter {
    pub fn new(allowed: &[String], dedup_prefixes: &[String]) -> Self {
        Self {
            allowed: allowed.iter().cloned().collect(),
            dedup_prefixes: dedup_prefixes.to_vec(),
        }
    }

    pub fn is_allowed(&self, key: &str) -> bool {
        self.allowed.contains(key)
    }

    /// Canonical liquidity-source id: the matching dedup prefix, or the key.
    pub fn canonical<'a>(&'a self, key: &'a str) -> &'a str {
        self.dedup_prefixes
            .iter()
            .find(|p| key.starts_with(p.as_str()))
            .map_or(key, |p| p.as_str())
    }

    /// Keep allowed bookmakers, first-seen variant per canonical id.
    pub fn accept<'e>(&self, bookmakers: &'e [TheOddsApiBookmaker]) -> Vec<&'e TheOddsApiBookmaker> {
        let mut seen: HashSet<&str> = HashSet::new();
        bookmakers
            .iter()
            .filter(|b| self.is_allowed(&b.key))
            .filter(|b| seen.insert(self.canonical(&b.key)))
            .collect()
    }
}
