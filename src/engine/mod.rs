pub mod bookmakers;
pub mod consensus;
pub mod devig;
pub mod quotes;
pub mod snapshot;

pub use bookmakers::BookmakerFilter;
pub use consensus::{BestPrice, ConsensusPricer, Pricing};
pub use quotes::{MarketKey, MarketKind, Outcome, Quote};
pub use snapshot::{build_match_odds, MarketSnapshot, MatchOdds};
