pub mod betslip;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod keys;
pub mod orchestrator;
pub mod report;

pub use error::OddsError;
pub use orchestrator::{Fetched, LeagueOdds, OddsOrchestrator};
