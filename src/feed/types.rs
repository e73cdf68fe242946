use serde::{Deserialize, Serialize};

/// the-odds-api.com v4 event. The odds endpoints return these with
/// bookmakers populated; the events listing returns them without.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TheOddsApiEvent {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub sport_title: Option<String>,
    pub commence_time: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<TheOddsApiBookmaker>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TheOddsApiBookmaker {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub markets: Vec<TheOddsApiMarket>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TheOddsApiMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<TheOddsApiOutcome>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TheOddsApiOutcome {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub point: Option<f64>,
    /// Present only when the request sets `includeBetLimits=true`.
    #[serde(default)]
    pub bet_limit: Option<f64>,
}

/// Entry of the `/v4/sports` listing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TheOddsApiSport {
    pub key: String,
    pub group: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub has_outrights: bool,
}

/// API usage quota extracted from response headers. Either counter may be
/// missing (e.g. on connection-level errors or providers that omit them).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiQuota {
    pub requests_used: Option<u64>,
    pub requests_remaining: Option<i64>,
}

/// One upstream call the orchestrator can make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamRequest {
    Sports,
    Events { sport_key: String },
    EventOdds { sport_key: String, event_id: String },
    LeagueOdds { sport_key: String },
}

/// A completed HTTP exchange, success or not. The orchestrator reports
/// `status` and `quota` to the key pool before looking at the body.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub quota: ApiQuota,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
