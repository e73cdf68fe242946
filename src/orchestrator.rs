//! Odds request orchestration: key selection, upstream call, quota
//! feedback, bookmaker filtering, pricing and caching.
//!
//! Constructed once at startup and shared (`Arc`) by every request handler.

use crate::cache::TtlCache;
use crate::config::Config;
use crate::engine::{build_match_odds, BookmakerFilter, MatchOdds};
use crate::error::{OddsError, Result};
use crate::feed::types::{TheOddsApiEvent, TheOddsApiSport, UpstreamRequest, UpstreamResponse};
use crate::feed::OddsSource;
use crate::keys::{mask_key, KeyPool, PoolStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const ERROR_BODY_LIMIT: usize = 300;

/// A result plus where it came from.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: Arc<T>,
    pub from_cache: bool,
}

impl<T> Fetched<T> {
    fn cached(data: Arc<T>) -> Self {
        Self { data, from_cache: true }
    }

    fn fresh(data: Arc<T>) -> Self {
        Self { data, from_cache: false }
    }
}

/// Every match of a league, priced from one upstream call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueOdds {
    pub sport_key: String,
    pub events: HashMap<String, MatchOdds>,
    pub fetched_at: DateTime<Utc>,
}

pub struct OddsOrchestrator {
    source: Arc<dyn OddsSource>,
    keys: Arc<KeyPool>,
    filter: BookmakerFilter,
    sport_group: String,
    match_cache: TtlCache<String, MatchOdds>,
    league_cache: TtlCache<String, LeagueOdds>,
    sports_cache: TtlCache<(), Vec<TheOddsApiSport>>,
    events_cache: TtlCache<String, Vec<TheOddsApiEvent>>,
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let cut: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    format!("{}...", cut)
}

impl OddsOrchestrator {
    pub fn new(config: &Config, keys: Arc<KeyPool>, source: Arc<dyn OddsSource>) -> Self {
        Self {
            source,
            keys,
            filter: BookmakerFilter::new(&config.bookmakers.sharp, &config.bookmakers.dedup_prefixes),
            sport_group: config.odds_api.sport_group.clone(),
            match_cache: TtlCache::new(config.cache.odds_ttl()),
            league_cache: TtlCache::new(config.cache.league_odds_ttl()),
            sports_cache: TtlCache::new(config.cache.sports_ttl()),
            events_cache: TtlCache::new(config.cache.events_ttl()),
        }
    }

    pub fn key_status(&self) -> PoolStatus {
        self.keys.status()
    }

    /// Send one request, reporting every completed exchange to the key pool.
    ///
    /// A 401 or 429 retires or cools down the key and the request is retried
    /// with the next one, at most once per key. Timeouts and connection
    /// failures are returned immediately without touching the pool.
    async fn call(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let max_attempts = self.keys.len();
        let mut last_err = OddsError::PoolExhausted;

        for attempt in 0..max_attempts {
            let key = self.keys.acquire()?;
            let masked = mask_key(&key);

            let resp = match self.source.send(request, &key).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(key = %masked, request = ?request, error = %e, "upstream request failed");
                    return Err(e);
                }
            };
            self.keys.report(&key, resp.status, &resp.quota);

            if resp.is_success() {
                return Ok(resp);
            }
            tracing::warn!(key = %masked, status = resp.status, attempt, "upstream rejected request");
            match resp.status {
                401 => last_err = OddsError::UpstreamRejected { status: 401 },
                429 => last_err = OddsError::UpstreamRateLimited,
                status => {
                    return Err(OddsError::UpstreamStatus {
                        status,
                        body: truncate_body(&resp.body),
                    })
                }
            }
        }

        if self.keys.status().active_keys == 0 {
            return Err(OddsError::PoolExhausted);
        }
        Err(last_err)
    }

    /// Odds for one match, filtered to sharp bookmakers and priced.
    pub async fn fetch_match_odds(
        &self,
        sport_key: &str,
        event_id: &str,
        force_refresh: bool,
    ) -> Result<Fetched<MatchOdds>> {
        if force_refresh {
            tracing::info!(event_id, "cache bypass requested for match odds");
        } else if let Some(hit) = self.match_cache.get(event_id) {
            tracing::debug!(event_id, "serving match odds from cache");
            return Ok(Fetched::cached(hit));
        }

        let resp = self
            .call(&UpstreamRequest::EventOdds {
                sport_key: sport_key.to_string(),
                event_id: event_id.to_string(),
            })
            .await?;
        let event: TheOddsApiEvent = serde_json::from_str(&resp.body)?;
        let odds = build_match_odds(&event, &self.filter, Utc::now());

        Ok(Fetched::fresh(self.match_cache.insert(event_id.to_string(), odds)))
    }

    /// Odds for every match of a league from a single upstream call.
    pub async fn fetch_league_odds(&self, sport_key: &str, force_refresh: bool) -> Result<Fetched<LeagueOdds>> {
        if force_refresh {
            tracing::info!(sport = sport_key, "cache bypass requested for league odds");
        } else if let Some(hit) = self.league_cache.get(sport_key) {
            tracing::debug!(sport = sport_key, "serving league odds from cache");
            return Ok(Fetched::cached(hit));
        }

        let resp = self
            .call(&UpstreamRequest::LeagueOdds { sport_key: sport_key.to_string() })
            .await?;
        let raw: Vec<TheOddsApiEvent> = serde_json::from_str(&resp.body)?;

        let fetched_at = Utc::now();
        let events: HashMap<String, MatchOdds> = raw
            .iter()
            .map(|event| (event.id.clone(), build_match_odds(event, &self.filter, fetched_at)))
            .collect();
        tracing::debug!(sport = sport_key, matches = events.len(), "league odds priced");

        let league = LeagueOdds {
            sport_key: sport_key.to_string(),
            events,
            fetched_at,
        };
        Ok(Fetched::fresh(self.league_cache.insert(sport_key.to_string(), league)))
    }

    /// Sports in the configured group (e.g. soccer leagues).
    pub async fn fetch_sports(&self) -> Result<Fetched<Vec<TheOddsApiSport>>> {
        if let Some(hit) = self.sports_cache.get(&()) {
            return Ok(Fetched::cached(hit));
        }

        let resp = self.call(&UpstreamRequest::Sports).await?;
        let all: Vec<TheOddsApiSport> = serde_json::from_str(&resp.body)?;
        let sports: Vec<TheOddsApiSport> = all
            .into_iter()
            .filter(|s| s.group == self.sport_group)
            .collect();

        Ok(Fetched::fresh(self.sports_cache.insert((), sports)))
    }

    /// Upcoming events of a league, without odds.
    pub async fn fetch_events(&self, sport_key: &str) -> Result<Fetched<Vec<TheOddsApiEvent>>> {
        if let Some(hit) = self.events_cache.get(sport_key) {
            return Ok(Fetched::cached(hit));
        }

        let resp = self
            .call(&UpstreamRequest::Events { sport_key: sport_key.to_string() })
            .await?;
        let events: Vec<TheOddsApiEvent> = serde_json::from_str(&resp.body)?;

        Ok(Fetched::fresh(self.events_cache.insert(sport_key.to_string(), events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::ApiQuota;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted responses and records which key each call used.
    struct Scripted {
        responses: Mutex<VecDeque<Result<UpstreamResponse>>>,
        calls: Mutex<Vec<(UpstreamRequest, String)>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<UpstreamResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(UpstreamRequest, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OddsSource for Scripted {
        async fn send(&self, request: &UpstreamRequest, api_key: &str) -> Result<UpstreamResponse> {
            self.calls.lock().unwrap().push((request.clone(), api_key.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(OddsError::UpstreamUnreachable("script exhausted".into())))
        }
    }

    fn ok(body: &str) -> Result<UpstreamResponse> {
        Ok(UpstreamResponse {
            status: 200,
            quota: ApiQuota { requests_used: Some(1), requests_remaining: Some(99) },
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> Result<UpstreamResponse> {
        Ok(UpstreamResponse { status: code, quota: ApiQuota::default(), body: "{}".to_string() })
    }

    fn orchestrator(keys: &[&str], source: Arc<Scripted>) -> OddsOrchestrator {
        let pool = KeyPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap();
        OddsOrchestrator::new(&Config::default(), Arc::new(pool), source)
    }

    const SPORTS: &str = r#"[
        {"key":"soccer_epl","group":"Soccer","title":"EPL","description":"Premier League","active":true,"has_outrights":false},
        {"key":"basketball_nba","group":"Basketball","title":"NBA","description":"","active":true,"has_outrights":false}
    ]"#;

    #[tokio::test]
    async fn test_sports_filtered_to_group_and_cached() {
        let source = Scripted::new(vec![ok(SPORTS)]);
        let orch = orchestrator(&["k1"], source.clone());

        let first = orch.fetch_sports().await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.data.len(), 1);
        assert_eq!(first.data[0].key, "soccer_epl");

        let second = orch.fetch_sports().await.unwrap();
        assert!(second.from_cache);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fails_over_to_next_key_on_401() {
        let source = Scripted::new(vec![status(401), ok(SPORTS)]);
        let orch = orchestrator(&["key-one-aaaa", "key-two-bbbb"], source.clone());

        assert!(orch.fetch_sports().await.is_ok());
        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "key-one-aaaa");
        assert_eq!(calls[1].1, "key-two-bbbb");
        assert_eq!(orch.key_status().exhausted_keys, 1);
    }

    #[tokio::test]
    async fn test_whole_pool_rate_limited_is_pool_exhausted() {
        let source = Scripted::new(vec![status(429), status(429)]);
        let orch = orchestrator(&["k1", "k2"], source.clone());

        let err = orch.fetch_sports().await.unwrap_err();
        assert_eq!(err, OddsError::PoolExhausted);
        assert_eq!(source.calls().len(), 2);
        assert_eq!(orch.key_status().blocked_keys, 2);
    }

    #[tokio::test]
    async fn test_failover_makes_at_most_one_call_per_key() {
        let source = Scripted::new(vec![status(429), status(429), ok(SPORTS)]);
        let pool = KeyPool::with_cooldown(vec!["k1".to_string(), "k2".to_string()], Duration::ZERO).unwrap();
        let orch = OddsOrchestrator::new(&Config::default(), Arc::new(pool), source.clone());

        let err = orch.fetch_sports().await.unwrap_err();
        assert_eq!(err, OddsError::UpstreamRateLimited);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_without_touching_pool() {
        let source = Scripted::new(vec![Err(OddsError::UpstreamUnreachable("timed out".into()))]);
        let orch = orchestrator(&["k1", "k2"], source.clone());

        let err = orch.fetch_events("soccer_epl").await.unwrap_err();
        assert!(matches!(err, OddsError::UpstreamUnreachable(_)));
        let status = orch.key_status();
        assert_eq!(status.active_keys, 2);
        assert_eq!(status.keys[0].usage, 0);
    }

    #[tokio::test]
    async fn test_other_status_is_not_retried() {
        let source = Scripted::new(vec![Ok(UpstreamResponse {
            status: 422,
            quota: ApiQuota::default(),
            body: "unknown sport".to_string(),
        })]);
        let orch = orchestrator(&["k1", "k2"], source.clone());

        let err = orch.fetch_events("bogus").await.unwrap_err();
        assert_eq!(err, OddsError::UpstreamStatus { status: 422, body: "unknown sport".to_string() });
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let source = Scripted::new(vec![ok("not json")]);
        let orch = orchestrator(&["k1"], source);
        let err = orch.fetch_league_odds("soccer_epl", false).await.unwrap_err();
        assert!(matches!(err, OddsError::Decode(_)));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(400);
        let cut = truncate_body(&long);
        assert_eq!(cut.len(), ERROR_BODY_LIMIT + 3);
        assert_eq!(truncate_body("short"), "short");
    }
}
