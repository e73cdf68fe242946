use super::types::*;
use super::OddsSource;
use crate::config::OddsApiConfig;
use crate::error::OddsError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct TheOddsApi {
    client: Client,
    base_url: String,
    match_regions: String,
    markets: String,
    league_bookmakers: String,
}

/// Parse a quota header that may be an integer or float (e.g. "14527.0").
/// Non-finite values ("NaN", "inf") are treated as unknown.
fn parse_quota_header(headers: &reqwest::header::HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn quota_from_headers(headers: &reqwest::header::HeaderMap) -> ApiQuota {
    ApiQuota {
        requests_used: parse_quota_header(headers, "x-requests-used").map(|v| v.max(0.0) as u64),
        requests_remaining: parse_quota_header(headers, "x-requests-remaining").map(|v| v as i64),
    }
}

impl TheOddsApi {
    pub fn new(config: &OddsApiConfig, league_bookmakers: &[String]) -> Result<Self, OddsError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| OddsError::UpstreamUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            match_regions: config.match_regions.clone(),
            markets: config.markets.clone(),
            league_bookmakers: league_bookmakers.join(","),
        })
    }

    /// Path and query (minus the key) for a request.
    fn endpoint(&self, request: &UpstreamRequest) -> (String, Vec<(&'static str, String)>) {
        match request {
            UpstreamRequest::Sports => ("/v4/sports".to_string(), Vec::new()),
            UpstreamRequest::Events { sport_key } => {
                (format!("/v4/sports/{}/events", sport_key), Vec::new())
            }
            UpstreamRequest::EventOdds { sport_key, event_id } => (
                format!("/v4/sports/{}/events/{}/odds", sport_key, event_id),
                vec![
                    ("regions", self.match_regions.clone()),
                    ("markets", self.markets.clone()),
                    ("oddsFormat", "decimal".to_string()),
                ],
            ),
            UpstreamRequest::LeagueOdds { sport_key } => (
                format!("/v4/sports/{}/odds/", sport_key),
                vec![
                    ("bookmakers", self.league_bookmakers.clone()),
                    ("markets", self.markets.clone()),
                    ("oddsFormat", "decimal".to_string()),
                    ("includeBetLimits", "true".to_string()),
                ],
            ),
        }
    }
}

#[async_trait]
impl OddsSource for TheOddsApi {
    async fn send(
        &self,
        request: &UpstreamRequest,
        api_key: &str,
    ) -> Result<UpstreamResponse, OddsError> {
        let (path, mut query) = self.endpoint(request);
        query.push(("apiKey", api_key.to_string()));
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| OddsError::UpstreamUnreachable(e.without_url().to_string()))?;

        let status = resp.status().as_u16();
        let quota = quota_from_headers(resp.headers());
        let body = resp
            .text()
            .await
            .map_err(|e| OddsError::UpstreamUnreachable(e.without_url().to_string()))?;

        Ok(UpstreamResponse { status, quota, body })
    }
}
