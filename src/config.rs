use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_FILE: &str = ".env";
const KEYS_VAR: &str = "ODDS_API_KEYS";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub odds_api: OddsApiConfig,
    #[serde(default)]
    pub bookmakers: BookmakersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub key_pool: KeyPoolConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OddsApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Regions scanned by single-match requests.
    #[serde(default = "default_match_regions")]
    pub match_regions: String,
    #[serde(default = "default_markets")]
    pub markets: String,
    /// Only sports in this group are listed.
    #[serde(default = "default_sport_group")]
    pub sport_group: String,
}

fn default_base_url() -> String { "https://api.the-odds-api.com".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_match_regions() -> String { "us,us_ex,uk,eu,au".to_string() }
fn default_markets() -> String { "h2h,totals".to_string() }
fn default_sport_group() -> String { "Soccer".to_string() }

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_timeout_ms(),
            match_regions: default_match_regions(),
            markets: default_markets(),
            sport_group: default_sport_group(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookmakersConfig {
    /// Allow-list of bookmaker keys whose quotes are kept.
    #[serde(default = "default_sharp")]
    pub sharp: Vec<String>,
    /// Bookmakers requested by league-level calls (`bookmakers=` parameter).
    #[serde(default = "default_league_request")]
    pub league_request: Vec<String>,
    /// Keys starting with one of these prefixes share one liquidity pool;
    /// only the first-seen variant survives.
    #[serde(default = "default_dedup_prefixes")]
    pub dedup_prefixes: Vec<String>,
}

fn default_sharp() -> Vec<String> {
    [
        "pinnacle",
        "betfair_ex_eu",
        "betfair_ex_uk",
        "bookmaker",
        "betonlineag",
        "matchbook",
        "smarkets",
        "betanysports",
        "lowvig",
        "betway",
        "novig",
        "polymarket",
        "kalshi",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_league_request() -> Vec<String> {
    [
        "pinnacle",
        "smarkets",
        "betfair_ex_uk",
        "betonlineag",
        "kalshi",
        "matchbook",
        "lowvig",
        "polymarket",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_dedup_prefixes() -> Vec<String> {
    vec!["betfair".to_string()]
}

impl Default for BookmakersConfig {
    fn default() -> Self {
        Self {
            sharp: default_sharp(),
            league_request: default_league_request(),
            dedup_prefixes: default_dedup_prefixes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_odds_ttl")]
    pub odds_ttl_s: u64,
    #[serde(default = "default_odds_ttl")]
    pub league_odds_ttl_s: u64,
    #[serde(default = "default_sports_ttl")]
    pub sports_ttl_s: u64,
    #[serde(default = "default_events_ttl")]
    pub events_ttl_s: u64,
}

fn default_odds_ttl() -> u64 { 5 * 60 }
fn default_sports_ttl() -> u64 { 30 * 60 }
fn default_events_ttl() -> u64 { 10 * 60 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            odds_ttl_s: default_odds_ttl(),
            league_odds_ttl_s: default_odds_ttl(),
            sports_ttl_s: default_sports_ttl(),
            events_ttl_s: default_events_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn odds_ttl(&self) -> Duration { Duration::from_secs(self.odds_ttl_s) }
    pub fn league_odds_ttl(&self) -> Duration { Duration::from_secs(self.league_odds_ttl_s) }
    pub fn sports_ttl(&self) -> Duration { Duration::from_secs(self.sports_ttl_s) }
    pub fn events_ttl(&self) -> Duration { Duration::from_secs(self.events_ttl_s) }
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeyPoolConfig {
    #[serde(default = "default_cooldown")]
    pub rate_limit_cooldown_s: u64,
}

fn default_cooldown() -> u64 { 60 }

impl Default for KeyPoolConfig {
    fn default() -> Self {
        Self { rate_limit_cooldown_s: default_cooldown() }
    }
}

impl KeyPoolConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_s)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config TOML")
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// Upstream API keys, read once at startup from `ODDS_API_KEYS`
    /// (comma-separated).
    pub fn odds_api_keys() -> Result<Vec<String>> {
        let raw = std::env::var(KEYS_VAR)
            .with_context(|| format!("{} is not set", KEYS_VAR))?;
        let keys = split_keys(&raw);
        if keys.is_empty() {
            anyhow::bail!("{} contains no keys", KEYS_VAR);
        }
        Ok(keys)
    }
}

/// Split a comma-separated key list, dropping blanks and invisible chars.
pub fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(sanitize_key)
        .filter(|k| !k.is_empty())
        .collect()
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
