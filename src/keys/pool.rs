//! Rotating pool of upstream API keys.
//!
//! Each key tracks its own quota state, fed back from upstream responses via
//! [`KeyPool::report`]. `acquire` walks the pool round-robin from the cursor
//! and hands out the first key that is neither exhausted nor cooling down
//! after a rate limit.

use crate::error::{OddsError, Result};
use crate::feed::types::ApiQuota;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Cooldown applied to a key after a 429.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

const MASK_PREFIX_LEN: usize = 8;

/// Short, non-secret form of a key for logs and status output.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(MASK_PREFIX_LEN).collect();
    format!("{}...", prefix)
}

#[derive(Debug, Clone)]
struct Credential {
    key: String,
    usage_count: u64,
    remaining_quota: Option<i64>,
    exhausted: bool,
    blocked_until: Option<Instant>,
}

impl Credential {
    fn new(key: String) -> Self {
        Self {
            key,
            usage_count: 0,
            remaining_quota: None,
            exhausted: false,
            blocked_until: None,
        }
    }

    fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    fn is_selectable(&self, now: Instant) -> bool {
        !self.exhausted && !self.is_blocked(now)
    }
}

struct PoolState {
    credentials: Vec<Credential>,
    cursor: usize,
}

impl PoolState {
    fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.credentials.len();
    }
}

/// Per-key view exposed by [`KeyPool::status`]. The key itself is masked.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    pub prefix: String,
    pub usage: u64,
    pub remaining: Option<i64>,
    pub exhausted: bool,
    pub blocked: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub total_keys: usize,
    pub active_keys: usize,
    pub exhausted_keys: usize,
    pub blocked_keys: usize,
    pub total_remaining: i64,
    pub keys: Vec<KeyStatus>,
}

pub struct KeyPool {
    state: Mutex<PoolState>,
    cooldown: Duration,
}

impl KeyPool {
    /// Build a pool from the configured key list. Fails on an empty list.
    pub fn new(keys: Vec<String>) -> Result<Self> {
        Self::with_cooldown(keys, DEFAULT_RATE_LIMIT_COOLDOWN)
    }

    pub fn with_cooldown(keys: Vec<String>, cooldown: Duration) -> Result<Self> {
        if keys.is_empty() {
            return Err(OddsError::NoKeys);
        }
        let credentials = keys.into_iter().map(Credential::new).collect();
        Ok(Self {
            state: Mutex::new(PoolState { credentials, cursor: 0 }),
            cooldown,
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // State is plain counters; a panic mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().credentials.len()
    }

    pub fn acquire(&self) -> Result<String> {
        self.acquire_at(Instant::now())
    }

    /// Return the first usable key at or after the cursor.
    ///
    /// Unusable keys are rotated past; an expired rate-limit block is cleared
    /// on the way. At most one full lap is scanned.
    pub fn acquire_at(&self, now: Instant) -> Result<String> {
        let mut state = self.lock();
        for _ in 0..state.credentials.len() {
            let cursor = state.cursor;
            let cred = &mut state.credentials[cursor];

            if cred.blocked_until.is_some_and(|until| until <= now) {
                cred.blocked_until = None;
            }

            if cred.is_selectable(now) {
                return Ok(cred.key.clone());
            }
            state.rotate();
        }
        Err(OddsError::PoolExhausted)
    }

    /// Advance the cursor to the next key.
    pub fn rotate(&self) {
        self.lock().rotate();
    }

    pub fn report(&self, key: &str, status: u16, quota: &ApiQuota) {
        self.report_at(key, status, quota, Instant::now());
    }

    /// Fold the outcome of a finished upstream call into the key's state.
    /// Unknown keys are ignored.
    pub fn report_at(&self, key: &str, status: u16, quota: &ApiQuota, now: Instant) {
        let mut state = self.lock();
        let Some(idx) = state.credentials.iter().position(|c| c.key == key) else {
            return;
        };
        let masked = mask_key(key);

        if let Some(remaining) = quota.requests_remaining {
            let cred = &mut state.credentials[idx];
            cred.remaining_quota = Some(remaining);
            tracing::debug!(
                key = %masked,
                remaining,
                used = ?quota.requests_used,
                "API key quota updated"
            );
            if remaining <= 0 {
                tracing::warn!(key = %masked, "API key has 0 remaining requests, marking exhausted");
                cred.exhausted = true;
                state.rotate();
                return;
            }
        }

        match status {
            200 => state.credentials[idx].usage_count += 1,
            429 => {
                tracing::warn!(key = %masked, cooldown_s = self.cooldown.as_secs(), "API key hit rate limit");
                state.credentials[idx].blocked_until = Some(now + self.cooldown);
                state.rotate();
            }
            401 => {
                tracing::warn!(key = %masked, "API key quota exceeded or invalid");
                state.credentials[idx].exhausted = true;
                state.rotate();
            }
            _ => {}
        }
    }

    pub fn status(&self) -> PoolStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> PoolStatus {
        let state = self.lock();
        let creds = &state.credentials;
        PoolStatus {
            total_keys: creds.len(),
            active_keys: creds.iter().filter(|c| c.is_selectable(now)).count(),
            exhausted_keys: creds.iter().filter(|c| c.exhausted).count(),
            blocked_keys: creds.iter().filter(|c| c.is_blocked(now)).count(),
            total_remaining: creds.iter().filter_map(|c| c.remaining_quota).sum(),
            keys: creds
                .iter()
                .map(|c| KeyStatus {
                    prefix: mask_key(&c.key),
                    usage: c.usage_count,
                    remaining: c.remaining_quota,
                    exhausted: c.exhausted,
                    blocked: c.is_blocked(now),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> KeyPool {
        let keys = (0..n).map(|i| format!("key-{i}-secretsecret")).collect();
        KeyPool::new(keys).unwrap()
    }

    fn remaining(n: i64) -> ApiQuota {
        ApiQuota { requests_used: Some(100), requests_remaining: Some(n) }
    }

    #[test]
    fn test_empty_pool_fails_fast() {
        assert!(matches!(KeyPool::new(vec![]), Err(OddsError::NoKeys)));
    }

    #[test]
    fn test_acquire_repeatedly_without_reports() {
        let pool = pool(3);
        for _ in 0..4 {
            assert!(pool.acquire().is_ok());
        }
    }

    #[test]
    fn test_acquire_does_not_advance_past_usable_key() {
        let pool = pool(3);
        let first = pool.acquire().unwrap();
        assert_eq!(pool.acquire().unwrap(), first);
    }

    #[test]
    fn test_rotate_wraps() {
        let pool = pool(2);
        let a = pool.acquire().unwrap();
        pool.rotate();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        pool.rotate();
        assert_eq!(pool.acquire().unwrap(), a);
    }

    #[test]
    fn test_401_marks_exhausted_and_skips() {
        let pool = pool(3);
        let bad = pool.acquire().unwrap();
        pool.report(&bad, 401, &ApiQuota::default());
        for _ in 0..5 {
            assert_ne!(pool.acquire().unwrap(), bad);
        }
        assert_eq!(pool.status().exhausted_keys, 1);
    }

    #[test]
    fn test_all_exhausted_fails() {
        let pool = pool(2);
        for _ in 0..2 {
            let k = pool.acquire().unwrap();
            pool.report(&k, 401, &ApiQuota::default());
        }
        assert_eq!(pool.acquire(), Err(OddsError::PoolExhausted));
    }

    #[test]
    fn test_zero_remaining_marks_exhausted_even_on_200() {
        let pool = pool(2);
        let k = pool.acquire().unwrap();
        pool.report(&k, 200, &remaining(0));
        let status = pool.status();
        assert_eq!(status.exhausted_keys, 1);
        assert_eq!(status.keys[0].usage, 0);
        assert_ne!(pool.acquire().unwrap(), k);
    }

    #[test]
    fn test_success_increments_usage_and_stores_remaining() {
        let pool = pool(1);
        let k = pool.acquire().unwrap();
        pool.report(&k, 200, &remaining(450));
        pool.report(&k, 200, &ApiQuota::default());
        let status = pool.status();
        assert_eq!(status.keys[0].usage, 2);
        assert_eq!(status.keys[0].remaining, Some(450));
        assert_eq!(status.total_remaining, 450);
    }

    #[test]
    fn test_rate_limit_blocks_then_recovers() {
        let pool = pool(2);
        let t0 = Instant::now();
        let k = pool.acquire_at(t0).unwrap();
        pool.report_at(&k, 429, &ApiQuota::default(), t0);

        assert_ne!(pool.acquire_at(t0).unwrap(), k);
        let status = pool.status_at(t0);
        assert_eq!(status.blocked_keys, 1);
        assert_eq!(status.active_keys, 1);

        // Exhaust the other key so only the blocked one could be served.
        let other = pool.acquire_at(t0).unwrap();
        pool.report_at(&other, 401, &ApiQuota::default(), t0);
        assert_eq!(pool.acquire_at(t0 + Duration::from_secs(59)), Err(OddsError::PoolExhausted));
        assert_eq!(pool.acquire_at(t0 + Duration::from_secs(60)).unwrap(), k);
    }

    #[test]
    fn test_unknown_key_is_noop() {
        let pool = pool(2);
        pool.report("not-a-key", 401, &remaining(0));
        let status = pool.status();
        assert_eq!(status.active_keys, 2);
        assert_eq!(status.exhausted_keys, 0);
    }

    #[test]
    fn test_status_masks_keys() {
        let pool = KeyPool::new(vec!["abcdefghijklmnop".to_string()]).unwrap();
        let status = pool.status();
        assert_eq!(status.keys[0].prefix, "abcdefgh...");
        assert!(!format!("{:?}", status).contains("ijklmnop"));
    }

    #[test]
    fn test_mask_short_key() {
        assert_eq!(mask_key("abc"), "abc...");
    }
}
