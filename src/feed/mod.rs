pub mod the_odds_api;
pub mod types;

use crate::error::OddsError;
use async_trait::async_trait;
use types::{UpstreamRequest, UpstreamResponse};

/// Upstream odds provider.
///
/// Returns every completed exchange, whatever its status code, so the caller
/// can feed quota headers back to the key pool. `Err` is reserved for calls
/// that never produced a response (timeout, connection failure).
#[async_trait]
pub trait OddsSource: Send + Sync {
    async fn send(
        &self,
        request: &UpstreamRequest,
        api_key: &str,
    ) -> Result<UpstreamResponse, OddsError>;
}
