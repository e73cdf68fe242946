use thiserror::Error;

/// Failure outcomes of an odds request.
///
/// Devig precondition failures are not represented here: they are a
/// defined "no result" (`None`) and the caller falls back to the raw price.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OddsError {
    #[error("no API keys configured")]
    NoKeys,
    #[error("all API keys are exhausted or rate-limited")]
    PoolExhausted,
    #[error("upstream rejected the API key ({status})")]
    UpstreamRejected { status: u16 },
    #[error("upstream rate limited the API key")]
    UpstreamRateLimited,
    #[error("upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("upstream API timed out or is unreachable: {0}")]
    UpstreamUnreachable(String),
    #[error("failed to parse upstream response: {0}")]
    Decode(String),
}

impl OddsError {
    /// True for every condition the caller should surface as
    /// "odds unavailable" (5xx-class) rather than a bad request.
    /// A 4xx passed through from upstream is a bad request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            OddsError::Decode(_) => false,
            OddsError::UpstreamStatus { status, .. } => !(400..500).contains(status),
            _ => true,
        }
    }

    /// HTTP status a routing layer would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            OddsError::NoKeys => 503,
            OddsError::PoolExhausted => 503,
            OddsError::UpstreamRejected { .. } => 503,
            OddsError::UpstreamRateLimited => 503,
            OddsError::UpstreamStatus { status, .. } => *status,
            OddsError::UpstreamUnreachable(_) => 504,
            OddsError::Decode(_) => 502,
        }
    }
}

impl From<serde_json::Error> for OddsError {
    fn from(err: serde_json::Error) -> Self {
        OddsError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OddsError>;

/// Rejected betslip edits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BetslipError {
    #[error("bookmaker {0} has no prices in this market")]
    UnknownBookmaker(String),
    #[error("{bookmaker} does not quote {outcome}")]
    OutcomeNotQuoted { bookmaker: String, outcome: String },
    #[error("custom price must be greater than 1.0, got {0}")]
    InvalidCustomPrice(f64),
    #[error("no betslip selection {0}")]
    UnknownSelection(String),
}
