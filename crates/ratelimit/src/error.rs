use chatshop_state::StateError;

/// Errors from rate limiter write operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("counter store error: {0}")]
    Store(#[from] StateError),

    #[error("corrupt rate limit record: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for RateLimitError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}
