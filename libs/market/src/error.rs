use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown venue: {0}")]
    UnknownVenue(String),

    #[error("invalid venue definition: {0}")]
    InvalidVenue(String),

    #[error("status evaluation failed: {0}")]
    Evaluation(String),

    #[error("failed to read venue file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse venue file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MarketError>;

impl MarketError {
    /// Errors the requesting user can fix by retrying with different input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            MarketError::InvalidTimezone(_) | MarketError::InvalidInput(_)
        )
    }
}
