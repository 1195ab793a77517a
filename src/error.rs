use thiserror::Error;

#[derive(Debug, Error)]
pub enum CostopsError {
    /// Capability filtering left no candidate models. The one hard failure
    /// of the selection path.
    #[error("no model satisfies the requested capabilities")]
    NoEligibleModel,

    #[error("usage tracking is disabled")]
    TrackingDisabled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CostopsError>;
