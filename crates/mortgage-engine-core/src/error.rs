use thiserror::Error;

#[derive(Debug, Error)]
pub enum MortgageEngineError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid assumptions: {0}")]
    InvalidAssumptions(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Output metric '{metric}' not found in {model} result")]
    UnknownMetric { model: String, metric: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for MortgageEngineError {
    fn from(e: serde_json::Error) -> Self {
        MortgageEngineError::SerializationError(e.to_string())
    }
}
