use thiserror::Error;

/// Failures that cross the pipeline boundary. Provider failures never do:
/// they degrade to fewer (or zero) results instead.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl RecommendError {
    /// Message safe to show to API callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            RecommendError::InvalidArgument(_) => "Invalid recommendation request",
            RecommendError::ServiceUnavailable(_) => {
                "Recommendation service is temporarily unavailable"
            }
        }
    }
}
