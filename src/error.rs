use thiserror::Error;

/// Errors that reach the caller of the personalization pipeline.
#[derive(Debug, Error)]
pub enum PersonalizeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Template error: {0}")]
    TemplateError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PersonalizeError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, PersonalizeError::InvalidInput(_))
    }
}

impl From<image::ImageError> for PersonalizeError {
    fn from(err: image::ImageError) -> Self {
        PersonalizeError::InternalError(format!("image processing failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for PersonalizeError {
    fn from(err: tokio::task::JoinError) -> Self {
        PersonalizeError::InternalError(format!("image worker failed: {}", err))
    }
}

/// Failures of the external prediction job. None of these reach the HTTP
/// caller; the orchestrator recovers from all of them with the local fallback.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Prediction submission failed: {0}")]
    SubmissionError(String),
    #[error("Prediction failed: {0}")]
    JobFailedError(String),
    #[error("Prediction timed out after {attempts} polls")]
    JobTimeoutError { attempts: u32 },
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Prediction output could not be decoded: {0}")]
    InvalidOutputError(String),
    #[error("Prediction cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::TransportError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersonalizeError>;
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
