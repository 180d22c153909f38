use thiserror::Error;

/// Failures talking to the model API. Shown to the user verbatim; never
/// retried.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("cannot connect to the model API: {0}")]
    Connection(String),

    #[error("model API request timed out")]
    Timeout,

    #[error("invalid or unauthorized API key: {0}")]
    AuthFailed(String),

    #[error("model API quota or rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model API error: {0}")]
    Api(String),

    #[error("model returned no text: {0}")]
    EmptyResponse(String),

    #[error("model response parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
