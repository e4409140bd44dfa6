use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Response body that cannot be normalized into the canonical schema
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// 2xx response whose body reported `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Build the error for a non-2xx status carrying `message`.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => ApiError::NotFound(message),
            401 => ApiError::Unauthorized(message),
            400 => ApiError::BadRequest(message),
            _ => ApiError::Api { status, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
