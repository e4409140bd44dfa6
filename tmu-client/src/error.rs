use thiserror::Error;

use crate::api::ApiError;

/// Input rejected before any request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content cannot be empty")]
    EmptyContent,

    #[error("Content is {len} characters; the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("Please fill in all required fields")]
    MissingFields,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Please select a candidate")]
    NoSelection,
}

/// Failure of a user action against local state or the backend
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Another request is already in progress")]
    Busy,

    #[error("Post {0} is not loaded")]
    PostNotFound(String),

    #[error("Comment {0} is not loaded")]
    CommentNotFound(String),

    #[error("Election {0} is not loaded")]
    ElectionNotFound(String),

    #[error("Replies are not saved by the server and are disabled")]
    RepliesNotPersisted,

    #[error("Not signed in")]
    NotSignedIn,
}

pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    /// Message suitable for an alert or banner
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Validation(e) => e.to_string(),
            ActionError::Api(ApiError::Network(_)) => {
                "Network Error: Connection failed. Check your network and try again".to_string()
            }
            ActionError::Api(ApiError::Unauthorized(_)) => {
                "Authorization Error: Session expired. Please log in again".to_string()
            }
            ActionError::Api(ApiError::Api { status, .. }) if *status >= 500 => {
                "Server Error: The server is experiencing issues. Please try again later".to_string()
            }
            ActionError::Api(ApiError::BadRequest(msg))
            | ActionError::Api(ApiError::Rejected(msg))
            | ActionError::Api(ApiError::NotFound(msg)) => msg.clone(),
            other => format!("Error: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_validation_text_through() {
        let err = ActionError::from(ValidationError::PasswordMismatch);
        assert_eq!(err.user_message(), "Passwords do not match");
    }

    #[test]
    fn test_user_message_for_server_errors() {
        let err = ActionError::from(ApiError::Api { status: 502, message: "bad gateway".into() });
        assert!(err.user_message().starts_with("Server Error"));

        let err = ActionError::from(ApiError::Unauthorized("expired".into()));
        assert!(err.user_message().starts_with("Authorization Error"));

        let err = ActionError::from(ApiError::BadRequest("Already voted".into()));
        assert_eq!(err.user_message(), "Already voted");
    }
}
