//! Client error type

/// Message shown when the server gives no usable message
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally before any request was made
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Action already in progress: {0}")]
    InFlight(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Forbidden(msg) => msg.clone(),
            Self::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::InFlight(_) => "This action is already in progress".to_string(),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ClientError::Server {
            status: 400,
            message: "Invalid verification code".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid verification code");
    }

    #[test]
    fn test_user_message_fallback() {
        let blank = ClientError::Server {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(blank.user_message(), FALLBACK_MESSAGE);
        assert_eq!(ClientError::Network("timed out".to_string()).user_message(), FALLBACK_MESSAGE);
        assert_eq!(ClientError::Decode("eof".to_string()).user_message(), FALLBACK_MESSAGE);
    }
}
