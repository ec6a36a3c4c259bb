use thiserror::Error;

/// Main error type for chainchat
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Message is empty")]
    EmptyInput,

    #[error("UI error: {0}")]
    UIError(String),
}

impl ChatError {
    /// Configuration problems are detected locally, before any request is sent
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    /// Short label used in notices and structured output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config",
            Self::AuthError(_) => "auth",
            Self::RateLimited(_) => "rate_limit",
            Self::NetworkError(_) => "network",
            Self::ApiError { .. } => "api",
            Self::MalformedResponse(_) => "malformed_response",
            Self::IoError(_) => "io",
            Self::EmptyInput => "input",
            Self::UIError(_) => "ui",
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkError(format!("request timed out: {}", err))
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(ChatError::ConfigError("missing key".into()).is_config());
        assert!(!ChatError::NetworkError("down".into()).is_config());
        assert_eq!(ChatError::RateLimited("slow down".into()).kind(), "rate_limit");
        assert_eq!(
            ChatError::ApiError {
                status: 500,
                message: "boom".into()
            }
            .to_string(),
            "API error (500): boom"
        );
    }
}
