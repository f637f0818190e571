//! Error types for the model provider client.

use thiserror::Error;

/// Errors that can occur when calling the Messages API.
///
/// Display strings keep the upstream status visible (`401`, `429`, `529`...)
/// so callers can classify failures from the message alone.
#[derive(Debug, Error)]
pub enum ClaudeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error body.
    #[error("API error {status} ({error_type}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error type from the API.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited (429), retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized (401): {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The client could not be built from its configuration.
    #[error("client configuration error: {0}")]
    Config(String),
}

/// API error response body.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_error_display() {
        let err = ClaudeError::RateLimited(60);
        assert_eq!(err.to_string(), "rate limited (429), retry after 60 seconds");

        let err = ClaudeError::Api {
            status: 529,
            error_type: "overloaded_error".to_string(),
            message: "Overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error 529 (overloaded_error): Overloaded");

        let err = ClaudeError::Unauthorized("invalid x-api-key".to_string());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {
                "type": "invalid_request_error",
                "message": "max_tokens is too large"
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.error_type, "error");
        assert_eq!(response.error.error_type, "invalid_request_error");
        assert_eq!(response.error.message, "max_tokens is too large");
    }
}
