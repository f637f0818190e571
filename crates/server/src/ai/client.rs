//! Messages API client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::ClaudeConfig;

use super::error::{ApiErrorResponse, ClaudeError};
use super::types::{ChatRequest, ChatResponse, Message};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Anthropic Messages API.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ClaudeClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::Config` if the API key is not a valid header
    /// value, or `ClaudeError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        let api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ClaudeError::Config("API key contains invalid header characters".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
                model: config.model.clone(),
            }),
        })
    }

    /// Model id requests are sent with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Send a conversation and wait for the complete reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with an
    /// error status.
    #[instrument(skip(self, messages, system), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        max_tokens: u32,
    ) -> Result<ChatResponse, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens,
            messages,
            system,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            let parsed: ChatResponse = serde_json::from_str(&body)
                .map_err(|e| ClaudeError::Parse(format!("Failed to parse response: {e}")))?;
            tracing::debug!(
                input_tokens = parsed.usage.input_tokens,
                output_tokens = parsed.usage.output_tokens,
                "Model reply received"
            );
            Ok(parsed)
        } else {
            Err(error_from_status(status, response).await)
        }
    }
}

/// Turn an error status into a `ClaudeError`.
async fn error_from_status(status: reqwest::StatusCode, response: reqwest::Response) -> ClaudeError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return ClaudeError::RateLimited(retry_after);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ClaudeError::Unauthorized("Invalid API key".to_string());
    }

    match response.text().await {
        Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_error) => ClaudeError::Api {
                status: status.as_u16(),
                error_type: api_error.error.error_type,
                message: api_error.error.message,
            },
            Err(_) => ClaudeError::Api {
                status: status.as_u16(),
                error_type: "unknown".to_string(),
                message: body,
            },
        },
        Err(e) => ClaudeError::Http(e),
    }
}
