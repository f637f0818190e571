//! Generative writing assistant.
//!
//! Story ideas, draft improvement, title suggestions and a persona chatbot,
//! all backed by the Anthropic Messages API. The assistant is optional: with
//! no API key configured the structured flows report `NotConfigured` and the
//! chat answers with a canned configuration reply.

pub mod client;
pub mod error;
pub mod flows;
pub mod types;

use thiserror::Error;

pub use client::ClaudeClient;
pub use error::ClaudeError;
pub use flows::{ChatInput, ChatReply, Flow};

use crate::config::ClaudeConfig;

/// Errors from running a flow.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("writing assistant is not configured")]
    NotConfigured,

    #[error("model provider error: {0}")]
    Provider(#[from] ClaudeError),

    #[error("model returned invalid output: {0}")]
    InvalidOutput(String),
}

/// Runs flows against the configured provider.
#[derive(Clone)]
pub struct AiService {
    client: Option<ClaudeClient>,
}

impl AiService {
    /// Build the service; `None` disables the assistant.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError` if the client cannot be built.
    pub fn new(config: Option<&ClaudeConfig>) -> Result<Self, ClaudeError> {
        let client = config.map(ClaudeClient::new).transpose()?;
        Ok(Self { client })
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { client: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Run a flow and parse its JSON output. Input is assumed validated.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::NotConfigured` without a provider,
    /// `FlowError::Provider` if the call fails and
    /// `FlowError::InvalidOutput` if the reply does not match the schema.
    pub async fn run<F: Flow + Sync>(&self, input: &F) -> Result<F::Output, FlowError> {
        let client = self.client.as_ref().ok_or(FlowError::NotConfigured)?;
        let response = client
            .chat(input.messages(), Some(input.system_prompt()), F::MAX_TOKENS)
            .await?;
        let text = response.text();

        let json = flows::extract_json(&text)
            .ok_or_else(|| FlowError::InvalidOutput("reply contains no JSON object".to_owned()))?;
        let output: F::Output = serde_json::from_str(json)
            .map_err(|e| FlowError::InvalidOutput(e.to_string()))?;
        F::check(&output).map_err(FlowError::InvalidOutput)?;

        tracing::info!(flow = F::NAME, "Flow completed");
        Ok(output)
    }

    /// Persona chat. Never fails: provider problems become canned replies.
    pub async fn chat(&self, input: &ChatInput) -> ChatReply {
        match self.run(input).await {
            Ok(reply) => reply,
            Err(FlowError::NotConfigured) => ChatReply {
                reply: flows::fallback::CONFIGURATION.to_owned(),
            },
            Err(e) => {
                tracing::warn!(flow = ChatInput::NAME, error = %e, "Chat fell back to canned reply");
                ChatReply {
                    reply: flows::fallback::for_error(&e.to_string()).to_owned(),
                }
            }
        }
    }
}
