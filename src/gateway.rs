//! Completion gateway
//!
//! Sends one ordered message list to the chat-completion provider and hands
//! back the text of the first completion. There is no retry and no caching:
//! every call is exactly one outbound request.

use std::time::Duration;

use async_trait::async_trait;
use genai::ModelIden;
use genai::resolver::{AuthData, AuthResolver};
use thiserror::Error;

use crate::chat::ChatMessage;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Upper bound on one completion call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider call failed, timed out or returned no choices.
    #[error("completion request failed: {0}")]
    Upstream(String),

    #[error("completion has no text content")]
    EmptyContent,
}

#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Returns the text of the first completion for `messages`.
    async fn complete(
        &self,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError>;
}

/// Create a genai client, authenticating with `api_key` when given.
///
/// Without a key genai falls back to the provider's usual environment
/// variable (for example `OPENAI_API_KEY`).
#[must_use]
pub fn create_genai_client(api_key: Option<&str>) -> genai::Client {
    match api_key {
        Some(key) => {
            let key = key.to_string();
            let auth_resolver = AuthResolver::from_resolver_fn(
                move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                    Ok(Some(AuthData::from_single(key.clone())))
                },
            );
            genai::Client::builder().with_auth_resolver(auth_resolver).build()
        }
        None => genai::Client::default(),
    }
}

/// Gateway backed by a genai client and a fixed model.
pub struct GenAiGateway {
    client: genai::Client,
    model: String,
    timeout: Duration,
}

impl GenAiGateway {
    #[must_use]
    pub fn new(
        client: genai::Client,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionGateway for GenAiGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let chat_req = messages
            .iter()
            .fold(genai::chat::ChatRequest::default(), |req, message| {
                req.append_message(genai::chat::ChatMessage::from(message))
            });

        // Sampling options stay at provider defaults.
        let call = self.client.exec_chat(self.model.as_str(), chat_req, None);

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Upstream(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        completion_text(response.first_text())
    }
}

/// A missing, empty or whitespace-only first completion is `EmptyContent`.
fn completion_text(first_text: Option<&str>) -> Result<String, GatewayError> {
    match first_text {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(GatewayError::EmptyContent),
    }
}
