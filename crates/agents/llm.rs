use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chat-completions endpoint base.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Request timeout for a single completion.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat-completion failures.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure.
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status from the API.
    #[error("chat API returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// A well-formed response with no message content.
    #[error("chat response contained no message content")]
    MissingContent,
    /// A scripted client ran out of replies.
    #[error("scripted chat exhausted after {0} replies")]
    ScriptExhausted(usize),
}

/// One message in a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// System-role message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// User-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    /// Assistant-role message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Anything that can turn a transcript into the next assistant message.
/// Decision agents and the simulated user are generic over this, which is
/// what makes episodes scriptable in tests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Completes the transcript with one assistant message.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat client.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiChat {
    /// Creates a client with defaults suitable for decision making
    /// (low temperature, short answers).
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
            temperature: 0.3,
            max_tokens: 400,
        }
    }

    /// Overrides the endpoint base, for OpenAI-compatible local servers.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Overrides the completion length cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl ChatClient for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::MissingContent)
    }
}

/// Deterministic client that replays a fixed list of replies. Once the list
/// is exhausted every call errors, which surfaces over-long test episodes.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    total: usize,
}

impl ScriptedChat {
    /// Creates a client that will serve the given replies in order.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: VecDeque<String> = replies.into_iter().map(Into::into).collect();
        let total = queue.len();
        Self {
            replies: Mutex::new(queue),
            total,
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.replies
            .lock()
            .pop_front()
            .ok_or(LlmError::ScriptExhausted(self.total))
    }
}
