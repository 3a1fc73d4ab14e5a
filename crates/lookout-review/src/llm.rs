use std::time::Duration;

use async_trait::async_trait;
use lookout_core::{LlmConfig, LookoutError, TokenUsage};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use lookout_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Review this code");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use lookout_review::llm::Role;
///
/// assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Text and token counters of one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    /// Content of the first choice.
    pub content: String,
    /// Token counters, when the provider reported them.
    pub usage: Option<TokenUsage>,
}

/// A chat model that answers a single prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs and the summary footer.
    fn model(&self) -> &str;

    /// Send `prompt` as one user-role message and return the reply.
    async fn complete(&self, prompt: &str) -> Result<ChatCompletion, LookoutError>;
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes `{base_url}/chat/completions`:
/// OpenAI, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use lookout_core::LlmConfig;
/// use lookout_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LookoutError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookoutError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Full URL of the completions endpoint.
    pub fn endpoint(&self) -> String {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base_url}/chat/completions")
    }

    /// Send a chat completion request and return the first choice.
    ///
    /// Requests a JSON object response at the configured temperature.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Llm`] on transport errors, non-2xx statuses or
    /// a reply without a message.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatCompletion, LookoutError> {
        let url = self.endpoint();
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
        });

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!(url = %url, model = %self.config.model, "sending chat completion");
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| LookoutError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LookoutError::Llm(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let reply: CompletionReply = response
            .json()
            .await
            .map_err(|e| LookoutError::Llm(format!("failed to parse response: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LookoutError::Llm("response contained no message content".into()))?;

        Ok(ChatCompletion {
            content,
            usage: reply.usage,
        })
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<ChatCompletion, LookoutError> {
        self.chat(vec![ChatMessage::user(prompt)]).await
    }
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
