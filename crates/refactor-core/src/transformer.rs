//! Code transformer: the language-model collaborator.
//!
//! The orchestrator only sees [`CodeTransformer`]. The live implementation
//! talks to any OpenAI-compatible chat-completions endpoint (Groq by default)
//! with the sampling temperature pinned to zero.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::TransformError;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Turns an instruction plus content into source text.
#[async_trait]
pub trait CodeTransformer: Send + Sync {
    /// Returns raw source text with any code-fence decoration removed.
    async fn transform(&self, instruction: &str, content: &str) -> Result<String, TransformError>;
}

/// Remove markdown code fences (with or without a language tag) and trim.
pub fn strip_code_fences(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE
        .get_or_init(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("static regex is valid"));
    re.replace_all(text, "").trim().to_string()
}

/// Settings for the chat-completions transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Transformer backed by an OpenAI-compatible `/chat/completions` API.
///
/// The instruction is sent as the system message and the content as the user
/// message.
pub struct ChatCompletionsTransformer {
    client: reqwest::Client,
    config: TransformerConfig,
    api_key: String,
}

impl ChatCompletionsTransformer {
    pub fn new(config: TransformerConfig) -> Result<Self, TransformError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TransformError::MissingCredentials("GROQ_API_KEY".into()))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("refactor-core/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransformError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CodeTransformer for ChatCompletionsTransformer {
    async fn transform(&self, instruction: &str, content: &str) -> Result<String, TransformError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "requesting completion");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransformError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransformError::Api { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransformError::Malformed(e.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(TransformError::EmptyResponse)?;

        Ok(strip_code_fences(&text))
    }
}
