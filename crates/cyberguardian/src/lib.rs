//! Prompt flows, model client and account store behind the CyberGuardian Pro
//! security dashboard.
//!
//! Every dashboard feature is a *flow*: user text is validated, interpolated
//! into a prompt, sent to a hosted model through the
//! [OpenRouter](https://openrouter.ai/) chat completions API, and the JSON
//! reply is checked against the flow's output schema before it is returned.
//!
//! ```ignore
//! use cyberguardian::prelude::*;
//! use cyberguardian::flow::phishing::{PhishingAnalysis, PhishingInput};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenRouterClient::new(std::env::var("OPENROUTER_KEY")?)?;
//!     let settings = ModelSettings::default();
//!     let runner = FlowRunner::new(&client, &settings);
//!
//!     let input = PhishingInput {
//!         content: "Your mailbox is full, verify your password here: ...".into(),
//!         sender: Some("it-support@examp1e.com".into()),
//!         subject: None,
//!     };
//!     let outcome = runner.run::<PhishingAnalysis>(&input).await?;
//!     println!("risk score: {}", outcome.output.risk_score);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`flow`] | [`Flow`](flow::Flow) trait, [`FlowRunner`](flow::FlowRunner), output parsing, the eight dashboard flows |
//! | [`store`] | [`DocumentStore`](store::DocumentStore) trait, in-memory and file-backed stores, user profile and settings records |
//! | [`config`] | [`GuardianConfig`](config::GuardianConfig): TOML file, environment overrides, validation |
//! | [`error`] | Error enums for every layer |

pub mod config;
pub mod error;
pub mod flow;
pub mod prelude;
pub mod store;
pub mod trace;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use error::ModelError;

// Re-export schemars for downstream crates.
pub use schemars;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for all flows.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Default completion budget for a single flow reply.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Flow outputs use this both to tell the model what
/// to produce and to validate what it produced.
///
/// # Example
///
/// ```
/// use cyberguardian::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Verdict {
///     score: u8,
///     #[serde(default)]
///     note: Option<String>,
/// }
///
/// let schema = json_schema_for::<Verdict>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"score".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Debug, Clone)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonObject,
        }
    }
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`CompletionModel::complete`].
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Model seam ─────────────────────────────────────────────────────

/// Boxed future returned by [`CompletionModel::complete`].
pub type CompletionFuture<'a> = BoxFuture<'a, Result<ChatCompletion, ModelError>>;

/// Anything that can answer a chat completion request.
///
/// [`OpenRouterClient`] is the production implementation; tests plug in
/// scripted models.
pub trait CompletionModel: Send + Sync {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a>;
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    /// Create a new client for the public OpenRouter endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ModelError> {
        Self::with_endpoint(api_key, OPENROUTER_URL)
    }

    /// Create a client that posts to `endpoint` instead of OpenRouter. Any
    /// OpenAI-compatible chat completions URL works.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cyberguardian/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(ModelError::Client)?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            referer: "https://github.com/cyberguardian-pro/cyberguardian".to_string(),
            title: "CyberGuardian Pro".to_string(),
        })
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, ModelError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(ModelError::Transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(ModelError::Transport)?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(ModelError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: RawChatResponse = serde_json::from_str(&text).map_err(ModelError::Decode)?;

        if let Some(err) = parsed.error {
            return Err(ModelError::Api(err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        let choice = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or(ModelError::NoChoices)?;

        Ok(ChatCompletion {
            content: choice.message.content,
            usage: parsed.usage,
            finish_reason: choice.finish_reason,
        })
    }
}

impl CompletionModel for OpenRouterClient {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
        Box::pin(self.chat(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content, "hello");

        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.role.to_string(), "user");
    }

    #[test]
    fn chat_request_default_skips_empty_fields() {
        let req = ChatRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn response_format_serializes_as_json_object() {
        let req = ChatRequest {
            model: "m".into(),
            response_format: Some(ResponseFormat::json_object()),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn raw_response_parses_usage_and_content() {
        let raw = r#"{
            "choices": [{"message": {"content": "{}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: RawChatResponse = serde_json::from_str(raw).unwrap();
        let choice = parsed.choices.unwrap().into_iter().next().unwrap();
        assert_eq!(choice.message.content.as_deref(), Some("{}"));
        assert_eq!(parsed.usage.unwrap().total_tokens, Some(12));
    }

    #[test]
    fn client_uses_custom_endpoint() {
        let client = OpenRouterClient::with_endpoint("key", "http://127.0.0.1:9/v1").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/v1");
        let default = OpenRouterClient::new("key").unwrap();
        assert_eq!(default.endpoint(), OPENROUTER_URL);
    }
}
