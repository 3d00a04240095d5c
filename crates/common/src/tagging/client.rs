//! Chat-completion client abstraction

use crate::config::OpenAiConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single system + user prompt exchange
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Why a completion did not produce text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Non-2xx response. `error_type` is the provider's `error.type`, if any.
    Status {
        status: u16,
        error_type: Option<String>,
        message: Option<String>,
    },
    /// Connection, TLS, or timeout failure
    Transport(String),
    /// Body did not contain a first choice with text content
    Malformed(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Status { status, error_type, message } => write!(
                f,
                "status {} ({}): {}",
                status,
                error_type.as_deref().unwrap_or("unknown"),
                message.as_deref().unwrap_or("Unknown error"),
            ),
            CompletionError::Transport(e) => write!(f, "transport error: {}", e),
            CompletionError::Malformed(e) => write!(f, "malformed response: {}", e),
        }
    }
}

/// Trait for chat-completion providers
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Text content of the first completion choice
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, CompletionError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat-completion client
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

impl OpenAiChatClient {
    /// Create a new client with the given credential
    pub fn new(api_key: String, config: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.user },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &text));
        }

        first_choice_content(&text)
    }
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, CompletionError> {
        let start = Instant::now();
        let result = self.send(request).await;
        let elapsed = start.elapsed().as_secs_f64();
        crate::metrics::record_completion(elapsed, &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Turn a non-2xx response into a [`CompletionError`], keeping the
/// provider's `error.type` and `error.message` when the body has them.
pub fn classify_failure(status: u16, body: &str) -> CompletionError {
    let (error_type, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.kind, envelope.error.message),
        Err(_) => (None, None),
    };

    CompletionError::Status { status, error_type, message }
}

/// Extract `choices[0].message.content` from a success body
pub fn first_choice_content(body: &str) -> std::result::Result<String, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::Malformed("no completion content".to_string()))
}

/// Create a completion client when a credential is configured
pub fn create_completion_client(
    config: &OpenAiConfig,
) -> Result<Option<Arc<dyn CompletionClient>>> {
    match config.credential() {
        Some(key) => {
            let client = OpenAiChatClient::new(key.to_string(), config)?;
            Ok(Some(Arc::new(client)))
        }
        None => {
            tracing::warn!(
                "OpenAI API key not configured; tag extraction will use keyword fallback"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"a, b, c"}}]}"#;
        assert_eq!(first_choice_content(body).unwrap(), "a, b, c");
    }

    #[test]
    fn test_first_choice_content_missing() {
        assert!(matches!(
            first_choice_content(r#"{"choices":[]}"#),
            Err(CompletionError::Malformed(_))
        ));
        assert!(matches!(
            first_choice_content("<html>bad gateway</html>"),
            Err(CompletionError::Malformed(_))
        ));
    }

    #[test]
    fn test_classify_failure_reads_error_type() {
        let body = r#"{"error":{"type":"insufficient_quota","message":"Quota exceeded"}}"#;
        let err = classify_failure(429, body);
        assert_eq!(
            err,
            CompletionError::Status {
                status: 429,
                error_type: Some("insufficient_quota".into()),
                message: Some("Quota exceeded".into()),
            }
        );
    }

    #[test]
    fn test_classify_failure_without_json_body() {
        let err = classify_failure(502, "upstream connect error");
        assert_eq!(
            err,
            CompletionError::Status { status: 502, error_type: None, message: None }
        );
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_no_client_without_credential() {
        let config = OpenAiConfig::default();
        assert!(create_completion_client(&config).unwrap().is_none());
    }

    #[test]
    fn test_client_with_credential() {
        let config = OpenAiConfig {
            api_key: Some("sk-test".into()),
            base_url: "https://llm.internal/v1/".into(),
            ..OpenAiConfig::default()
        };
        let client = create_completion_client(&config).unwrap().unwrap();
        assert_eq!(client.model_name(), "gpt-3.5-turbo");
    }
}
