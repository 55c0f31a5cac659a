// Completion backends
//
// `OpenAiCompatibleBackend` speaks the chat-completions protocol shared by
// Groq, OpenAI and local servers such as Ollama.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{AskConfig, TEMPERATURE};
use crate::error::AskError;
use crate::prompt::Prompt;

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(config: &AskConfig, prompt: Prompt) -> Self {
        Self {
            model: config.model.clone(),
            system: prompt.system,
            user: prompt.user,
            temperature: TEMPERATURE,
            max_tokens: config.max_output_tokens,
        }
    }
}

/// Something that turns a prompt into completion text.
pub trait CompletionBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AskError>;
}

impl<B: CompletionBackend + ?Sized> CompletionBackend for &B {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AskError> {
        (**self).complete(request)
    }
}

// ============================================================================
// Chat-completions wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// HTTP backend
// ============================================================================

pub struct OpenAiCompatibleBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: &AskConfig) -> Result<Self, AskError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskError::Network(e.to_string()))?;

        Ok(Self { client, endpoint: config.endpoint.clone(), api_key: config.api_key.clone() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionBackend for OpenAiCompatibleBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AskError> {
        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatRequestMessage { role: "system", content: &request.system },
                ChatRequestMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        log::debug!("POST {} (model {}, {} prompt chars)", self.endpoint, request.model, request.user.len());
        let response = builder.send().map_err(|e| AskError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&error_text) {
                Ok(body) => body.error.message,
                Err(_) => error_text,
            };
            return Err(AskError::Api { status: status.as_u16(), message });
        }

        let body: ChatResponse = response.json().map_err(|e| AskError::InvalidResponse(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| AskError::InvalidResponse("No choices in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatRequestMessage { role: "system", content: "s" },
                ChatRequestMessage { role: "user", content: "u" },
            ],
            temperature: 0.0,
            max_tokens: 1024,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "m",
                "messages": [{"role": "system", "content": "s"}, {"role": "user", "content": "u"}],
                "temperature": 0.0,
                "max_tokens": 1024
            })
        );
    }

    #[test]
    fn test_response_with_null_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"length"}]}"#)
                .unwrap();
        assert_eq!(body.choices[0].message.content, None);
    }

    #[test]
    fn test_error_body() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#).unwrap();
        assert_eq!(body.error.message, "Invalid API Key");
    }

    #[test]
    fn test_unreachable_endpoint_is_network_error() {
        let mut config = AskConfig::new("m", "http://127.0.0.1:9/v1/chat/completions");
        config.timeout_secs = 2;
        let backend = OpenAiCompatibleBackend::new(&config).unwrap();
        let request = CompletionRequest::new(&config, Prompt { system: "s".into(), user: "u".into() });
        assert!(matches!(backend.complete(&request), Err(AskError::Network(_))));
    }
}
