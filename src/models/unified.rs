use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::factory::{Auth, Endpoint};
use super::traits::Model;
use super::types::{ChatMessage, ModelConfig, ModelResponse, TokenUsage};
use crate::utils::ChatError;

/// OpenAI-compatible chat completions client
/// Every supported provider (and a LiteLLM proxy) speaks this same wire format
pub struct UnifiedModel {
    client: Client,
    endpoint: Endpoint,
}

impl UnifiedModel {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::ConfigError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Model for UnifiedModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<ModelResponse, ChatError> {
        let request_body = build_request_body(&self.endpoint.model_field, messages, config);

        let mut request = self.client.post(&self.endpoint.url).json(&request_body);
        request = match &self.endpoint.auth {
            Auth::None => request,
            Auth::Bearer(key) => request.header("Authorization", format!("Bearer {}", key)),
            Auth::ApiKeyHeader(key) => request.header("api-key", key),
        };

        tracing::debug!(
            model = %self.endpoint.display_name,
            messages = messages.len(),
            "sending chat completion request"
        );

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ChatError::NetworkError(format!(
                    "failed to connect to {}: {}",
                    self.endpoint.url, e
                ))
            } else {
                ChatError::from(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify_failure(status.as_u16(), &body);
            tracing::warn!(model = %self.endpoint.display_name, status = status.as_u16(), "request failed: {}", err);
            return Err(err);
        }

        parse_completion(&body, &self.endpoint.display_name)
    }

    fn name(&self) -> &str {
        &self.endpoint.display_name
    }

    fn is_local(&self) -> bool {
        self.endpoint.is_local
    }
}

/// Build an OpenAI-format request body
/// The configured system prompt, when present, goes first.
pub fn build_request_body(model: &str, messages: &[ChatMessage], config: &ModelConfig) -> Value {
    let mut json_messages = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = &config.system_prompt {
        json_messages.push(json!({
            "role": "system",
            "content": system
        }));
    }

    for msg in messages {
        json_messages.push(json!({
            "role": msg.role.as_str(),
            "content": msg.content
        }));
    }

    let mut request_body = json!({
        "model": model,
        "messages": json_messages,
        "stream": false,
    });

    if let Some(temp) = config.temperature {
        request_body["temperature"] = json!(temp);
    }
    if let Some(max_tokens) = config.max_tokens {
        request_body["max_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = config.top_p {
        request_body["top_p"] = json!(top_p);
    }

    request_body
}

/// Extract the first choice's text from a successful response body
pub fn parse_completion(body: &str, model_name: &str) -> Result<ModelResponse, ChatError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::MalformedResponse(format!("invalid completion JSON: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ChatError::MalformedResponse("response contained no message content".into()))?;

    Ok(ModelResponse {
        content,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        model_name: model_name.to_string(),
    })
}

/// Map a non-success HTTP status to an error, keeping the provider's message
pub fn classify_failure(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.chars().take(300).collect()
            }
        });

    match status {
        401 | 403 => ChatError::AuthError(message),
        429 => ChatError::RateLimited(message),
        _ => ChatError::ApiError { status, message },
    }
}

// Response structures (OpenAI format)

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_body_puts_system_prompt_first() {
        let config = ModelConfig {
            system_prompt: Some("Be brief.".to_string()),
            ..ModelConfig::default()
        };
        let messages = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let body = build_request_body("gpt-4o-mini", &messages, &config);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be brief.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Paris"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        }"#;
        let response = parse_completion(body, "openai/gpt-4o-mini").unwrap();

        assert_eq!(response.content, "Paris");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(11));
        assert_eq!(response.model_name, "openai/gpt-4o-mini");
    }

    #[test]
    fn test_null_content_is_malformed() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert!(matches!(
            parse_completion(body, "m"),
            Err(ChatError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#, "m"),
            Err(ChatError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_completion("not json", "m"),
            Err(ChatError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_classify_failure() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        match classify_failure(401, body) {
            ChatError::AuthError(msg) => assert_eq!(msg, "Incorrect API key provided"),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(classify_failure(429, "{}"), ChatError::RateLimited(_)));

        match classify_failure(503, "") {
            ChatError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "HTTP 503");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
