use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::provider::{ModelId, Provider};
use super::traits::Model;
use super::unified::UnifiedModel;
use crate::app::{Config, Credentials};
use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;
use crate::utils::ChatError;

/// How a request authenticates against its endpoint
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    /// Azure style `api-key` header
    ApiKeyHeader(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Self::ApiKeyHeader(_) => write!(f, "ApiKeyHeader(<redacted>)"),
        }
    }
}

/// A fully resolved chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Complete URL of the chat completions route
    pub url: String,
    pub auth: Auth,
    /// Value of the `model` field in the request body
    pub model_field: String,
    /// Name shown to the user
    pub display_name: String,
    pub is_local: bool,
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

fn missing_key(provider: Provider, env_name: &str) -> ChatError {
    ChatError::ConfigError(format!(
        "{} API key not found: set the {} environment variable",
        provider.display_name(),
        env_name
    ))
}

/// Resolve where and how to send requests for `model_id`
///
/// Pure function of its inputs; missing credentials fail here, before any
/// request is built.
pub fn resolve_endpoint(
    model_id: &str,
    config: &Config,
    credentials: &Credentials,
) -> Result<Endpoint, ChatError> {
    let model_id = model_id.trim();

    // A LiteLLM proxy handles provider routing and authentication itself
    if let Some(proxy_url) = credentials.proxy_url() {
        if model_id.is_empty() {
            return Err(ChatError::ConfigError("model identifier is empty".to_string()));
        }
        return Ok(Endpoint {
            url: format!("{}/v1/chat/completions", trim_base(proxy_url)),
            auth: credentials
                .proxy_master_key()
                .map(|key| Auth::Bearer(key.to_string()))
                .unwrap_or(Auth::None),
            model_field: model_id.to_string(),
            display_name: model_id.to_string(),
            is_local: false,
        });
    }

    let id = ModelId::parse(model_id)?;
    let display_name = id.to_string();

    let bearer = |settings: &crate::app::ProviderSettings| -> Result<Endpoint, ChatError> {
        let key = credentials
            .api_key(id.provider)
            .ok_or_else(|| missing_key(id.provider, &settings.api_key_env))?;
        Ok(Endpoint {
            url: format!("{}/chat/completions", trim_base(&settings.base_url)),
            auth: Auth::Bearer(key.to_string()),
            model_field: id.name.clone(),
            display_name: display_name.clone(),
            is_local: false,
        })
    };

    match id.provider {
        Provider::OpenAI => bearer(&config.openai),
        Provider::Anthropic => bearer(&config.anthropic),
        Provider::Groq => bearer(&config.groq),
        Provider::Azure => {
            let key = credentials
                .api_key(Provider::Azure)
                .ok_or_else(|| missing_key(Provider::Azure, &config.azure.api_key_env))?;
            let endpoint = credentials.azure_endpoint().ok_or_else(|| {
                ChatError::ConfigError(format!(
                    "Azure OpenAI endpoint not found: set the {} environment variable",
                    config.azure.endpoint_env
                ))
            })?;
            Ok(Endpoint {
                url: format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    trim_base(endpoint),
                    id.name,
                    config.azure.api_version
                ),
                auth: Auth::ApiKeyHeader(key.to_string()),
                model_field: id.name.clone(),
                display_name,
                is_local: false,
            })
        }
        Provider::Ollama => Ok(Endpoint {
            url: format!(
                "http://{}:{}/v1/chat/completions",
                config.ollama.host, config.ollama.port
            ),
            auth: Auth::None,
            model_field: id.name.clone(),
            display_name,
            is_local: true,
        }),
    }
}

/// Factory for creating model instances using the unified LLM interface
pub struct ModelFactory;

impl ModelFactory {
    /// Create a model instance from a model identifier
    /// Format: provider/model (e.g., "openai/gpt-4o", "anthropic/claude-3-5-sonnet-latest") or a bare name
    pub fn create(
        model_id: &str,
        config: &Config,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Model>, ChatError> {
        let endpoint = resolve_endpoint(model_id, config, credentials)?;
        tracing::debug!(model = %endpoint.display_name, url = %endpoint.url, "resolved model endpoint");
        let model = UnifiedModel::new(endpoint, Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))?;
        Ok(Arc::new(model))
    }

    /// List models known to the LiteLLM proxy, or a built-in list without one
    pub async fn list_available(credentials: &Credentials) -> Vec<String> {
        #[derive(Deserialize)]
        struct ModelsResponse {
            data: Vec<ModelInfo>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            id: String,
        }

        if let Some(proxy_url) = credentials.proxy_url() {
            let url = format!("{}/v1/models", trim_base(proxy_url));
            let mut request = Client::new().get(&url);
            if let Some(key) = credentials.proxy_master_key() {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ModelsResponse>().await {
                        Ok(models) => return models.data.into_iter().map(|m| m.id).collect(),
                        Err(e) => tracing::warn!("Unreadable model list from proxy: {}", e),
                    }
                }
                Ok(response) => tracing::warn!("Proxy model list failed: {}", response.status()),
                Err(e) => tracing::warn!("Proxy not reachable at {}: {}", proxy_url, e),
            }
        }

        // Fallback to common models
        [
            "openai/gpt-4o-mini",
            "openai/gpt-4o",
            "anthropic/claude-3-5-sonnet-latest",
            "anthropic/claude-3-5-haiku-latest",
            "groq/llama-3.1-70b-versatile",
            "ollama/llama3.1",
            "ollama/mistral",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}
