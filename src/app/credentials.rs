use std::collections::HashMap;
use std::fmt;

use super::config::Config;
use crate::models::Provider;

/// Provider credentials captured once at startup
///
/// Keys are read from the environment variables named in [`Config`]; an empty
/// variable counts as missing. The snapshot is read-only afterwards, so a model
/// switch in the UI sees the same credentials the process started with.
#[derive(Clone, Default)]
pub struct Credentials {
    api_keys: HashMap<Provider, String>,
    azure_endpoint: Option<String>,
    proxy_url: Option<String>,
    proxy_master_key: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env(config: &Config) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup function
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut api_keys = HashMap::new();
        let key_envs = [
            (Provider::OpenAI, &config.openai.api_key_env),
            (Provider::Anthropic, &config.anthropic.api_key_env),
            (Provider::Groq, &config.groq.api_key_env),
            (Provider::Azure, &config.azure.api_key_env),
        ];
        for (provider, env_name) in key_envs {
            if let Some(key) = read(env_name) {
                api_keys.insert(provider, key);
            }
        }

        Self {
            api_keys,
            azure_endpoint: read(&config.azure.endpoint_env),
            proxy_url: config
                .litellm
                .proxy_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .or_else(|| read(&config.litellm.proxy_url_env)),
            proxy_master_key: read(&config.litellm.master_key_env),
        }
    }

    pub fn with_api_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, key.into());
        self
    }

    pub fn with_azure_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.azure_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_proxy(mut self, url: impl Into<String>, master_key: Option<String>) -> Self {
        self.proxy_url = Some(url.into());
        self.proxy_master_key = master_key;
        self
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        self.api_keys.get(&provider).map(String::as_str)
    }

    pub fn has_api_key(&self, provider: Provider) -> bool {
        self.api_keys.contains_key(&provider)
    }

    pub fn azure_endpoint(&self) -> Option<&str> {
        self.azure_endpoint.as_deref()
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    pub fn proxy_master_key(&self) -> Option<&str> {
        self.proxy_master_key.as_deref()
    }
}

// Keys never show up in logs or panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&str> = self.api_keys.keys().map(|p| p.prefix()).collect();
        providers.sort_unstable();
        f.debug_struct("Credentials")
            .field("api_keys_for", &providers)
            .field("azure_endpoint", &self.azure_endpoint)
            .field("proxy_url", &self.proxy_url)
            .field("proxy_master_key", &self.proxy_master_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
