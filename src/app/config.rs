use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_AZURE_API_VERSION, DEFAULT_GROQ_BASE_URL,
    DEFAULT_HISTORY_TURNS, DEFAULT_MAX_SUB_QUERIES, DEFAULT_MAX_TOKENS, DEFAULT_MODEL_ID,
    DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_PORT, DEFAULT_OPENAI_BASE_URL, DEFAULT_TEMPERATURE,
};
use crate::models::ModelConfig;
use crate::utils::ChatError;

const LOCAL_CONFIG_PATH: &str = ".chainchat/config.toml";
const ENV_PREFIX: &str = "CHAINCHAT_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model configuration
    pub default_model: ModelSettings,

    /// Smart prompt decomposition
    pub decomposition: DecompositionSettings,

    /// Chat session behaviour
    pub session: SessionSettings,

    /// OpenAI configuration
    pub openai: ProviderSettings,

    /// Anthropic configuration
    pub anthropic: ProviderSettings,

    /// Groq configuration
    pub groq: ProviderSettings,

    /// Azure OpenAI configuration
    pub azure: AzureConfig,

    /// Ollama configuration
    pub ollama: OllamaConfig,

    /// Optional LiteLLM proxy that fronts every provider
    pub litellm: LiteLlmConfig,

    /// UI configuration
    pub ui: UIConfig,
}

/// Default model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model identifier, `provider/name` or a bare name
    pub id: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// System prompt
    pub system_prompt: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            id: DEFAULT_MODEL_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        }
    }
}

impl ModelSettings {
    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            top_p: None,
            system_prompt: self.system_prompt.clone(),
        }
    }
}

/// Decomposition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionSettings {
    /// Start sessions with decomposition switched on
    pub enabled: bool,
    /// Model used for the decomposition call (defaults to the chat model)
    pub model: Option<String>,
    /// Upper bound on sub-queries answered per turn
    pub max_sub_queries: usize,
}

impl Default for DecompositionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
            max_sub_queries: DEFAULT_MAX_SUB_QUERIES,
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How many prior turns are sent as context (0 = all)
    pub history_turns: usize,
}

impl SessionSettings {
    /// Turn limit for the context window, `None` when unlimited
    pub fn history_limit(&self) -> Option<usize> {
        (self.history_turns > 0).then_some(self.history_turns)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }
}

/// Settings shared by the bearer-key providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Environment variable containing API key
    pub api_key_env: String,
    /// API base URL (without the /chat/completions suffix)
    pub base_url: String,
}

impl ProviderSettings {
    pub fn openai() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn anthropic() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn groq() -> Self {
        Self {
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::openai()
    }
}

/// Azure OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// Environment variable containing API key
    pub api_key_env: String,
    /// Environment variable containing the resource endpoint
    pub endpoint_env: String,
    /// REST API version
    pub api_version: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            api_key_env: "AZURE_API_KEY".to_string(),
            endpoint_env: "AZURE_API_BASE".to_string(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama server host
    pub host: String,
    /// Ollama server port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            port: DEFAULT_OLLAMA_PORT,
        }
    }
}

/// LiteLLM proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteLlmConfig {
    /// Proxy URL; when set (here or via `proxy_url_env`) all traffic goes through it
    pub proxy_url: Option<String>,
    /// Environment variable that may hold the proxy URL
    pub proxy_url_env: String,
    /// Environment variable containing the proxy master key
    pub master_key_env: String,
}

impl Default for LiteLlmConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            proxy_url_env: "LITELLM_PROXY_URL".to_string(),
            master_key_env: "LITELLM_MASTER_KEY".to_string(),
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UIConfig {
    /// Show line numbers in code blocks
    pub show_line_numbers: bool,
    /// Show settings sidebar by default
    pub show_sidebar: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            show_line_numbers: true,
            show_sidebar: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: ModelSettings::default(),
            decomposition: DecompositionSettings::default(),
            session: SessionSettings::default(),
            openai: ProviderSettings::openai(),
            anthropic: ProviderSettings::anthropic(),
            groq: ProviderSettings::groq(),
            azure: AzureConfig::default(),
            ollama: OllamaConfig::default(),
            litellm: LiteLlmConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

impl Config {
    /// Reject settings the providers would refuse anyway
    pub fn validate(&self) -> Result<(), ChatError> {
        let temperature = self.default_model.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ChatError::ConfigError(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                temperature
            )));
        }
        if self.default_model.max_tokens == 0 {
            return Err(ChatError::ConfigError(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.decomposition.max_sub_queries == 0 {
            return Err(ChatError::ConfigError(
                "decomposition.max_sub_queries must be at least 1".to_string(),
            ));
        }
        if self.default_model.id.trim().is_empty() {
            return Err(ChatError::ConfigError("default_model.id is empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from multiple sources
///
/// Order: built-in defaults, global config file, `./.chainchat/config.toml`
/// (or the explicit file when given), then `CHAINCHAT_` environment variables.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Ok(config_dir) = get_config_dir() {
                let global_config = config_dir.join("config.toml");
                if global_config.exists() {
                    figment = figment.merge(Toml::file(&global_config));
                }
            }

            let local_config = PathBuf::from(LOCAL_CONFIG_PATH);
            if local_config.exists() {
                figment = figment.merge(Toml::file(&local_config));
            }
        }
    }

    // CHAINCHAT_DECOMPOSITION__ENABLED=true -> decomposition.enabled
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment
        .extract()
        .context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "chainchat")
        .context("Could not determine configuration directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Get the directory used for log files
pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "chainchat")
        .context("Could not determine data directory")?;
    Ok(proj_dirs.data_local_dir().to_path_buf())
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    let config_file = get_config_dir()?.join("config.toml");
    if !config_file.exists() {
        save_config(&Config::default(), &config_file)?;
        created.push(config_file);
    }

    let local_example = PathBuf::from(".chainchat/config.toml.example");
    if !local_example.exists() {
        if let Some(parent) = local_example.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let example_config = r#"# chainchat project configuration
# Copy to .chainchat/config.toml to override global settings here

[default_model]
id = "openai/gpt-4o-mini"
temperature = 0.7
max_tokens = 500

[decomposition]
enabled = true
max_sub_queries = 5
# model = "openai/gpt-4o-mini"

[session]
# 0 sends the whole conversation
history_turns = 10
"#;
        std::fs::write(&local_example, example_config)
            .with_context(|| format!("Failed to write {}", local_example.display()))?;
        created.push(local_example);
    }

    Ok(created)
}
