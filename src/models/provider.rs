use std::fmt;
use std::str::FromStr;

use crate::utils::ChatError;

/// LLM vendors reachable through an OpenAI-compatible endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Azure,
    Groq,
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAI,
        Provider::Anthropic,
        Provider::Azure,
        Provider::Groq,
        Provider::Ollama,
    ];

    /// Prefix used in `provider/model` identifiers
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Azure => "azure",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Azure => "Azure OpenAI",
            Self::Groq => "Groq",
            Self::Ollama => "Ollama",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "anthropic" => Some(Self::Anthropic),
            "azure" => Some(Self::Azure),
            "groq" => Some(Self::Groq),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Guess the provider of a bare model name
    pub fn infer(model_name: &str) -> Self {
        if model_name.starts_with("claude") {
            Self::Anthropic
        } else {
            Self::OpenAI
        }
    }

    /// Whether requests need an API key
    pub fn requires_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

/// A parsed model identifier such as `anthropic/claude-3-5-sonnet-latest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub provider: Provider,
    pub name: String,
}

impl ModelId {
    pub fn parse(input: &str) -> Result<Self, ChatError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ChatError::ConfigError("model identifier is empty".to_string()));
        }

        match input.split_once('/') {
            Some((prefix, name)) => {
                let provider = Provider::from_prefix(prefix).ok_or_else(|| {
                    ChatError::ConfigError(format!(
                        "unknown provider '{}' in model '{}' (expected one of: openai, anthropic, azure, groq, ollama)",
                        prefix, input
                    ))
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ChatError::ConfigError(format!(
                        "model name missing in '{}'",
                        input
                    )));
                }
                Ok(Self {
                    provider,
                    name: name.to_string(),
                })
            }
            None => Ok(Self {
                provider: Provider::infer(input),
                name: input.to_string(),
            }),
        }
    }
}

impl FromStr for ModelId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider.prefix(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_ids() {
        let id = ModelId::parse("anthropic/claude-3-5-sonnet-latest").unwrap();
        assert_eq!(id.provider, Provider::Anthropic);
        assert_eq!(id.name, "claude-3-5-sonnet-latest");

        let id = ModelId::parse("ollama/llama3:8b").unwrap();
        assert_eq!(id.provider, Provider::Ollama);
        assert_eq!(id.name, "llama3:8b");
        assert_eq!(id.to_string(), "ollama/llama3:8b");
    }

    #[test]
    fn test_parse_bare_names() {
        assert_eq!(ModelId::parse("gpt-4o-mini").unwrap().provider, Provider::OpenAI);
        assert_eq!(
            ModelId::parse(" claude-3-haiku-20240307 ").unwrap().provider,
            Provider::Anthropic
        );
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(ModelId::parse("").unwrap_err().is_config());
        assert!(ModelId::parse("mystery/model").unwrap_err().is_config());
        assert!(ModelId::parse("openai/").unwrap_err().is_config());
    }
}
