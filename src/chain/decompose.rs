use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ChatMessage, Model, ModelConfig, TokenUsage};

const DECOMPOSITION_PROMPT: &str = r#"Break down this complex query into smaller, logically connected sub-queries. Consider:
1. Dependencies between questions
2. Context needed for each sub-query
3. Logical flow of information

Complex query: "{query}"

Return ONLY a JSON array of strings, where each string is a sub-query. Format:
["sub-query 1", "sub-query 2", ...]

The sub-queries should build upon each other naturally and maintain context."#;

// "- x", "* x", "• x", "1. x", "2) x"
static ENUMERATED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d{1,3}[.)])\s+(.+?)\s*$").expect("valid enumerated line regex")
});

/// Why a turn fell back to a single direct answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The model proposed one sub-query or none
    TooFewSubQueries,
    /// Nothing in the reply looked like a list of sub-queries
    Unparseable,
    /// The decomposition request itself failed
    ProviderFailed(String),
}

impl FallbackReason {
    /// Notice shown to the user
    pub fn describe(&self) -> String {
        match self {
            Self::TooFewSubQueries => "Question is simple enough to answer directly".to_string(),
            Self::Unparseable => {
                "Could not split the question into parts, answering directly".to_string()
            }
            Self::ProviderFailed(err) => {
                format!("Error in prompt decomposition ({}), answering directly", err)
            }
        }
    }
}

/// Result of asking the model to split a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// Ordered sub-queries; the raw query alone when `fallback` is set
    pub sub_queries: Vec<String>,
    pub fallback: Option<FallbackReason>,
    /// Tokens spent on the decomposition request
    pub usage: Option<TokenUsage>,
}

impl Decomposition {
    pub fn direct(query: &str, reason: FallbackReason) -> Self {
        Self {
            sub_queries: vec![query.to_string()],
            fallback: Some(reason),
            usage: None,
        }
    }

    pub fn is_split(&self) -> bool {
        self.fallback.is_none() && self.sub_queries.len() > 1
    }
}

pub fn build_decomposition_prompt(query: &str) -> String {
    DECOMPOSITION_PROMPT.replace("{query}", query)
}

/// Parse a decomposition reply into sub-queries
///
/// Returns `None` when the reply holds neither a JSON array of strings nor
/// any enumerated lines.
pub fn parse_sub_queries(reply: &str) -> Option<Vec<String>> {
    if let Some(items) = parse_json_array(reply) {
        return Some(items);
    }

    let lines: Vec<String> = reply
        .lines()
        .filter_map(|line| ENUMERATED_LINE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_quotes(m.as_str()).to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

fn parse_json_array(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end <= start {
        return None;
    }

    let values: Vec<serde_json::Value> = serde_json::from_str(&reply[start..=end]).ok()?;
    Some(
        values
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'' || c == ',').trim()
}

/// Ask `planner` to split `query` into at most `limit` sub-queries
///
/// Never fails: provider errors and unusable replies become a direct fallback.
pub async fn decompose_query(
    planner: &dyn Model,
    query: &str,
    config: &ModelConfig,
    limit: usize,
) -> Decomposition {
    let messages = [ChatMessage::user(build_decomposition_prompt(query))];
    let config = ModelConfig {
        system_prompt: None,
        ..config.clone()
    };

    let (reply, usage) = match planner.chat(&messages, &config).await {
        Ok(response) => (response.content, response.usage),
        Err(e) => {
            tracing::warn!("Prompt decomposition failed: {}", e);
            return Decomposition::direct(query, FallbackReason::ProviderFailed(e.to_string()));
        }
    };
    tracing::debug!("Decomposition output: {}", reply);

    let Some(mut sub_queries) = parse_sub_queries(&reply) else {
        tracing::warn!("No sub-queries could be parsed from decomposition output");
        return Decomposition {
            usage,
            ..Decomposition::direct(query, FallbackReason::Unparseable)
        };
    };

    if sub_queries.len() > limit {
        tracing::debug!("Truncating {} sub-queries to {}", sub_queries.len(), limit);
        sub_queries.truncate(limit);
    }

    if sub_queries.len() <= 1 {
        return Decomposition {
            usage,
            ..Decomposition::direct(query, FallbackReason::TooFewSubQueries)
        };
    }

    Decomposition {
        sub_queries,
        fallback: None,
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::ScriptedModel;
    use crate::utils::ChatError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prompt_embeds_query() {
        let prompt = build_decomposition_prompt("Why is the sky blue?");
        assert!(prompt.contains("Complex query: \"Why is the sky blue?\""));
        assert!(prompt.contains("ONLY a JSON array"));
    }

    #[test]
    fn test_parse_json_with_surrounding_text() {
        let reply = "Sure! Here you go:\n```json\n[\"First\", \" Second \", \"\", 3]\n```\nHope that helps.";
        assert_eq!(
            parse_sub_queries(reply),
            Some(vec!["First".to_string(), "Second".to_string()])
        );
    }

    #[test]
    fn test_parse_enumerated_fallback() {
        let reply = "Sub-queries:\n1. What is photosynthesis?\n2) What is respiration?\n- \"How do they compare?\"\nThanks";
        assert_eq!(
            parse_sub_queries(reply),
            Some(vec![
                "What is photosynthesis?".to_string(),
                "What is respiration?".to_string(),
                "How do they compare?".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_nothing_usable() {
        assert_eq!(parse_sub_queries("I cannot split this."), None);
        assert_eq!(parse_sub_queries(""), None);
    }

    #[tokio::test]
    async fn test_decompose_truncates_to_limit() {
        let planner = ScriptedModel::replying("planner", &[r#"["a", "b", "c", "d"]"#]);
        let result = decompose_query(planner.as_ref(), "q", &ModelConfig::default(), 3).await;

        assert_eq!(result.sub_queries, vec!["a", "b", "c"]);
        assert!(result.is_split());
    }

    #[tokio::test]
    async fn test_decompose_single_item_falls_back_to_raw_query() {
        let planner = ScriptedModel::replying("planner", &[r#"["Capital of France?"]"#]);
        let result =
            decompose_query(planner.as_ref(), "What is the capital of France?", &ModelConfig::default(), 8)
                .await;

        assert_eq!(result.sub_queries, vec!["What is the capital of France?"]);
        assert_eq!(result.fallback, Some(FallbackReason::TooFewSubQueries));
    }

    #[tokio::test]
    async fn test_decompose_provider_failure_is_not_fatal() {
        let planner = ScriptedModel::new(
            "planner",
            vec![Err(ChatError::RateLimited("slow down".into()))],
        );
        let result = decompose_query(planner.as_ref(), "q", &ModelConfig::default(), 8).await;

        assert_eq!(result.sub_queries, vec!["q"]);
        assert!(matches!(result.fallback, Some(FallbackReason::ProviderFailed(_))));
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        let planner = ScriptedModel::replying("planner", &["nope"]);
        let config = ModelConfig {
            system_prompt: Some("persona".into()),
            ..ModelConfig::default()
        };
        let result = decompose_query(planner.as_ref(), "q", &config, 8).await;

        assert_eq!(result.fallback, Some(FallbackReason::Unparseable));
        let calls = planner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1);
        assert!(calls[0][0].content.contains("Complex query: \"q\""));
    }
}
