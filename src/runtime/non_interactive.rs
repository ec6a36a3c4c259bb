use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    app::{Config, Credentials},
    chain::{ProgressCallback, SubAnswer, TurnProgress},
    cli::OutputFormat,
    session::ChatSession,
};

/// Result of a non-interactive run
#[derive(Debug, Serialize)]
pub struct NonInteractiveResult {
    /// The prompt that was executed
    pub prompt: String,
    /// The composed reply
    pub response: String,
    /// Answered sub-queries when the prompt was split
    pub parts: Vec<SubAnswer>,
    /// Fallbacks taken while splitting
    pub warnings: Vec<String>,
    /// Any errors that occurred
    pub errors: Vec<String>,
    /// Metadata about the execution
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Serialize)]
pub struct ExecutionMetadata {
    /// Model used
    pub model: String,
    /// "direct" or "decompose"
    pub mode: String,
    /// Number of completion requests made
    pub model_calls: usize,
    /// Total tokens, when the provider reported usage
    pub tokens_used: Option<usize>,
    /// Execution time in milliseconds
    pub duration_ms: u128,
}

/// Non-interactive runner for executing single prompts
pub struct NonInteractiveRunner {
    session: ChatSession,
}

impl NonInteractiveRunner {
    /// Create a new non-interactive runner
    pub fn new(config: Config, credentials: Credentials, model_id: &str) -> Self {
        Self::from_session(ChatSession::new(config, credentials, model_id))
    }

    pub fn from_session(session: ChatSession) -> Self {
        Self { session }
    }

    /// Execute a single prompt and return the result
    ///
    /// Model failures are reported in `errors` rather than as an `Err`.
    pub async fn execute(&mut self, prompt: String) -> Result<NonInteractiveResult> {
        let start_time = std::time::Instant::now();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let progress: ProgressCallback = Arc::new(|event: TurnProgress| match event {
            TurnProgress::Planned(queries) => {
                tracing::info!("Split into {} sub-queries", queries.len())
            }
            TurnProgress::AnsweringPart { index, total } => {
                tracing::info!("Answering part {}/{}", index, total)
            }
            _ => {}
        });

        let mode = self.session.mode().to_str().to_string();
        let (response, parts, model_calls, tokens_used) = match self.session.submit(&prompt, Some(progress)).await {
            Ok(outcome) => {
                if let Some(reason) = outcome
                    .decomposition
                    .as_ref()
                    .and_then(|d| d.fallback.as_ref())
                {
                    warnings.push(reason.describe());
                }
                let tokens = outcome.usage.map(|u| u.total_tokens);
                (outcome.reply, outcome.parts, outcome.model_calls, tokens)
            }
            Err(e) => {
                errors.push(format!("Model error: {}", e));
                (String::new(), Vec::new(), 0, None)
            }
        };

        Ok(NonInteractiveResult {
            prompt,
            response,
            parts,
            warnings,
            errors,
            metadata: ExecutionMetadata {
                model: self.session.model_name().to_string(),
                mode,
                model_calls,
                tokens_used,
                duration_ms: start_time.elapsed().as_millis(),
            },
        })
    }

    /// Format the result according to the output format
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|e| {
                format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
            }),
            OutputFormat::Text => {
                let mut output = String::new();
                output.push_str(&result.response);

                if !result.warnings.is_empty() {
                    output.push_str("\n\n--- Notes ---\n");
                    for warning in &result.warnings {
                        output.push_str(&format!("• {}\n", warning));
                    }
                }

                if !result.errors.is_empty() {
                    output.push_str("\n--- Errors ---\n");
                    for error in &result.errors {
                        output.push_str(&format!("• {}\n", error));
                    }
                }

                output
            }
            OutputFormat::Markdown => {
                let mut output = String::new();

                output.push_str("## Response\n\n");
                output.push_str(&result.response);
                output.push_str("\n\n");

                if !result.parts.is_empty() {
                    output.push_str("## Sub-queries\n\n");
                    for part in &result.parts {
                        output.push_str(&format!("{}. {}\n", part.index, part.sub_query));
                    }
                    output.push('\n');
                }

                if !result.warnings.is_empty() {
                    output.push_str("## Notes\n\n");
                    for warning in &result.warnings {
                        output.push_str(&format!("- {}\n", warning));
                    }
                    output.push('\n');
                }

                if !result.errors.is_empty() {
                    output.push_str("## Errors\n\n");
                    for error in &result.errors {
                        output.push_str(&format!("- {}\n", error));
                    }
                    output.push('\n');
                }

                output.push_str("---\n");
                let tokens = result
                    .metadata
                    .tokens_used
                    .map_or_else(|| "n/a".to_string(), |t| t.to_string());
                output.push_str(&format!(
                    "*Model: {} | Mode: {} | Calls: {} | Tokens: {} | Duration: {}ms*\n",
                    result.metadata.model,
                    result.metadata.mode,
                    result.metadata.model_calls,
                    tokens,
                    result.metadata.duration_ms
                ));

                output
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TurnRunner;
    use crate::models::testing::ScriptedModel;
    use crate::models::ModelConfig;
    use crate::session::ResponseMode;
    use crate::utils::ChatError;
    use pretty_assertions::assert_eq;

    fn runner_with(model: Arc<ScriptedModel>, decompose: bool) -> NonInteractiveRunner {
        let mut config = Config::default();
        config.decomposition.enabled = decompose;
        let turn_runner = TurnRunner::new(model.clone(), model, ModelConfig::default());
        let mut session = ChatSession::with_runner(config, turn_runner);
        session.set_mode(ResponseMode::from_enabled(decompose));
        NonInteractiveRunner::from_session(session)
    }

    #[tokio::test]
    async fn test_split_prompt_reports_parts() {
        let model = ScriptedModel::replying(
            "test/model",
            &[r#"["What is X?", "Why does X matter?"]"#, "X is a thing.", "It matters."],
        );
        let mut runner = runner_with(model, true);

        let result = runner.execute("Explain X and why it matters".to_string()).await.unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.parts.len(), 2);
        assert_eq!(result.metadata.model_calls, 3);
        assert_eq!(result.metadata.mode, "decompose");
        assert!(result.response.contains("**Part 2**: *Why does X matter?*"));

        let markdown = runner.format_result(&result, OutputFormat::Markdown);
        assert!(markdown.contains("## Sub-queries\n\n1. What is X?\n2. Why does X matter?"));
        assert!(markdown.contains("Mode: decompose | Calls: 3 | Tokens: n/a"));
    }

    #[tokio::test]
    async fn test_fallback_is_a_warning() {
        let model = ScriptedModel::replying("test/model", &["no list here", "Plain answer."]);
        let mut runner = runner_with(model, true);

        let result = runner.execute("What is 2 + 2?".to_string()).await.unwrap();
        assert_eq!(result.response, "Plain answer.");
        assert_eq!(result.warnings.len(), 1);

        let text = runner.format_result(&result, OutputFormat::Text);
        assert!(text.starts_with("Plain answer.\n\n--- Notes ---\n"));
    }

    #[tokio::test]
    async fn test_model_failure_lands_in_errors() {
        let model = ScriptedModel::new(
            "test/model",
            vec![Err(ChatError::RateLimited("slow down".to_string()))],
        );
        let mut runner = runner_with(model, false);

        let result = runner.execute("hello".to_string()).await.unwrap();
        assert_eq!(result.response, "");
        assert_eq!(result.errors.len(), 1);

        let json: serde_json::Value =
            serde_json::from_str(&runner.format_result(&result, OutputFormat::Json)).unwrap();
        assert_eq!(json["metadata"]["model"], "test/model");
        assert!(json["metadata"]["tokens_used"].is_null());
        assert_eq!(json["errors"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_reported_usage_reaches_metadata() {
        use crate::models::{MockModel, Model, ModelResponse, TokenUsage};

        let mut model = MockModel::new();
        model.expect_chat().times(1).returning(|_, _| {
            Ok(ModelResponse {
                content: "42".to_string(),
                usage: Some(TokenUsage {
                    prompt_tokens: 30,
                    completion_tokens: 12,
                    total_tokens: 42,
                }),
                model_name: "mock".to_string(),
            })
        });
        model.expect_name().return_const("mock".to_string());
        let model: Arc<dyn Model> = Arc::new(model);
        let session = ChatSession::with_runner(
            Config::default(),
            TurnRunner::new(model.clone(), model, ModelConfig::default()),
        );
        let mut runner = NonInteractiveRunner::from_session(session);

        let result = runner.execute("answer?".to_string()).await.unwrap();
        assert_eq!(result.metadata.tokens_used, Some(42));

        let markdown = runner.format_result(&result, OutputFormat::Markdown);
        assert!(markdown.contains("Calls: 1 | Tokens: 42 |"));
    }
}
