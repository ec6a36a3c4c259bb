use crate::app::{Config, Credentials};
use crate::chain::{ProgressCallback, TurnOptions, TurnOutcome, TurnRunner};
use crate::models::ChatMessage;
use crate::utils::ChatError;

use super::mode::ResponseMode;
use super::transcript::Transcript;

/// A turn that passed validation and is ready to run
///
/// Owns a snapshot of everything it needs, so it can be moved onto a task
/// while the session keeps serving the UI.
#[derive(Clone)]
pub struct PendingTurn {
    pub query: String,
    pub history: Vec<ChatMessage>,
    pub options: TurnOptions,
    runner: TurnRunner,
}

impl PendingTurn {
    pub async fn run(self, progress: Option<ProgressCallback>) -> Result<TurnOutcome, ChatError> {
        self.runner
            .run_turn(&self.history, &self.query, self.options, progress)
            .await
    }
}

/// One interactive conversation with the selected model
pub struct ChatSession {
    config: Config,
    credentials: Credentials,
    model_id: String,
    runner: Option<TurnRunner>,
    config_error: Option<String>,
    mode: ResponseMode,
    transcript: Transcript,
}

impl ChatSession {
    /// Create a session; a model that cannot be configured is remembered as an
    /// error and reported on every submit
    pub fn new(config: Config, credentials: Credentials, model_id: &str) -> Self {
        let (runner, config_error) = match TurnRunner::build(model_id, &config, &credentials) {
            Ok(runner) => (Some(runner), None),
            Err(e) => {
                tracing::warn!("Model {} is not usable: {}", model_id, e);
                (None, Some(e.to_string()))
            }
        };

        Self {
            mode: ResponseMode::from_enabled(config.decomposition.enabled),
            config,
            credentials,
            model_id: model_id.to_string(),
            runner,
            config_error,
            transcript: Transcript::new(),
        }
    }

    /// Create a session around an already built runner
    pub fn with_runner(config: Config, runner: TurnRunner) -> Self {
        Self {
            mode: ResponseMode::from_enabled(config.decomposition.enabled),
            model_id: runner.model_name().to_string(),
            config,
            credentials: Credentials::default(),
            runner: Some(runner),
            config_error: None,
            transcript: Transcript::new(),
        }
    }

    /// Validate `query` and snapshot the state needed to answer it
    ///
    /// Whitespace-only input is rejected; otherwise the text is sent as typed.
    pub fn prepare_turn(&self, query: &str) -> Result<PendingTurn, ChatError> {
        if query.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let runner = self.runner.clone().ok_or_else(|| {
            ChatError::ConfigError(
                self.config_error
                    .clone()
                    .unwrap_or_else(|| format!("model {} is not configured", self.model_id)),
            )
        })?;

        Ok(PendingTurn {
            query: query.to_string(),
            history: self
                .transcript
                .context_window(self.config.session.history_limit()),
            options: self.turn_options(),
            runner,
        })
    }

    /// Record a finished turn
    pub fn commit(&mut self, query: &str, outcome: &TurnOutcome) {
        self.transcript.record_turn(query, &outcome.reply);
    }

    /// Prepare, run and commit a turn; a failed turn leaves the transcript untouched
    pub async fn submit(
        &mut self,
        query: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<TurnOutcome, ChatError> {
        let pending = self.prepare_turn(query)?;
        let query = pending.query.clone();
        let outcome = pending.run(progress).await?;
        self.commit(&query, &outcome);
        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        tracing::info!("Conversation cleared");
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ResponseMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) -> ResponseMode {
        self.mode = self.mode.toggle();
        self.mode
    }

    /// Rebuild the model client for `model_id`
    /// On failure the current model stays selected.
    pub fn switch_model(&mut self, model_id: &str) -> Result<(), ChatError> {
        let runner = TurnRunner::build(model_id, &self.config, &self.credentials)?;
        tracing::info!("Switched model to {}", runner.model_name());
        self.model_id = model_id.trim().to_string();
        self.runner = Some(runner);
        self.config_error = None;
        Ok(())
    }

    pub fn turn_options(&self) -> TurnOptions {
        TurnOptions {
            decompose: self.mode.is_decompose(),
            max_sub_queries: self.config.decomposition.max_sub_queries,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Display name of the answering model, or the requested id when unusable
    pub fn model_name(&self) -> &str {
        self.runner
            .as_ref()
            .map(|r| r.model_name())
            .unwrap_or(self.model_id.as_str())
    }

    /// Whether the answering model runs on this machine
    pub fn model_is_local(&self) -> bool {
        self.runner.as_ref().is_some_and(|r| r.model_is_local())
    }

    pub fn planner_name(&self) -> Option<&str> {
        self.runner.as_ref().map(|r| r.planner_name())
    }

    pub fn config_error(&self) -> Option<&str> {
        self.config_error.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::ScriptedModel;
    use crate::models::{ModelConfig, Provider};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn session_with(model: Arc<ScriptedModel>, decompose: bool) -> ChatSession {
        let mut config = Config::default();
        config.decomposition.enabled = decompose;
        let runner = TurnRunner::new(model.clone(), model, ModelConfig::default());
        ChatSession::with_runner(config, runner)
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_any_call() {
        let mut session = ChatSession::new(Config::default(), Credentials::default(), "gpt-4o-mini");

        assert!(session.config_error().unwrap().contains("OPENAI_API_KEY"));
        let err = session.submit("hello", None).await.unwrap_err();
        assert!(err.is_config());
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_transcript_has_two_messages_per_turn() {
        let model = ScriptedModel::replying("m", &["a1", "a2", "a3"]);
        let mut session = session_with(model, false);

        for q in ["q1", "q2", "q3"] {
            session.submit(q, None).await.unwrap();
        }

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 6);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2", "q3", "a3"]);
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_committed() {
        let model = ScriptedModel::new(
            "m",
            vec![
                Ok("a1".into()),
                Err(ChatError::RateLimited("try later".into())),
            ],
        );
        let mut session = session_with(model, false);

        session.submit("q1", None).await.unwrap();
        let err = session.submit("q2", None).await.unwrap_err();

        assert!(matches!(err, ChatError::RateLimited(_)));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_decomposed_turn_commits_one_assistant_message() {
        let model = ScriptedModel::replying("m", &[r#"["part one", "part two"]"#, "x", "y"]);
        let mut session = session_with(model.clone(), true);

        let outcome = session.submit("two things", None).await.unwrap();

        assert_eq!(outcome.parts.len(), 2);
        assert_eq!(model.call_count(), 3);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript().messages()[0].content, "two things");
        assert_eq!(session.transcript().messages()[1].content, outcome.reply);
    }

    #[test]
    fn test_prepare_turn_snapshots_history_and_mode() {
        let model = ScriptedModel::replying("m", &[]);
        let mut session = session_with(model, false);
        let outcome = TurnOutcome {
            reply: "a".into(),
            parts: Vec::new(),
            decomposition: None,
            model_calls: 1,
            model_name: "m".into(),
            usage: None,
        };
        session.commit("q", &outcome);
        session.toggle_mode();

        let pending = session.prepare_turn("  next  ").unwrap();
        assert_eq!(pending.query, "  next  ");
        assert_eq!(pending.history.len(), 2);
        assert!(pending.options.decompose);

        assert!(matches!(session.prepare_turn("   "), Err(ChatError::EmptyInput)));
    }

    #[test]
    fn test_switch_model() {
        let creds = Credentials::default().with_api_key(Provider::Anthropic, "sk-ant");
        let mut session = ChatSession::new(Config::default(), creds, "gpt-4o-mini");
        assert!(session.config_error().is_some());

        assert!(session.switch_model("groq/llama-3.1-8b-instant").is_err());
        assert_eq!(session.model_id(), "gpt-4o-mini");

        session.switch_model("claude-3-5-haiku-latest").unwrap();
        assert_eq!(session.model_name(), "anthropic/claude-3-5-haiku-latest");
        assert!(session.config_error().is_none());
        assert!(session.prepare_turn("hi").is_ok());
    }

    #[tokio::test]
    async fn test_raw_query_reaches_model() {
        let model = ScriptedModel::replying("m", &["ok"]);
        let mut session = session_with(model.clone(), false);

        session.submit("  indented\tquery ", None).await.unwrap();
        assert_eq!(model.calls()[0][0].content, "  indented\tquery ");
        assert_eq!(session.transcript().messages()[0].content, "  indented\tquery ");
    }

    #[test]
    fn test_zero_history_turns_sends_whole_transcript() {
        let model = ScriptedModel::replying("m", &[]);
        let mut session = session_with(model, false);
        for i in 0..12 {
            session.transcript.record_turn(&format!("q{}", i), "a");
        }
        assert_eq!(session.prepare_turn("next").unwrap().history.len(), 20);

        session.config.session.history_turns = 0;
        assert_eq!(session.prepare_turn("next").unwrap().history.len(), 24);
    }

    #[test]
    fn test_reset_clears_transcript() {
        let model = ScriptedModel::replying("m", &[]);
        let mut session = session_with(model, false);
        session.transcript.record_turn("q", "a");
        session.reset();
        assert!(session.transcript().is_empty());
    }
}
