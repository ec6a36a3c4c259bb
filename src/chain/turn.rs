use std::sync::Arc;

use super::accumulator::{answer_sequentially, compose_answer, SubAnswer};
use super::decompose::{decompose_query, Decomposition, FallbackReason};
use crate::app::{Config, Credentials};
use crate::models::{ChatMessage, Model, ModelConfig, ModelFactory, TokenUsage};
use crate::utils::ChatError;

/// Per-turn switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOptions {
    pub decompose: bool,
    pub max_sub_queries: usize,
}

/// Progress notifications emitted while a turn runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnProgress {
    Decomposing,
    Planned(Vec<String>),
    Fallback(FallbackReason),
    AnsweringPart { index: usize, total: usize },
    PartAnswered(SubAnswer),
}

pub type ProgressCallback = Arc<dyn Fn(TurnProgress) + Send + Sync>;

/// Everything a finished turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The single assistant message to display and record
    pub reply: String,
    pub parts: Vec<SubAnswer>,
    /// `None` when decomposition was off for this turn
    pub decomposition: Option<Decomposition>,
    pub model_calls: usize,
    pub model_name: String,
    /// Summed over every call that reported usage
    pub usage: Option<TokenUsage>,
}

/// Runs one user turn against a model, optionally through decomposition
#[derive(Clone)]
pub struct TurnRunner {
    model: Arc<dyn Model>,
    planner: Arc<dyn Model>,
    config: ModelConfig,
}

impl TurnRunner {
    pub fn new(model: Arc<dyn Model>, planner: Arc<dyn Model>, config: ModelConfig) -> Self {
        Self {
            model,
            planner,
            config,
        }
    }

    /// Build the answering model (and the decomposition model, if a separate
    /// one is configured) from configuration and startup credentials
    pub fn build(model_id: &str, config: &Config, credentials: &Credentials) -> Result<Self, ChatError> {
        let model = ModelFactory::create(model_id, config, credentials)?;
        let planner = match config.decomposition.model.as_deref() {
            Some(id) if !id.trim().is_empty() => ModelFactory::create(id, config, credentials)?,
            _ => model.clone(),
        };
        Ok(Self::new(model, planner, config.default_model.to_model_config()))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn model_is_local(&self) -> bool {
        self.model.is_local()
    }

    pub fn planner_name(&self) -> &str {
        self.planner.name()
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.config
    }

    /// Answer `query` given the prior transcript `history`
    ///
    /// Fails on the first provider error; nothing partial is returned.
    pub async fn run_turn(
        &self,
        history: &[ChatMessage],
        query: &str,
        options: TurnOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<TurnOutcome, ChatError> {
        let report = |event: TurnProgress| {
            if let Some(callback) = &progress {
                callback(event);
            }
        };

        let mut model_calls = 0;
        let decomposition = if options.decompose {
            report(TurnProgress::Decomposing);
            let result = decompose_query(
                self.planner.as_ref(),
                query,
                &self.config,
                options.max_sub_queries.max(1),
            )
            .await;
            model_calls += 1;

            match &result.fallback {
                Some(reason) => report(TurnProgress::Fallback(reason.clone())),
                None => report(TurnProgress::Planned(result.sub_queries.clone())),
            }
            Some(result)
        } else {
            None
        };

        let sub_queries = match &decomposition {
            Some(d) if d.is_split() => d.sub_queries.clone(),
            _ => vec![query.to_string()],
        };

        let parts = answer_sequentially(
            self.model.as_ref(),
            history,
            &sub_queries,
            &self.config,
            progress.as_ref(),
        )
        .await?;
        model_calls += parts.len();

        tracing::info!(
            model = %self.model.name(),
            parts = parts.len(),
            calls = model_calls,
            "turn completed"
        );

        let usage = TokenUsage::total(
            decomposition
                .iter()
                .map(|d| d.usage)
                .chain(parts.iter().map(|p| p.usage)),
        );

        Ok(TurnOutcome {
            reply: compose_answer(&parts),
            parts,
            decomposition,
            model_calls,
            model_name: self.model.name().to_string(),
            usage,
        })
    }
}
