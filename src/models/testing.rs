use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::Model;
use super::types::{ChatMessage, ModelConfig, ModelResponse};
use crate::utils::ChatError;

/// In-memory model that replays canned replies and records every request
pub struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(name: &str, replies: Vec<Result<String, ChatError>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Shorthand for a model whose every reply succeeds
    pub fn replying(name: &str, replies: &[&str]) -> Arc<Self> {
        Self::new(name, replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Messages sent on each call, in call order
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _config: &ModelConfig,
    ) -> Result<ModelResponse, ChatError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::NetworkError("script exhausted".into())));
        reply.map(|content| ModelResponse {
            content,
            usage: None,
            model_name: self.name.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        true
    }
}
