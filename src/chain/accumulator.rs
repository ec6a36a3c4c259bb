use serde::Serialize;

use super::turn::{ProgressCallback, TurnProgress};
use crate::constants::PART_SEPARATOR;
use crate::models::{ChatMessage, Model, ModelConfig, TokenUsage};
use crate::utils::ChatError;

/// One answered sub-query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubAnswer {
    /// 1-based position within the turn
    pub index: usize,
    pub sub_query: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Messages for one answering call: prior transcript, then earlier parts of
/// this turn as user/assistant pairs, then the current sub-query
pub fn build_context(history: &[ChatMessage], prior: &[SubAnswer], sub_query: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + prior.len() * 2 + 1);
    messages.extend_from_slice(history);
    for part in prior {
        messages.push(ChatMessage::user(&part.sub_query));
        messages.push(ChatMessage::assistant(&part.answer));
    }
    messages.push(ChatMessage::user(sub_query));
    messages
}

/// Answer each sub-query in order, feeding earlier answers into later calls
///
/// The first provider error aborts the loop and is returned as is.
pub async fn answer_sequentially(
    model: &dyn Model,
    history: &[ChatMessage],
    sub_queries: &[String],
    config: &ModelConfig,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<SubAnswer>, ChatError> {
    let total = sub_queries.len();
    let mut answers: Vec<SubAnswer> = Vec::with_capacity(total);

    for (i, sub_query) in sub_queries.iter().enumerate() {
        let index = i + 1;
        if let Some(report) = progress {
            report(TurnProgress::AnsweringPart { index, total });
        }

        let messages = build_context(history, &answers, sub_query);
        let response = model.chat(&messages, config).await?;
        tracing::debug!(part = index, of = total, chars = response.content.len(), "sub-query answered");

        let answer = SubAnswer {
            index,
            sub_query: sub_query.clone(),
            answer: response.content,
            usage: response.usage,
        };
        if let Some(report) = progress {
            report(TurnProgress::PartAnswered(answer.clone()));
        }
        answers.push(answer);
    }

    Ok(answers)
}

/// Render the single assistant message for a turn
pub fn compose_answer(parts: &[SubAnswer]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.answer.clone(),
        _ => parts
            .iter()
            .map(|p| format!("**Part {}**: *{}*\n\n{}", p.index, p.sub_query, p.answer))
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::ScriptedModel;
    use crate::models::MessageRole;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn part(index: usize, q: &str, a: &str) -> SubAnswer {
        SubAnswer {
            index,
            sub_query: q.to_string(),
            answer: a.to_string(),
            usage: None,
        }
    }

    #[test]
    fn test_context_layout() {
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let prior = vec![part(1, "q1", "a1")];
        let messages = build_context(&history, &prior, "q2");

        let flat: Vec<(MessageRole, &str)> =
            messages.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            flat,
            vec![
                (MessageRole::User, "hi"),
                (MessageRole::Assistant, "hello"),
                (MessageRole::User, "q1"),
                (MessageRole::Assistant, "a1"),
                (MessageRole::User, "q2"),
            ]
        );
    }

    #[test]
    fn test_compose_single_part_is_bare() {
        assert_eq!(compose_answer(&[part(1, "q", "just this")]), "just this");
        assert_eq!(compose_answer(&[]), "");
    }

    #[test]
    fn test_compose_multiple_parts() {
        let reply = compose_answer(&[part(1, "A?", "a"), part(2, "B?", "b")]);
        assert_eq!(reply, "**Part 1**: *A?*\n\na\n\n---\n\n**Part 2**: *B?*\n\nb");
    }

    #[tokio::test]
    async fn test_each_call_sees_prior_answers() {
        let model = ScriptedModel::replying("m", &["a1", "a2", "a3"]);
        let subs: Vec<String> = vec!["q1".into(), "q2".into(), "q3".into()];
        let answers = answer_sequentially(model.as_ref(), &[], &subs, &ModelConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(answers.len(), 3);
        let calls = model.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[1].len(), 3);
        assert_eq!(calls[2].len(), 5);
        assert_eq!(calls[2][1].content, "a1");
        assert_eq!(calls[2][3].content, "a2");
        assert_eq!(calls[2][4].content, "q3");
    }

    #[tokio::test]
    async fn test_error_stops_the_loop() {
        let model = ScriptedModel::new(
            "m",
            vec![Ok("a1".into()), Err(ChatError::NetworkError("reset".into())), Ok("a3".into())],
        );
        let subs: Vec<String> = vec!["q1".into(), "q2".into(), "q3".into()];
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress: ProgressCallback = Arc::new(move |p: TurnProgress| sink.lock().unwrap().push(p));

        let result =
            answer_sequentially(model.as_ref(), &[], &subs, &ModelConfig::default(), Some(&progress)).await;

        assert!(matches!(result, Err(ChatError::NetworkError(_))));
        assert_eq!(model.call_count(), 2);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], TurnProgress::AnsweringPart { index: 1, total: 3 });
        assert_eq!(events[2], TurnProgress::AnsweringPart { index: 2, total: 3 });
    }
}
