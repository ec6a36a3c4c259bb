use serde::Serialize;

use crate::models::ChatMessage;

/// Append-only record of the conversation shown to the user
///
/// Holds one user message and one assistant message per completed turn.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed turn
    pub fn record_turn(&mut self, query: &str, reply: &str) {
        self.messages.push(ChatMessage::user(query));
        self.messages.push(ChatMessage::assistant(reply));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages from the last `max_turns` turns, or all of them
    pub fn context_window(&self, max_turns: Option<usize>) -> Vec<ChatMessage> {
        match max_turns {
            Some(turns) => {
                let keep = turns.saturating_mul(2).min(self.messages.len());
                self.messages[self.messages.len() - keep..].to_vec()
            }
            None => self.messages.clone(),
        }
    }

    pub fn turn_count(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[test]
    fn test_record_turn_appends_pair() {
        let mut transcript = Transcript::new();
        transcript.record_turn("hi", "hello");
        transcript.record_turn("how are you?", "fine");

        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.turn_count(), 2);
        let roles: Vec<MessageRole> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant
            ]
        );
        assert_eq!(transcript.messages()[2].content, "how are you?");
    }

    #[test]
    fn test_context_window() {
        let mut transcript = Transcript::new();
        for i in 0..5 {
            transcript.record_turn(&format!("q{}", i), &format!("a{}", i));
        }

        let window = transcript.context_window(Some(2));
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "q3");
        assert_eq!(transcript.context_window(Some(50)).len(), 10);
        assert_eq!(transcript.context_window(None).len(), 10);
        assert!(transcript.context_window(Some(0)).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut transcript = Transcript::new();
        transcript.record_turn("q", "a");
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
