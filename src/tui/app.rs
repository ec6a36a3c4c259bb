use crate::app::UIConfig;
use crate::chain::{FallbackReason, SubAnswer, TurnOutcome, TurnProgress};
use crate::constants::SPINNER_FRAMES;
use crate::session::{ChatSession, PendingTurn, ResponseMode};
use crate::utils::ChatError;

/// Severity of an inline notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message shown in the chat area that is not part of the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Number of messages (including a query in flight) shown before this notice
    pub anchor: usize,
}

/// What the assistant is doing right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Thinking,
    Analyzing,
    Answering { index: usize, total: usize },
}

impl TurnPhase {
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Idle => "Ready".to_string(),
            Self::Thinking => "Thinking...".to_string(),
            Self::Analyzing => "Analyzing your question...".to_string(),
            Self::Answering { index, total } => format!("Answering part {} of {}", index, total),
        }
    }
}

/// Application state
pub struct App {
    pub session: ChatSession,
    /// User input buffer
    pub input: String,
    /// Is the app running?
    pub running: bool,
    pub phase: TurnPhase,
    /// Query of the turn in flight
    pub pending_query: Option<String>,
    /// Parts of the turn in flight that already have answers
    pub live_parts: Vec<SubAnswer>,
    pub planned_parts: usize,
    pub notices: Vec<Notice>,
    /// Scroll offset for chat view, counted up from the bottom
    pub scroll_offset: u16,
    /// Show settings sidebar
    pub show_sidebar: bool,
    pub show_line_numbers: bool,
    /// Status message
    pub status_message: Option<String>,
    pub spinner_frame: usize,
}

impl App {
    /// Create a new app instance
    pub fn new(session: ChatSession, ui: &UIConfig) -> Self {
        let mut app = Self {
            session,
            input: String::new(),
            running: true,
            phase: TurnPhase::Idle,
            pending_query: None,
            live_parts: Vec::new(),
            planned_parts: 0,
            notices: Vec::new(),
            scroll_offset: 0,
            show_sidebar: ui.show_sidebar,
            show_line_numbers: ui.show_line_numbers,
            status_message: None,
            spinner_frame: 0,
        };

        if let Some(err) = app.session.config_error().map(str::to_string) {
            app.notify(NoticeLevel::Error, format!("{} (use :model to pick another model)", err));
        }
        app
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let in_flight = usize::from(self.pending_query.is_some());
        self.notices.push(Notice {
            level,
            text: text.into(),
            anchor: self.session.transcript().len() + in_flight,
        });
        self.scroll_offset = 0;
    }

    /// Set status message
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Consume the input buffer
    ///
    /// Commands run immediately; a chat message that passes validation is
    /// returned as a turn to run. A leading `::` sends a message starting
    /// with a single colon.
    pub fn submit_input(&mut self) -> Option<PendingTurn> {
        let input = std::mem::take(&mut self.input);
        let trimmed = input.trim_start();
        if trimmed.trim_end().is_empty() {
            return None;
        }

        let message = if trimmed.starts_with("::") {
            input.replacen("::", ":", 1)
        } else if let Some(command) = trimmed.strip_prefix(':') {
            self.handle_command(command.trim_end());
            return None;
        } else {
            input.clone()
        };

        if self.phase.is_busy() {
            self.input = input;
            self.set_status("Wait for the current answer to finish");
            return None;
        }

        match self.session.prepare_turn(&message) {
            Ok(pending) => {
                self.begin_turn(&pending);
                Some(pending)
            }
            Err(e) => {
                self.input = input;
                self.notify(NoticeLevel::Error, e.to_string());
                None
            }
        }
    }

    fn begin_turn(&mut self, pending: &PendingTurn) {
        self.pending_query = Some(pending.query.clone());
        self.live_parts.clear();
        self.planned_parts = 0;
        self.phase = if pending.options.decompose {
            TurnPhase::Analyzing
        } else {
            TurnPhase::Thinking
        };
        self.scroll_offset = 0;
        self.clear_status();
    }

    pub fn apply_progress(&mut self, progress: TurnProgress) {
        match progress {
            TurnProgress::Decomposing => self.phase = TurnPhase::Analyzing,
            TurnProgress::Planned(subs) => {
                self.planned_parts = subs.len();
                self.notify(
                    NoticeLevel::Info,
                    format!(
                        "I'll break this down into {} parts to provide a more thorough response.",
                        subs.len()
                    ),
                );
            }
            TurnProgress::Fallback(reason) => {
                let level = match reason {
                    FallbackReason::ProviderFailed(_) => NoticeLevel::Warning,
                    _ => NoticeLevel::Info,
                };
                self.notify(level, reason.describe());
            }
            TurnProgress::AnsweringPart { index, total } => {
                self.phase = if total > 1 {
                    TurnPhase::Answering { index, total }
                } else {
                    TurnPhase::Thinking
                };
            }
            TurnProgress::PartAnswered(part) => {
                if self.planned_parts > 1 {
                    self.live_parts.push(part);
                }
            }
        }
    }

    /// Commit a finished turn, or report why it failed
    pub fn finish_turn(&mut self, result: Result<TurnOutcome, ChatError>) {
        let query = self.pending_query.take();
        self.live_parts.clear();
        self.planned_parts = 0;
        self.phase = TurnPhase::Idle;

        match (query, result) {
            (Some(query), Ok(outcome)) => {
                self.session.commit(&query, &outcome);
                let mut status = format!(
                    "Answered with {} in {} call{}",
                    outcome.model_name,
                    outcome.model_calls,
                    if outcome.model_calls == 1 { "" } else { "s" }
                );
                if let Some(usage) = outcome.usage {
                    status.push_str(&format!(" ({} tokens)", usage.total_tokens));
                }
                self.set_status(status);
            }
            (query, Err(e)) => {
                // The query was never committed, so its notices move back with it
                let len = self.session.transcript().len();
                for notice in self.notices.iter_mut().filter(|n| n.anchor > len) {
                    notice.anchor = len;
                }
                self.notify(
                    NoticeLevel::Error,
                    format!("This turn failed: {}. Please try again.", e),
                );
                if let Some(query) = query {
                    if self.input.is_empty() {
                        self.input = query;
                    }
                }
            }
            (None, Ok(_)) => {}
        }
        self.scroll_offset = 0;
    }

    pub fn handle_command(&mut self, command: &str) {
        let parts: Vec<&str> = command.split_whitespace().collect();

        match parts.first().copied() {
            Some("quit") | Some("q") => self.quit(),
            Some("clear") => self.reset_conversation(),
            Some("model") | Some("m") => match parts.get(1) {
                Some(model_id) => self.switch_model(model_id),
                None => {
                    let name = self.session.model_name().to_string();
                    self.set_status(format!("Current model: {}", name));
                }
            },
            Some("split") => match parts.get(1) {
                Some(arg) => match ResponseMode::from_str(arg) {
                    Some(mode) => self.set_mode(mode),
                    None => self.set_status(format!("Unknown split setting: {} (use on or off)", arg)),
                },
                None => self.toggle_mode(),
            },
            Some("sidebar") | Some("sb") => self.toggle_sidebar(),
            Some("help") | Some("h") => self.notify(NoticeLevel::Info, HELP_TEXT),
            Some(other) => self.set_status(format!("Unknown command: :{}", other)),
            None => {}
        }
    }

    pub fn switch_model(&mut self, model_id: &str) {
        if self.phase.is_busy() {
            self.set_status("Wait for the current answer before switching models");
            return;
        }
        match self.session.switch_model(model_id) {
            Ok(()) => {
                let name = self.session.model_name().to_string();
                self.set_status(format!("Switched to {}", name));
            }
            Err(e) => self.notify(NoticeLevel::Error, e.to_string()),
        }
    }

    pub fn reset_conversation(&mut self) {
        if self.phase.is_busy() {
            self.set_status("Wait for the current answer before clearing");
            return;
        }
        self.session.reset();
        self.notices.clear();
        self.scroll_offset = 0;
        self.set_status("Chat cleared");
    }

    pub fn toggle_mode(&mut self) {
        let mode = self.session.toggle_mode();
        self.announce_mode(mode);
    }

    pub fn set_mode(&mut self, mode: ResponseMode) {
        self.session.set_mode(mode);
        self.announce_mode(mode);
    }

    fn announce_mode(&mut self, mode: ResponseMode) {
        self.set_status(format!("{}: {}", mode.display_name(), mode.description()));
    }

    /// Toggle sidebar visibility
    pub fn toggle_sidebar(&mut self) {
        self.show_sidebar = !self.show_sidebar;
    }

    /// Scroll chat view up
    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(amount);
    }

    /// Scroll chat view down
    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub fn tick(&mut self) {
        if self.phase.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }
}

pub const HELP_TEXT: &str = "Commands:
  :model [id]      Switch model or show the current one
  :split [on|off]  Toggle smart prompt splitting
  :clear           Clear the conversation
  :sidebar         Toggle the settings sidebar
  :help            Show this help
  :quit            Quit
  ::text           Send a message that starts with ':'

Keys:
  Enter            Send message
  Ctrl+D           Toggle smart prompt splitting
  Ctrl+L           Clear the conversation
  Ctrl+B           Toggle the sidebar
  PgUp/PgDn        Scroll
  Esc              Clear the input
  Ctrl+C           Quit";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Config, Credentials};
    use crate::chain::TurnRunner;
    use crate::models::testing::ScriptedModel;
    use crate::models::ModelConfig;

    fn app_with(replies: &[&str]) -> App {
        let model = ScriptedModel::replying("test/model", replies);
        let runner = TurnRunner::new(model.clone(), model, ModelConfig::default());
        let session = ChatSession::with_runner(Config::default(), runner);
        App::new(session, &UIConfig::default())
    }

    #[test]
    fn test_config_error_is_visible_at_startup() {
        let session = ChatSession::new(Config::default(), Credentials::default(), "gpt-4o-mini");
        let mut app = App::new(session, &UIConfig::default());

        assert_eq!(app.notices.len(), 1);
        assert_eq!(app.notices[0].level, NoticeLevel::Error);

        app.input = "hello".to_string();
        assert!(app.submit_input().is_none());
        assert_eq!(app.input, "hello");
        assert_eq!(app.notices.len(), 2);
        assert!(!app.phase.is_busy());
    }

    #[tokio::test]
    async fn test_submit_and_finish_turn() {
        let mut app = app_with(&["Paris"]);
        app.input = "Capital of France?".to_string();

        let pending = app.submit_input().expect("turn should start");
        assert_eq!(app.phase, TurnPhase::Thinking);
        assert_eq!(app.pending_query.as_deref(), Some("Capital of France?"));

        let result = pending.run(None).await;
        app.finish_turn(result);

        assert_eq!(app.phase, TurnPhase::Idle);
        assert_eq!(app.session.transcript().len(), 2);
        assert!(app.pending_query.is_none());
    }

    #[test]
    fn test_double_colon_sends_message() {
        let mut app = app_with(&[]);
        app.input = "::) is a smiley".to_string();

        let pending = app.submit_input().expect("message should be sent");
        assert_eq!(pending.query, ":) is a smiley");
        assert!(app.session.mode() == ResponseMode::Direct);

        let mut app = app_with(&[]);
        app.input = ":split on".to_string();
        assert!(app.submit_input().is_none());
        assert!(app.session.mode().is_decompose());
    }

    #[test]
    fn test_failed_turn_restores_input() {
        let mut app = app_with(&[]);
        app.input = "question".to_string();
        let _pending = app.submit_input().expect("turn should start");

        app.finish_turn(Err(ChatError::NetworkError("connection reset".into())));

        assert_eq!(app.session.transcript().len(), 0);
        assert_eq!(app.input, "question");
        assert!(app.notices.last().unwrap().text.contains("try again"));
    }

    #[test]
    fn test_progress_updates_phase() {
        let mut app = app_with(&[]);
        app.apply_progress(TurnProgress::Decomposing);
        assert_eq!(app.phase.label(), "Analyzing your question...");

        app.apply_progress(TurnProgress::Planned(vec!["a".into(), "b".into()]));
        app.apply_progress(TurnProgress::AnsweringPart { index: 2, total: 2 });
        assert_eq!(app.phase.label(), "Answering part 2 of 2");

        app.apply_progress(TurnProgress::PartAnswered(SubAnswer {
            index: 1,
            sub_query: "a".into(),
            answer: "x".into(),
            usage: None,
        }));
        assert_eq!(app.live_parts.len(), 1);
    }

    #[test]
    fn test_commands() {
        let mut app = app_with(&[]);
        assert_eq!(app.session.mode(), ResponseMode::Direct);

        app.handle_command("split on");
        assert_eq!(app.session.mode(), ResponseMode::Decompose);
        app.handle_command("split");
        assert_eq!(app.session.mode(), ResponseMode::Direct);

        let sidebar = app.show_sidebar;
        app.handle_command("sidebar");
        assert_eq!(app.show_sidebar, !sidebar);

        app.handle_command("model");
        assert_eq!(app.status_message.as_deref(), Some("Current model: test/model"));

        app.handle_command("frobnicate");
        assert!(app.status_message.as_deref().unwrap().contains("Unknown command"));

        app.input = ":quit".to_string();
        assert!(app.submit_input().is_none());
        assert!(!app.running);
    }

    #[test]
    fn test_clear_resets_transcript_and_notices() {
        let mut app = app_with(&[]);
        app.session.commit(
            "q",
            &TurnOutcome {
                reply: "a".into(),
                parts: Vec::new(),
                decomposition: None,
                model_calls: 1,
                model_name: "test/model".into(),
                usage: None,
            },
        );
        app.notify(NoticeLevel::Info, "hello");

        app.handle_command("clear");
        assert!(app.session.transcript().is_empty());
        assert!(app.notices.is_empty());
    }
}
