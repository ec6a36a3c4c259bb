// Gateway module for TUI - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod app;
mod markdown;
mod math;
mod render;
mod ui;

// Public re-exports - the ONLY way to access TUI functionality
pub use app::{App, Notice, NoticeLevel, TurnPhase};
pub use markdown::parse_markdown;
pub use math::latex_to_unicode;
pub use ui::run_ui;
