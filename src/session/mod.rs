// Gateway module for session - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod chat;
mod mode;
mod transcript;

// Public re-exports - the ONLY way to access session functionality
pub use chat::{ChatSession, PendingTurn};
pub use mode::ResponseMode;
pub use transcript::Transcript;
