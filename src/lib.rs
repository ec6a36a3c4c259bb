pub mod app;
pub mod chain;
pub mod cli;
pub mod constants;
pub mod models;
pub mod proxy;
pub mod runtime;
pub mod session;
pub mod tui;
pub mod utils;

pub use app::{load_config, Config, Credentials};
pub use chain::{TurnOutcome, TurnRunner};
pub use models::{Model, ModelFactory};
pub use session::ChatSession;
pub use tui::run_ui;
pub use utils::ChatError;
