/// LiteLLM proxy support module - Gateway
mod health;

pub use health::is_proxy_running;
