// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod factory;
mod provider;
mod traits;
mod types;
mod unified;

#[cfg(test)]
pub(crate) mod testing;

// Public re-exports - the ONLY way to access model functionality
pub use factory::{resolve_endpoint, Auth, Endpoint, ModelFactory};
pub use provider::{ModelId, Provider};
pub use traits::Model;
#[cfg(test)]
pub use traits::MockModel;
pub use types::{ChatMessage, MessageRole, ModelConfig, ModelResponse, TokenUsage};
pub use unified::UnifiedModel;
