// Gateway module for chain - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod accumulator;
mod decompose;
mod turn;

// Public re-exports - the ONLY way to access chain functionality
pub use accumulator::{answer_sequentially, build_context, compose_answer, SubAnswer};
pub use decompose::{
    build_decomposition_prompt, decompose_query, parse_sub_queries, Decomposition, FallbackReason,
};
pub use turn::{ProgressCallback, TurnOptions, TurnOutcome, TurnProgress, TurnRunner};
