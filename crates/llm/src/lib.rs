pub mod gateway;
pub mod providers;
pub mod traits;

pub use gateway::LlmGateway;
pub use traits::{CompletionRequest, LlmProvider};
