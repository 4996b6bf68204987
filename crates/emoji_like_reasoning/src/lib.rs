pub mod api_types;
pub mod classifier;
pub mod llm;
pub mod providers;
pub mod retry;

pub use classifier::LlmSentimentClassifier;
pub use llm::{CompletionParams, LlmClient};
pub use providers::create_client;
