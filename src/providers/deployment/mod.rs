pub mod client;
pub mod types;

pub use client::{CompletionBackend, DeploymentClient};
pub use types::{ChatMessage, Completion, CompletionRequest, CompletionResponse, extract_text};
