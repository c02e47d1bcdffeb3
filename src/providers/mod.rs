pub mod deployment;

pub use deployment::{Completion, CompletionBackend, DeploymentClient};
