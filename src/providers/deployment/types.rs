use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for `/chat/completions`. Only a single user turn is ever sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: message.into(),
            }],
        }
    }
}

// 只解析需要的字段，其余保留在 raw 中
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// A successful completion: the assistant text plus the untouched response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub raw: Value,
}

/// `choices[0].message.content`; a missing message or content is an empty reply,
/// while an absent or empty `choices` list means the agent produced nothing.
pub fn extract_text(raw: &Value) -> Result<String, RelayError> {
    let parsed: CompletionResponse =
        serde_json::from_value(raw.clone()).map_err(|_| RelayError::NoResponse)?;
    let first = parsed
        .choices
        .and_then(|choices| choices.into_iter().next())
        .ok_or(RelayError::NoResponse)?;
    Ok(first.message.and_then(|m| m.content).unwrap_or_default())
}
