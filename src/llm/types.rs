//! Chat messages exchanged with a completion backend.
//!
//! Both supported backends accept `{ "role", "content" }` objects, so
//! [`Message`] is serialized as-is.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Text produced by one completion call.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    /// The backend stopped at its token limit; JSON output is likely cut.
    pub truncated: bool,
    pub total_tokens: Option<u32>,
}
