//! Completion provider contract
//!
//! The text-generation backend is an external collaborator. The routing
//! layer talks to it through [`CompletionProvider`], which exposes one
//! synchronous completion call and one finite token stream per request.

pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use openai::OpenAiProvider;

/// A finite stream of response fragments. Errors surface as one `Err` item;
/// the stream is not restartable.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// Chat message sent to the completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Text-generation backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion over the given turns and return the full text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Open a streaming completion over the given turns.
    fn stream_complete(&self, messages: Vec<ChatMessage>) -> TokenStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("be helpful");
        assert_eq!(msg.role, ChatRole::System);

        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert!(json.contains("\"role\":\"assistant\""));
    }
}
