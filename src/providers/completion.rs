//! Completion provider trait and types

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Message, RewriteAction, SYSTEM_PROMPT};

/// Request for a chat completion over an ordered message history
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Messages in conversation order, oldest first
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Build the fixed two-message request for a rewrite action: the system
    /// instruction followed by the action template applied to the text
    pub fn for_action(action: RewriteAction, text: &str) -> Self {
        Self {
            messages: vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(action.user_prompt(text)),
            ],
        }
    }
}

/// Trait for chat completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Run the completion and return the assistant reply
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
