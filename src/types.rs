//! Core types used throughout voxnote

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for notes
pub type NoteId = Uuid;

/// Unique identifier for chat messages
pub type MessageId = Uuid;

/// Fixed system instruction sent with every rewrite action
pub const SYSTEM_PROMPT: &str = "You are an efficient personal assistant; \
always respond in the configured response language; be concise.";

/// A captured voice note
///
/// Serialized field names match the on-disk note file: a single JSON array
/// of these objects, rewritten wholesale on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    #[serde(rename = "audioURL", skip_serializing_if = "Option::is_none", default)]
    pub audio_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(title: String, content: String, audio_path: Option<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            audio_path,
            created_at: Utc::now(),
            tags: Vec::new(),
        }
    }

    /// Merge an AI rewrite result into the note body, separated by a divider
    pub fn append_section(&mut self, text: &str) {
        if self.content.is_empty() {
            self.content = text.to_string();
        } else {
            self.content = format!("{}\n\n---\n\n{}", self.content, text);
        }
    }

    /// Case-insensitive match against title or content
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.title.to_lowercase().contains(&q) || self.content.to_lowercase().contains(&q)
    }
}

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content.into())
    }
}

/// Fixed text-transformation actions applied to a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteAction {
    /// Condense into bullet points
    Summarize,
    /// Professional, clear, grammatical rewrite
    Improve,
    /// Turn the text into a prompt for a generative AI
    GeneratePrompt,
    /// Extract a task checklist
    CreateTask,
}

impl RewriteAction {
    /// Build the user message for this action over the given text
    pub fn user_prompt(&self, text: &str) -> String {
        match self {
            Self::Summarize => {
                format!(
                    "Summarize the following text as concise bullet points:\n\n{}",
                    text
                )
            }
            Self::Improve => {
                format!(
                    "Rewrite the following text to be more professional, clear, and grammatically correct:\n\n{}",
                    text
                )
            }
            Self::GeneratePrompt => {
                format!(
                    "Based on the text below, create a structured, detailed prompt for a generative AI:\n\n{}",
                    text
                )
            }
            Self::CreateTask => {
                format!(
                    "Extract actionable tasks from the following text and format them as a checklist:\n\n{}",
                    text
                )
            }
        }
    }

    /// Human-readable name for menus and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Summarize => "Summarize",
            Self::Improve => "Improve Writing",
            Self::GeneratePrompt => "Generate Prompt",
            Self::CreateTask => "Create Task",
        }
    }

    /// Get all available actions
    pub fn all() -> &'static [RewriteAction] {
        &[
            RewriteAction::Summarize,
            RewriteAction::Improve,
            RewriteAction::GeneratePrompt,
            RewriteAction::CreateTask,
        ]
    }
}
