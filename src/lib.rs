//! voxnote - Voice-note engine with AI-powered rewrites
//!
//! Records microphone audio, transcribes it through a remote speech API,
//! persists the result as a note, and offers chat-completion rewrite actions
//! (summarize, improve, generate-prompt, create-task) over the text.

pub mod audio;
pub mod error;
pub mod integrations;
pub mod notes;
pub mod providers;
pub mod session;
pub mod settings;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main engine components for convenience
pub use audio::{Recorder, RecorderState};
pub use integrations::{CalendarClient, IssueClient};
pub use notes::NoteStore;
pub use providers::{CompletionProvider, TranscriptionProvider};
pub use session::{SessionMode, VoiceSession};
pub use settings::Settings;
