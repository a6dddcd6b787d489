//! Provider abstraction layer for transcription and completion services
mod completion;
mod openai;
mod transcription;

pub use completion::{CompletionProvider, CompletionRequest};
pub use openai::{OpenAICompletionProvider, OpenAITranscriptionProvider};
pub use transcription::{TranscriptionProvider, TranscriptionRequest};
