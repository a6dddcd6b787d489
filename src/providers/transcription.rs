//! Transcription provider trait and types

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;

/// Request for transcription of a recorded audio file
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Path of the audio file to upload
    pub audio_path: PathBuf,
}

impl TranscriptionRequest {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
        }
    }
}

/// Trait for transcription providers
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Transcribe the audio file to text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
