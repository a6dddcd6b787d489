//! OpenAI provider implementations for Whisper transcription and GPT chat completion

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::types::MessageRole;

use super::{
    CompletionProvider, CompletionRequest, TranscriptionProvider, TranscriptionRequest,
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI Whisper transcription provider
pub struct OpenAITranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAITranscriptionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()));

        Self {
            client: Client::new(),
            api_key: key,
            model: "whisper-1".to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

#[async_trait]
impl TranscriptionProvider for OpenAITranscriptionProvider {
    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String> {
        let api_key = self.api_key()?;

        let audio = tokio::fs::read(&request.audio_path).await?;
        let (file_name, mime) = upload_labels(&request.audio_path);

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| Error::RemoteService(format!("Failed to create form part: {e}")))?;

        // part order matters to some proxies: file first, then model
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        debug!(
            "Sending transcription request for {}",
            request.audio_path.display()
        );

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Whisper API error: {} - {}", status, error_text);
            return Err(Error::RemoteService(format!(
                "Whisper API error: {} - {}",
                status, error_text
            )));
        }

        let whisper_response: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(format!("Invalid Whisper response: {e}")))?;

        Ok(whisper_response.text)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI GPT chat completion provider
pub struct OpenAICompletionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAICompletionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()));

        Self {
            client: Client::new(),
            api_key: key,
            model: "gpt-4o".to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: MessageRole,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    fn name(&self) -> &'static str {
        "OpenAI GPT"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let api_key = self.api_key()?;

        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
        };

        debug!(
            "Sending completion request with {} messages",
            chat_request.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error: {} - {}", status, error_text);
            return Err(Error::RemoteService(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(format!("Invalid completion response: {e}")))?;

        // an empty choice list is a valid (empty) reply, not an error
        let text = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(text)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Fixed multipart labels for an upload, derived from the file extension
///
/// Unknown extensions fall back to the m4a labels the mobile capture path
/// produced.
fn upload_labels(path: &Path) -> (&'static str, &'static str) {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => ("audio.wav", "audio/wav"),
        _ => ("audio.m4a", "audio/m4a"),
    }
}
