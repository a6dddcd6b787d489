//! Recording session orchestration: capture, transcribe, persist, rewrite
//!
//! A session owns the mutable state the presentation layer observes
//! (transcript, conversation, busy and error flags) and drives the pipeline
//! from a finished recording to a stored note or a conversation turn.
//! Sessions are built for a single caller driving one operation at a time;
//! the flags are observable state, not a concurrency guard.

use chrono::Local;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

use crate::audio::Recorder;
use crate::error::Result;
use crate::notes::NoteStore;
use crate::providers::{
    CompletionProvider, CompletionRequest, TranscriptionProvider, TranscriptionRequest,
};
use crate::types::{Message, RewriteAction};

const MISSING_KEY_MESSAGE: &str = "Please set your OpenAI API Key in Settings.";
const WELCOME_MESSAGE: &str = "Hi! I'm your personal assistant. How can I help?";

/// What a finished recording turns into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionMode {
    /// Transcript lands in an editable buffer and is saved as a dated note
    #[default]
    TranscriptBuffer,
    /// Transcript becomes a user turn answered by the completion provider
    Conversation,
}

/// Orchestrates recording, transcription, persistence, and rewrite actions
pub struct VoiceSession {
    store: Arc<NoteStore>,
    transcription: Arc<dyn TranscriptionProvider>,
    completion: Arc<dyn CompletionProvider>,
    mode: SessionMode,
    recorder: Mutex<Option<Recorder>>,
    transcript: Mutex<String>,
    messages: Mutex<Vec<Message>>,
    is_recording: AtomicBool,
    is_processing: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl VoiceSession {
    pub fn new(
        store: Arc<NoteStore>,
        transcription: Arc<dyn TranscriptionProvider>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            store,
            transcription,
            completion,
            mode: SessionMode::default(),
            recorder: Mutex::new(None),
            transcript: Mutex::new(String::new()),
            messages: Mutex::new(Vec::new()),
            is_recording: AtomicBool::new(false),
            is_processing: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Set the session mode; conversation sessions open with a greeting
    pub fn with_mode(self, mode: SessionMode) -> Self {
        let session = Self { mode, ..self };
        if mode == SessionMode::Conversation {
            let mut messages = session.messages.lock();
            if messages.is_empty() {
                messages.push(Message::assistant(WELCOME_MESSAGE));
            }
        }
        session
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    // ============ Observable state ============

    pub fn transcript(&self) -> String {
        self.transcript.lock().clone()
    }

    /// Load existing text into the transcript buffer, e.g. a stored note's
    /// content before running a rewrite action on it
    pub fn set_transcript(&self, text: impl Into<String>) {
        *self.transcript.lock() = text.into();
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock() = None;
    }

    fn set_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    // ============ Recording ============

    /// Start a new take
    ///
    /// Returns whether recording is now active. The previous transcript and
    /// error are cleared on a successful start.
    pub fn start_recording(&self) -> bool {
        if self.is_recording.load(Ordering::SeqCst) {
            return true;
        }

        let mut recorder_lock = self.recorder.lock();

        // create the recorder on first use
        if recorder_lock.is_none() {
            match Recorder::new() {
                Ok(recorder) => *recorder_lock = Some(recorder),
                Err(e) => {
                    let message = format!("Failed to create recorder: {e}");
                    error!("{message}");
                    self.set_error(message);
                    return false;
                }
            }
        }

        if let Some(ref mut recorder) = *recorder_lock {
            match recorder.start() {
                Ok(_) => {
                    self.transcript.lock().clear();
                    self.clear_error();
                    self.is_recording.store(true, Ordering::SeqCst);
                    info!("Recording session started");
                    true
                }
                Err(e) => {
                    let message = format!("Failed to start recording: {e}");
                    error!("{message}");
                    self.set_error(message);
                    false
                }
            }
        } else {
            self.set_error("Recorder unavailable");
            false
        }
    }

    /// Stop the current take and return the finished audio file
    ///
    /// The recorder is dropped afterwards so the capture device is fully
    /// released between takes.
    pub fn stop_recording(&self) -> Option<PathBuf> {
        self.is_recording.store(false, Ordering::SeqCst);

        let mut recorder_lock = self.recorder.lock();
        if let Some(mut recorder) = recorder_lock.take() {
            match recorder.stop() {
                Ok(path) => {
                    debug!("Recording stopped: {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    let message = format!("Failed to stop recording: {e}");
                    error!("{message}");
                    self.set_error(message);
                    None
                }
            }
        } else {
            self.set_error("Recorder unavailable");
            None
        }
    }

    /// Flip between recording and processing
    ///
    /// Returns whether recording is now active. Stopping feeds the finished
    /// take straight into [`process_recording`](Self::process_recording).
    pub async fn toggle_recording(&self) -> bool {
        if self.is_recording.load(Ordering::SeqCst) {
            if let Some(path) = self.stop_recording() {
                self.process_recording(&path).await;
            }
            false
        } else {
            self.start_recording()
        }
    }

    // ============ Pipeline ============

    /// Run the pipeline for a finished recording
    ///
    /// Transcribes the audio, then either stores a dated note (transcript
    /// mode) or appends a conversation turn (conversation mode). A missing
    /// API key fails before any network call. Failures surface through
    /// [`last_error`](Self::last_error) and leave no partial state.
    pub async fn process_recording(&self, audio_path: &Path) {
        if !self.transcription.is_configured() {
            self.set_error(MISSING_KEY_MESSAGE);
            return;
        }

        self.is_processing.store(true, Ordering::SeqCst);
        if let Err(e) = self.run_pipeline(audio_path).await {
            error!("Recording pipeline failed: {e}");
            self.set_error(format!("Error: {e}"));
        }
        self.is_processing.store(false, Ordering::SeqCst);
    }

    async fn run_pipeline(&self, audio_path: &Path) -> Result<()> {
        let text = self
            .transcription
            .transcribe(TranscriptionRequest::new(audio_path))
            .await?;
        debug!("Transcribed {} chars", text.len());

        match self.mode {
            SessionMode::TranscriptBuffer => {
                let title = format!("Note {}", Local::now().format("%Y-%m-%d %H:%M"));
                let note = self
                    .store
                    .add(title, text.clone(), Some(audio_path.to_path_buf()))?;
                // commit the transcript only after the note is safely stored
                *self.transcript.lock() = text;
                info!("Saved note {}", note.id);
            }
            SessionMode::Conversation => {
                // build the candidate history without holding the lock
                // across the network call; commit both turns on success
                let mut history = self.messages.lock().clone();
                history.push(Message::user(text));

                let reply = self
                    .completion
                    .complete(CompletionRequest::new(history.clone()))
                    .await?;

                let mut messages = self.messages.lock();
                *messages = history;
                messages.push(Message::assistant(reply));
            }
        }
        self.clear_error();
        Ok(())
    }

    /// Run a rewrite action over the current transcript
    ///
    /// Returns the raw model reply, or an empty string after recording an
    /// error. Never touches the note store; the caller decides whether to
    /// append or replace.
    pub async fn perform_action(&self, action: RewriteAction) -> String {
        let text = self.transcript.lock().clone();
        if text.is_empty() {
            self.set_error("No transcript to process.");
            return String::new();
        }
        if !self.completion.is_configured() {
            self.set_error(MISSING_KEY_MESSAGE);
            return String::new();
        }

        self.is_processing.store(true, Ordering::SeqCst);
        let result = self
            .completion
            .complete(CompletionRequest::for_action(action, &text))
            .await;
        self.is_processing.store(false, Ordering::SeqCst);

        match result {
            Ok(reply) => {
                debug!("{} produced {} chars", action.label(), reply.len());
                self.clear_error();
                reply
            }
            Err(e) => {
                error!("{} action failed: {e}", action.label());
                self.set_error(format!("Error: {e}"));
                String::new()
            }
        }
    }

    /// Send a typed message in conversation mode
    ///
    /// The user turn is appended before the key check, mirroring how a typed
    /// message stays visible in the conversation even when the reply fails.
    pub async fn send_message(&self, text: impl Into<String>) {
        if self.mode != SessionMode::Conversation {
            self.set_error("Messages require a conversation session.");
            return;
        }

        self.messages.lock().push(Message::user(text.into()));

        if !self.completion.is_configured() {
            self.set_error(MISSING_KEY_MESSAGE);
            return;
        }

        self.is_processing.store(true, Ordering::SeqCst);
        let history = self.messages.lock().clone();
        match self
            .completion
            .complete(CompletionRequest::new(history))
            .await
        {
            Ok(reply) => {
                self.messages.lock().push(Message::assistant(reply));
                self.clear_error();
            }
            Err(e) => {
                error!("Completion failed: {e}");
                self.set_error(format!("Error: {e}"));
            }
        }
        self.is_processing.store(false, Ordering::SeqCst);
    }

    /// Shared note store handle
    pub fn store(&self) -> &Arc<NoteStore> {
        &self.store
    }
}
