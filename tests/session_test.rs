//! End-to-end tests for the recording session pipeline
//!
//! Providers are replaced with in-process mocks so the orchestration rules
//! (fail-fast on missing keys, busy-flag discipline, failure atomicity,
//! message ordering) can be verified without audio hardware or a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use voxnote::error::{Error, Result};
use voxnote::providers::{
    CompletionProvider, CompletionRequest, TranscriptionProvider, TranscriptionRequest,
};
use voxnote::types::{Message, MessageRole, RewriteAction, SYSTEM_PROMPT};
use voxnote::{NoteStore, SessionMode, VoiceSession};

// ============ Mock Providers ============

struct MockTranscription {
    configured: bool,
    response: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl MockTranscription {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            configured: false,
            response: Ok(String::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscription {
    fn name(&self) -> &'static str {
        "mock transcription"
    }

    async fn transcribe(&self, _request: TranscriptionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(Error::RemoteService(message.clone())),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

struct MockCompletion {
    configured: bool,
    response: std::result::Result<String, String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl MockCompletion {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            configured: false,
            response: Ok(String::new()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Vec<Message> {
        self.seen.lock().last().cloned().expect("a request was made")
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &'static str {
        "mock completion"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.messages);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(Error::RemoteService(message.clone())),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

fn session_with(
    mode: SessionMode,
    transcription: Arc<MockTranscription>,
    completion: Arc<MockCompletion>,
) -> (tempfile::TempDir, Arc<NoteStore>, VoiceSession) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(NoteStore::open(dir.path().join("notes.json")));
    let session =
        VoiceSession::new(Arc::clone(&store), transcription, completion).with_mode(mode);
    (dir, store, session)
}

// ============ Transcript Buffer Mode ============

#[tokio::test]
async fn test_recording_becomes_a_dated_note() {
    let transcription = MockTranscription::ok("remember to water the plants");
    let completion = MockCompletion::ok("unused");
    let (_dir, store, session) = session_with(
        SessionMode::TranscriptBuffer,
        Arc::clone(&transcription),
        Arc::clone(&completion),
    );

    session
        .process_recording(Path::new("/tmp/take-abc.wav"))
        .await;

    assert_eq!(session.last_error(), None);
    assert!(!session.is_processing());
    assert_eq!(session.transcript(), "remember to water the plants");

    let notes = store.list();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "remember to water the plants");
    assert!(notes[0].title.starts_with("Note "), "title: {}", notes[0].title);
    assert_eq!(
        notes[0].audio_path.as_deref(),
        Some(Path::new("/tmp/take-abc.wav"))
    );

    assert_eq!(transcription.calls(), 1);
    assert_eq!(completion.calls(), 0, "buffer mode never calls completion");
}

#[tokio::test]
async fn test_missing_key_fails_before_any_network_call() {
    let transcription = MockTranscription::unconfigured();
    let completion = MockCompletion::ok("unused");
    let (_dir, store, session) = session_with(
        SessionMode::TranscriptBuffer,
        Arc::clone(&transcription),
        completion,
    );

    session.process_recording(Path::new("/tmp/take.wav")).await;

    assert_eq!(
        session.last_error().as_deref(),
        Some("Please set your OpenAI API Key in Settings.")
    );
    assert_eq!(transcription.calls(), 0, "no provider call may happen");
    assert!(store.is_empty());
    assert!(!session.is_processing());
}

#[tokio::test]
async fn test_failed_transcription_leaves_no_partial_state() {
    let transcription = MockTranscription::failing("api down");
    let completion = MockCompletion::ok("unused");
    let (_dir, store, session) = session_with(
        SessionMode::TranscriptBuffer,
        Arc::clone(&transcription),
        completion,
    );

    session.process_recording(Path::new("/tmp/take.wav")).await;

    let err = session.last_error().expect("error recorded");
    assert!(err.starts_with("Error:"), "got: {err}");
    assert!(store.is_empty(), "failed pipeline must not add a note");
    assert_eq!(session.transcript(), "", "transcript must stay empty");
    assert!(!session.is_processing(), "busy flag cleared after failure");
    assert_eq!(transcription.calls(), 1);
}

// ============ Rewrite Actions ============

#[tokio::test]
async fn test_action_returns_reply_and_never_touches_store() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::ok("Polished result.");
    let (_dir, store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        Arc::clone(&completion),
    );

    session.set_transcript("rough draft text");
    let result = session.perform_action(RewriteAction::Improve).await;

    assert_eq!(result, "Polished result.");
    assert_eq!(session.last_error(), None);
    assert!(store.is_empty(), "merging is the caller's decision");
    assert!(!session.is_processing());

    // exactly the documented two-message request
    let request = completion.last_request();
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::System);
    assert_eq!(request[0].content, SYSTEM_PROMPT);
    assert_eq!(request[1].role, MessageRole::User);
    assert!(request[1].content.contains("rough draft text"));
    assert!(
        request[1]
            .content
            .starts_with("Rewrite the following text to be more professional"),
        "got: {}",
        request[1].content
    );
}

#[tokio::test]
async fn test_action_with_empty_transcript_fails_fast() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::ok("unused");
    let (_dir, _store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        Arc::clone(&completion),
    );

    let result = session.perform_action(RewriteAction::Summarize).await;

    assert_eq!(result, "");
    assert!(session.last_error().is_some());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_action_with_missing_key_fails_fast() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::unconfigured();
    let (_dir, _store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        Arc::clone(&completion),
    );

    session.set_transcript("some text");
    let result = session.perform_action(RewriteAction::CreateTask).await;

    assert_eq!(result, "");
    assert_eq!(
        session.last_error().as_deref(),
        Some("Please set your OpenAI API Key in Settings.")
    );
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_action_failure_returns_empty_and_records_error() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::failing("quota exceeded");
    let (_dir, _store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        Arc::clone(&completion),
    );

    session.set_transcript("some text");
    let result = session.perform_action(RewriteAction::GeneratePrompt).await;

    assert_eq!(result, "");
    let err = session.last_error().expect("error recorded");
    assert!(err.starts_with("Error:"), "got: {err}");
    assert!(!session.is_processing());
    assert_eq!(completion.calls(), 1);
}

// ============ Conversation Mode ============

#[tokio::test]
async fn test_conversation_opens_with_greeting() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::ok("unused");
    let (_dir, _store, session) =
        session_with(SessionMode::Conversation, transcription, completion);

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_conversation_recording_appends_user_then_assistant() {
    let transcription = MockTranscription::ok("what should I cook tonight");
    let completion = MockCompletion::ok("How about a stir fry?");
    let (_dir, store, session) = session_with(
        SessionMode::Conversation,
        transcription,
        Arc::clone(&completion),
    );

    session.process_recording(Path::new("/tmp/take.wav")).await;

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, MessageRole::Assistant); // greeting
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[1].content, "what should I cook tonight");
    assert_eq!(messages[2].role, MessageRole::Assistant);
    assert_eq!(messages[2].content, "How about a stir fry?");

    // the provider saw the greeting plus the new user turn
    let request = completion.last_request();
    assert_eq!(request.len(), 2);
    assert_eq!(request[1].role, MessageRole::User);

    assert!(store.is_empty(), "conversation turns are not notes");
}

#[tokio::test]
async fn test_conversation_failed_completion_drops_the_turn() {
    let transcription = MockTranscription::ok("hello?");
    let completion = MockCompletion::failing("model overloaded");
    let (_dir, _store, session) =
        session_with(SessionMode::Conversation, transcription, completion);

    session.process_recording(Path::new("/tmp/take.wav")).await;

    let messages = session.messages();
    assert_eq!(messages.len(), 1, "failed turn leaves only the greeting");
    assert!(session.last_error().is_some());
    assert!(!session.is_processing());
}

#[tokio::test]
async fn test_send_message_appends_and_replies() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::ok("Nice to meet you!");
    let (_dir, _store, session) = session_with(
        SessionMode::Conversation,
        transcription,
        Arc::clone(&completion),
    );

    session.send_message("hi, I'm new here").await;

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "hi, I'm new here");
    assert_eq!(messages[2].content, "Nice to meet you!");

    // full history goes to the provider, oldest first
    let request = completion.last_request();
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::Assistant);
    assert_eq!(request[1].content, "hi, I'm new here");
}

#[tokio::test]
async fn test_send_message_without_key_keeps_user_turn_visible() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::unconfigured();
    let (_dir, _store, session) = session_with(
        SessionMode::Conversation,
        transcription,
        Arc::clone(&completion),
    );

    session.send_message("anyone there?").await;

    let messages = session.messages();
    assert_eq!(messages.len(), 2, "typed turn stays visible");
    assert_eq!(messages[1].content, "anyone there?");
    assert_eq!(
        session.last_error().as_deref(),
        Some("Please set your OpenAI API Key in Settings.")
    );
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_send_message_requires_conversation_mode() {
    let transcription = MockTranscription::ok("unused");
    let completion = MockCompletion::ok("unused");
    let (_dir, _store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        Arc::clone(&completion),
    );

    session.send_message("hello").await;

    assert!(session.messages().is_empty());
    assert!(session.last_error().is_some());
    assert_eq!(completion.calls(), 0);
}

// ============ Error State Handling ============

#[tokio::test]
async fn test_success_clears_previous_error() {
    let transcription = MockTranscription::ok("all good now");
    let completion = MockCompletion::ok("unused");
    let (_dir, _store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        completion,
    );

    session.set_transcript(""); // ensure empty
    let _ = session.perform_action(RewriteAction::Summarize).await;
    assert!(session.last_error().is_some(), "empty transcript errored");

    session.process_recording(Path::new("/tmp/take.wav")).await;
    assert_eq!(session.last_error(), None, "success clears the error");
}

#[tokio::test]
async fn test_clear_error() {
    let transcription = MockTranscription::unconfigured();
    let completion = MockCompletion::ok("unused");
    let (_dir, _store, session) = session_with(
        SessionMode::TranscriptBuffer,
        transcription,
        completion,
    );

    session.process_recording(Path::new("/tmp/take.wav")).await;
    assert!(session.last_error().is_some());

    session.clear_error();
    assert_eq!(session.last_error(), None);
}
