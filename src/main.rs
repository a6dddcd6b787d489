//! voxnote CLI: record voice notes, transcribe them, and rewrite them with AI.
//!
//! Usage:
//!   voxnote record                          capture until Enter, transcribe, save
//!   voxnote list                            list notes, most recent first
//!   voxnote show <n>                        print note n from `list`
//!   voxnote search <query>                  case-insensitive title/content search
//!   voxnote delete <n>                      delete note n
//!   voxnote action <kind> <n> [--replace]   rewrite note n (append by default)
//!   voxnote chat <text>                     one conversation turn with the assistant
//!   voxnote set-key <service> <value>       store an API key (openai|calendar|issue)

use anyhow::{Context, bail};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use voxnote::providers::{OpenAICompletionProvider, OpenAITranscriptionProvider};
use voxnote::settings::{
    SETTING_CALENDAR_API_KEY, SETTING_ISSUE_API_KEY, SETTING_OPENAI_API_KEY,
};
use voxnote::{
    MessageRole, Note, NoteStore, RewriteAction, SessionMode, Settings, VoiceSession,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    let (notes_path, settings_path) = data_paths();
    let store = Arc::new(NoteStore::open(notes_path));
    let settings = Settings::open(&settings_path)?;

    match command.as_str() {
        "record" => cmd_record(store, &settings).await,
        "list" => cmd_list(&store),
        "show" => cmd_show(&store, args.next()),
        "search" => cmd_search(&store, args.next()),
        "delete" => cmd_delete(&store, args.next()),
        "action" => cmd_action(store, &settings, args.collect()).await,
        "chat" => cmd_chat(store, &settings, args.collect()).await,
        "set-key" => cmd_set_key(&settings, args.next(), args.next()),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    eprintln!("voxnote — voice notes with AI rewrites");
    eprintln!("  record                          Capture until Enter, transcribe, save");
    eprintln!("  list                            List notes, most recent first");
    eprintln!("  show <n>                        Print note n from `list`");
    eprintln!("  search <query>                  Search titles and content");
    eprintln!("  delete <n>                      Delete note n");
    eprintln!("  action <kind> <n> [--replace]   Rewrite note n; kinds:");
    eprintln!("                                  summarize | improve | generate-prompt | create-task");
    eprintln!("  chat <text>                     One conversation turn with the assistant");
    eprintln!("  set-key <service> <value>       Store an API key (openai|calendar|issue)");
    eprintln!();
    eprintln!("Data lives under the platform data dir, or $VOXNOTE_DATA_DIR when set.");
}

fn data_paths() -> (PathBuf, PathBuf) {
    match std::env::var("VOXNOTE_DATA_DIR") {
        Ok(dir) => {
            let base = PathBuf::from(dir);
            (base.join("notes.json"), base.join("settings.db"))
        }
        Err(_) => (NoteStore::default_path(), Settings::default_path()),
    }
}

fn build_session(
    store: Arc<NoteStore>,
    settings: &Settings,
    mode: SessionMode,
) -> anyhow::Result<VoiceSession> {
    let key = settings.get_key(SETTING_OPENAI_API_KEY)?;
    let transcription = Arc::new(OpenAITranscriptionProvider::new(key.clone()));
    let completion = Arc::new(OpenAICompletionProvider::new(key));
    Ok(VoiceSession::new(store, transcription, completion).with_mode(mode))
}

/// Map a 1-based `list` position to the note at that position
fn resolve_note(store: &NoteStore, arg: Option<String>) -> anyhow::Result<Note> {
    let arg = arg.context("expected a note number (see `voxnote list`)")?;
    let index: usize = arg.parse().context("note number must be an integer")?;
    let notes = store.list();
    index
        .checked_sub(1)
        .and_then(|i| notes.get(i))
        .cloned()
        .with_context(|| format!("no note #{index}; have {}", notes.len()))
}

fn parse_action(name: &str) -> Option<RewriteAction> {
    match name {
        "summarize" => Some(RewriteAction::Summarize),
        "improve" => Some(RewriteAction::Improve),
        "generate-prompt" => Some(RewriteAction::GeneratePrompt),
        "create-task" => Some(RewriteAction::CreateTask),
        _ => None,
    }
}

async fn cmd_record(store: Arc<NoteStore>, settings: &Settings) -> anyhow::Result<()> {
    let session = build_session(store, settings, SessionMode::TranscriptBuffer)?;

    if !session.start_recording() {
        bail!(
            session
                .last_error()
                .unwrap_or_else(|| "Could not start recording".to_string())
        );
    }
    println!("Recording... press Enter to stop.");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    let Some(path) = session.stop_recording() else {
        bail!(
            session
                .last_error()
                .unwrap_or_else(|| "Could not stop recording".to_string())
        );
    };

    println!("Transcribing...");
    session.process_recording(&path).await;
    if let Some(err) = session.last_error() {
        bail!(err);
    }

    println!("{}", session.transcript());
    Ok(())
}

fn cmd_list(store: &NoteStore) -> anyhow::Result<()> {
    let notes = store.list();
    if notes.is_empty() {
        println!("No notes yet.");
        return Ok(());
    }
    for (i, note) in notes.iter().enumerate() {
        println!(
            "{:>3}. {}  ({})",
            i + 1,
            note.title,
            note.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn cmd_show(store: &NoteStore, arg: Option<String>) -> anyhow::Result<()> {
    let note = resolve_note(store, arg)?;
    println!("{}", note.title);
    println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M"));
    if !note.tags.is_empty() {
        println!("Tags: {}", note.tags.join(", "));
    }
    if let Some(audio) = &note.audio_path {
        println!("Audio: {}", audio.display());
    }
    println!();
    println!("{}", note.content);
    Ok(())
}

fn cmd_search(store: &NoteStore, arg: Option<String>) -> anyhow::Result<()> {
    let query = arg.context("expected a search query")?;
    let matches = store.search(&query);
    if matches.is_empty() {
        println!("No notes match '{query}'.");
        return Ok(());
    }
    for note in &matches {
        println!(
            "{}  ({})",
            note.title,
            note.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn cmd_delete(store: &NoteStore, arg: Option<String>) -> anyhow::Result<()> {
    let note = resolve_note(store, arg)?;
    store.delete(note.id)?;
    println!("Deleted '{}'.", note.title);
    Ok(())
}

async fn cmd_action(
    store: Arc<NoteStore>,
    settings: &Settings,
    rest: Vec<String>,
) -> anyhow::Result<()> {
    let mut kind: Option<RewriteAction> = None;
    let mut number: Option<String> = None;
    let mut replace = false;
    for arg in rest {
        if arg == "--replace" {
            replace = true;
        } else if kind.is_none() {
            kind = parse_action(&arg);
            if kind.is_none() {
                bail!("unknown action '{arg}' (summarize | improve | generate-prompt | create-task)");
            }
        } else if number.is_none() {
            number = Some(arg);
        }
    }
    let action = kind.context("expected an action kind")?;
    let mut note = resolve_note(&store, number)?;

    let session = build_session(Arc::clone(&store), settings, SessionMode::TranscriptBuffer)?;
    session.set_transcript(&note.content);

    let result = session.perform_action(action).await;
    if result.is_empty() {
        bail!(
            session
                .last_error()
                .unwrap_or_else(|| "The model returned an empty result".to_string())
        );
    }

    if replace {
        note.content = result.clone();
    } else {
        note.append_section(&result);
    }
    store.update(&note)?;

    println!("{result}");
    Ok(())
}

async fn cmd_chat(
    store: Arc<NoteStore>,
    settings: &Settings,
    rest: Vec<String>,
) -> anyhow::Result<()> {
    let text = rest.join(" ");
    if text.is_empty() {
        bail!("expected a message");
    }

    let session = build_session(store, settings, SessionMode::Conversation)?;
    session.send_message(text).await;
    if let Some(err) = session.last_error() {
        bail!(err);
    }

    let messages = session.messages();
    if let Some(reply) = messages.iter().rev().find(|m| m.role == MessageRole::Assistant) {
        println!("{}", reply.content);
    }
    Ok(())
}

fn cmd_set_key(
    settings: &Settings,
    service: Option<String>,
    value: Option<String>,
) -> anyhow::Result<()> {
    let service = service.context("expected a service (openai|calendar|issue)")?;
    let value = value.context("expected a key value")?;
    let key = match service.as_str() {
        "openai" => SETTING_OPENAI_API_KEY,
        "calendar" => SETTING_CALENDAR_API_KEY,
        "issue" => SETTING_ISSUE_API_KEY,
        _ => bail!("unknown service '{service}' (openai|calendar|issue)"),
    };
    settings.set(key, &value)?;
    println!("Saved {service} key.");
    Ok(())
}
