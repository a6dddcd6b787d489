//! Note collection persisted as a single JSON file
//!
//! The entire collection is rewritten on every mutation. An absent or
//! malformed file loads as an empty collection rather than an error, so a
//! fresh install and a corrupted file both start clean.

use crate::error::{Error, Result};
use crate::types::{Note, NoteId};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// JSON-file-backed note collection, most recent note first
///
/// Mutations persist the whole collection before committing the in-memory
/// state, so a failed write leaves both the file and the store unchanged.
/// Callers share the store behind an `Arc`; concurrent writers are not
/// coordinated beyond the internal lock.
pub struct NoteStore {
    path: PathBuf,
    notes: RwLock<Vec<Note>>,
}

impl NoteStore {
    /// Open the store backed by the given file
    ///
    /// Never fails: a missing file starts empty, a malformed one is logged
    /// and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let notes = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<Note>>(&raw) {
                Ok(notes) => notes,
                Err(e) => {
                    warn!(
                        "note file {} is malformed, starting empty: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("cannot read note file {}: {}", path.display(), e);
                Vec::new()
            }
        };
        debug!("loaded {} notes from {}", notes.len(), path.display());
        Self {
            path,
            notes: RwLock::new(notes),
        }
    }

    /// Default note file location under the platform data directory
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxnote")
            .join("notes.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All notes, most recent first
    pub fn list(&self) -> Vec<Note> {
        self.notes.read().clone()
    }

    pub fn get(&self, id: NoteId) -> Option<Note> {
        self.notes.read().iter().find(|n| n.id == id).cloned()
    }

    /// Case-insensitive search over title and content
    pub fn search(&self, query: &str) -> Vec<Note> {
        self.notes
            .read()
            .iter()
            .filter(|n| n.matches(query))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }

    /// Create a note and insert it at the front of the collection
    pub fn add(
        &self,
        title: String,
        content: String,
        audio_path: Option<PathBuf>,
    ) -> Result<Note> {
        let note = Note::new(title, content, audio_path);
        let mut notes = self.notes.write();
        let mut next = notes.clone();
        next.insert(0, note.clone());
        self.persist(&next)?;
        *notes = next;
        debug!("added note {} ({})", note.id, note.title);
        Ok(note)
    }

    /// Replace the stored note with the same id
    ///
    /// An unknown id is a no-op: nothing is written and `Ok` is returned.
    pub fn update(&self, note: &Note) -> Result<()> {
        let mut notes = self.notes.write();
        let Some(idx) = notes.iter().position(|n| n.id == note.id) else {
            debug!("update for unknown note {}, ignoring", note.id);
            return Ok(());
        };
        let mut next = notes.clone();
        next[idx] = note.clone();
        self.persist(&next)?;
        *notes = next;
        Ok(())
    }

    /// Remove the note with the given id
    ///
    /// Idempotent: deleting an absent note still rewrites the file and
    /// succeeds. The referenced audio file, if any, is left on disk.
    pub fn delete(&self, id: NoteId) -> Result<()> {
        let mut notes = self.notes.write();
        let mut next = notes.clone();
        next.retain(|n| n.id != id);
        self.persist(&next)?;
        *notes = next;
        Ok(())
    }

    fn persist(&self, notes: &[Note]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(notes)
            .map_err(|e| Error::Persistence(format!("encode notes: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| Error::Persistence(format!("write {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}
