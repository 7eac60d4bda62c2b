//! Clinician notes kept as one flat JSON array.
//!
//! Every operation loads the whole array, changes it and writes it back.
//! There is no locking around that cycle, so two writers racing on the same
//! store can lose an update.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, WizardError};
use crate::models::{NewNote, Note, NoteUpdate};

/// Wholesale access to the note array
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Note>>;
    async fn save_all(&self, notes: Vec<Note>) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<Vec<Note>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn load_all(&self) -> Result<Vec<Note>> {
        Ok(self.notes.read().await.clone())
    }

    async fn save_all(&self, notes: Vec<Note>) -> Result<()> {
        *self.notes.write().await = notes;
        Ok(())
    }
}

/// A single JSON file holding the note array.
///
/// A missing or unreadable file reads as an empty list.
pub struct JsonFileNoteStore {
    path: PathBuf,
}

impl JsonFileNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NoteStore for JsonFileNoteStore {
    async fn load_all(&self) -> Result<Vec<Note>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        // Invalid UTF-8 surfaces here as a parse error too
        match serde_json::from_slice::<Vec<Note>>(&raw) {
            Ok(notes) => Ok(notes),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed notes file, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save_all(&self, notes: Vec<Note>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(&notes)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSortField {
    #[default]
    CreatedAt,
    Title,
    Priority,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Client-side filter and sort applied after loading the array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteQuery {
    pub patient_id: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: NoteSortField,
    #[serde(default)]
    pub order: SortOrder,
}

impl NoteQuery {
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Default::default()
        }
    }

    fn matches(&self, note: &Note) -> bool {
        if let Some(patient_id) = &self.patient_id {
            if &note.patient_id != patient_id {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                note.title.to_lowercase().contains(&term)
                    || note.content.to_lowercase().contains(&term)
                    || note.tags.iter().any(|t| t.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

fn directed(ordering: Ordering, desc: bool) -> Ordering {
    if desc { ordering.reverse() } else { ordering }
}

/// Note operations on top of any [`NoteStore`]
#[derive(Clone)]
pub struct NotesBook {
    store: Arc<dyn NoteStore>,
}

impl NotesBook {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &NoteQuery) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .store
            .load_all()
            .await?
            .into_iter()
            .filter(|note| query.matches(note))
            .collect();

        // Ties keep their stored order in both directions
        let desc = query.order == SortOrder::Desc;
        match query.sort {
            NoteSortField::CreatedAt => notes.sort_by(|a, b| directed(a.created_at.cmp(&b.created_at), desc)),
            NoteSortField::Title => notes.sort_by(|a, b| {
                directed(a.title.to_lowercase().cmp(&b.title.to_lowercase()), desc)
            }),
            NoteSortField::Priority => notes.sort_by(|a, b| directed(a.priority.cmp(&b.priority), desc)),
        }
        Ok(notes)
    }

    pub async fn get(&self, id: &str) -> Result<Note> {
        self.store
            .load_all()
            .await?
            .into_iter()
            .find(|note| note.id == id)
            .ok_or_else(|| WizardError::NoteNotFound(id.to_string()))
    }

    pub async fn create(&self, new_note: NewNote) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4().to_string(),
            patient_id: new_note.patient_id,
            title: new_note.title,
            content: new_note.content,
            note_type: new_note.note_type,
            priority: new_note.priority,
            tags: new_note.tags,
            created_at: Utc::now(),
            created_by: new_note.created_by,
        };

        let mut notes = self.store.load_all().await?;
        notes.push(note.clone());
        self.store.save_all(notes).await?;

        info!(note_id = %note.id, patient_id = %note.patient_id, "Note created");
        Ok(note)
    }

    pub async fn update(&self, id: &str, update: NoteUpdate) -> Result<Note> {
        let mut notes = self.store.load_all().await?;
        let note = notes
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or_else(|| WizardError::NoteNotFound(id.to_string()))?;

        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(note_type) = update.note_type {
            note.note_type = note_type;
        }
        if let Some(priority) = update.priority {
            note.priority = priority;
        }
        if let Some(tags) = update.tags {
            note.tags = tags;
        }
        let updated = note.clone();

        self.store.save_all(notes).await?;
        Ok(updated)
    }

    /// Remove one note. Refused unless `confirmed`; there is no undo.
    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(WizardError::DeletionNotConfirmed(id.to_string()));
        }

        let mut notes = self.store.load_all().await?;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        if notes.len() == before {
            return Err(WizardError::NoteNotFound(id.to_string()));
        }
        self.store.save_all(notes).await?;

        info!(note_id = %id, "Note deleted");
        Ok(())
    }
}
