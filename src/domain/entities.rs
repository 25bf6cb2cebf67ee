//! Domain entities mirrored from persistent storage.

use notekeep_api_types::{Note, Notebook};
use serde::Serialize;

pub const NOTE_TITLE_MAX_CHARS: usize = 100;
pub const NOTE_CONTENT_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// A note and its weak reference to a notebook.
///
/// `notebook_id` is checked against the notebook service when the note is
/// created and never enforced afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub notebook_id: Option<String>,
}

impl From<NotebookRecord> for Notebook {
    fn from(record: NotebookRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
        }
    }
}

impl From<NoteRecord> for Note {
    fn from(record: NoteRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            notebook_id: record.notebook_id,
        }
    }
}
