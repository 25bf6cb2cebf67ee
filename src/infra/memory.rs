//! In-memory repository implementations.
//!
//! Used when no database URL is configured and by tests. Records keep their
//! insertion order; counters live for the lifetime of the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::repos::{
    CreateNoteParams, CreateNotebookParams, NotebooksRepo, NotesRepo, RepoError, SequenceRepo,
    UpdateNoteParams, UpdateNotebookParams,
};
use crate::domain::entities::{NoteRecord, NotebookRecord};

#[derive(Default)]
pub struct MemoryRepositories {
    sequences: Mutex<HashMap<String, i64>>,
    notebooks: Mutex<Vec<NotebookRecord>>,
    notes: Mutex<Vec<NoteRecord>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceRepo for MemoryRepositories {
    async fn next_value(&self, name: &str) -> Result<i64, RepoError> {
        let mut sequences = self.sequences.lock().await;
        let value = sequences.entry(name.to_string()).or_insert(0);
        let current = *value;
        *value += 1;
        Ok(current)
    }
}

#[async_trait]
impl NotebooksRepo for MemoryRepositories {
    async fn list_notebooks(&self) -> Result<Vec<NotebookRecord>, RepoError> {
        Ok(self.notebooks.lock().await.clone())
    }

    async fn find_notebook(&self, id: &str) -> Result<Option<NotebookRecord>, RepoError> {
        let notebooks = self.notebooks.lock().await;
        Ok(notebooks.iter().find(|notebook| notebook.id == id).cloned())
    }

    async fn create_notebook(
        &self,
        params: CreateNotebookParams,
    ) -> Result<NotebookRecord, RepoError> {
        let mut notebooks = self.notebooks.lock().await;
        if notebooks.iter().any(|notebook| notebook.id == params.id) {
            return Err(RepoError::Duplicate {
                constraint: "notebooks_pkey".to_string(),
            });
        }
        let record = NotebookRecord {
            id: params.id,
            name: params.name,
            description: params.description,
        };
        notebooks.push(record.clone());
        Ok(record)
    }

    async fn update_notebook(
        &self,
        id: &str,
        params: UpdateNotebookParams,
    ) -> Result<Option<NotebookRecord>, RepoError> {
        let mut notebooks = self.notebooks.lock().await;
        let Some(notebook) = notebooks.iter_mut().find(|notebook| notebook.id == id) else {
            return Ok(None);
        };
        if let Some(name) = params.name {
            notebook.name = name;
        }
        if let Some(description) = params.description {
            notebook.description = Some(description);
        }
        Ok(Some(notebook.clone()))
    }

    async fn delete_notebook(&self, id: &str) -> Result<bool, RepoError> {
        let mut notebooks = self.notebooks.lock().await;
        let before = notebooks.len();
        notebooks.retain(|notebook| notebook.id != id);
        Ok(notebooks.len() != before)
    }
}

#[async_trait]
impl NotesRepo for MemoryRepositories {
    async fn list_notes(&self) -> Result<Vec<NoteRecord>, RepoError> {
        Ok(self.notes.lock().await.clone())
    }

    async fn find_note(&self, id: &str) -> Result<Option<NoteRecord>, RepoError> {
        let notes = self.notes.lock().await;
        Ok(notes.iter().find(|note| note.id == id).cloned())
    }

    async fn create_note(&self, params: CreateNoteParams) -> Result<NoteRecord, RepoError> {
        let mut notes = self.notes.lock().await;
        if notes.iter().any(|note| note.id == params.id) {
            return Err(RepoError::Duplicate {
                constraint: "notes_pkey".to_string(),
            });
        }
        let record = NoteRecord {
            id: params.id,
            title: params.title,
            content: params.content,
            notebook_id: params.notebook_id,
        };
        notes.push(record.clone());
        Ok(record)
    }

    async fn update_note(
        &self,
        id: &str,
        params: UpdateNoteParams,
    ) -> Result<Option<NoteRecord>, RepoError> {
        let mut notes = self.notes.lock().await;
        let Some(note) = notes.iter_mut().find(|note| note.id == id) else {
            return Ok(None);
        };
        if let Some(title) = params.title {
            note.title = title;
        }
        if let Some(content) = params.content {
            note.content = content;
        }
        if let Some(notebook_id) = params.notebook_id {
            note.notebook_id = Some(notebook_id);
        }
        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, id: &str) -> Result<bool, RepoError> {
        let mut notes = self.notes.lock().await;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        Ok(notes.len() != before)
    }

    async fn delete_notes_by_notebook(&self, notebook_id: &str) -> Result<u64, RepoError> {
        let mut notes = self.notes.lock().await;
        let before = notes.len();
        notes.retain(|note| note.notebook_id.as_deref() != Some(notebook_id));
        Ok((before - notes.len()) as u64)
    }
}
