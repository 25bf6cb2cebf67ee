//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{NoteRecord, NotebookRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateNotebookParams {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateNotebookParams {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateNoteParams {
    pub id: String,
    pub title: String,
    pub content: String,
    pub notebook_id: Option<String>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notebook_id: Option<String>,
}

/// Atomic per-entity counters backing id assignment.
#[async_trait]
pub trait SequenceRepo: Send + Sync {
    /// Increment `name` and return the value it held before, creating it at 0.
    async fn next_value(&self, name: &str) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait NotebooksRepo: Send + Sync {
    async fn list_notebooks(&self) -> Result<Vec<NotebookRecord>, RepoError>;

    async fn find_notebook(&self, id: &str) -> Result<Option<NotebookRecord>, RepoError>;

    async fn create_notebook(
        &self,
        params: CreateNotebookParams,
    ) -> Result<NotebookRecord, RepoError>;

    async fn update_notebook(
        &self,
        id: &str,
        params: UpdateNotebookParams,
    ) -> Result<Option<NotebookRecord>, RepoError>;

    /// Returns `false` when no notebook had this id.
    async fn delete_notebook(&self, id: &str) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait NotesRepo: Send + Sync {
    async fn list_notes(&self) -> Result<Vec<NoteRecord>, RepoError>;

    async fn find_note(&self, id: &str) -> Result<Option<NoteRecord>, RepoError>;

    async fn create_note(&self, params: CreateNoteParams) -> Result<NoteRecord, RepoError>;

    async fn update_note(
        &self,
        id: &str,
        params: UpdateNoteParams,
    ) -> Result<Option<NoteRecord>, RepoError>;

    async fn delete_note(&self, id: &str) -> Result<bool, RepoError>;

    /// Delete every note referencing `notebook_id`, returning how many matched.
    async fn delete_notes_by_notebook(&self, notebook_id: &str) -> Result<u64, RepoError>;
}
