//! Contracts for calling the other service over its HTTP surface.

use async_trait::async_trait;
use notekeep_api_types::IdEntry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("peer answered with status {status}")]
    Status { status: u16 },
    #[error("peer response could not be decoded: {0}")]
    Decode(String),
}

impl PeerError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }
}

/// Outcome of a confirmed bulk delete on the note service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    Deleted,
    NoneMatched,
}

/// The notebook service as seen from the note service.
#[async_trait]
pub trait NotebooksPeer: Send + Sync {
    fn origin(&self) -> &str;

    /// `true` only when `GET /health` answers 200.
    async fn is_live(&self) -> bool;

    /// Every notebook id currently stored by the owner.
    async fn list_ids(&self) -> Result<Vec<IdEntry>, PeerError>;

    /// Direct existence query against `GET /api/notebooks/{id}`.
    async fn notebook_exists(&self, id: &str) -> Result<bool, PeerError>;
}

/// The note service as seen from the notebook service.
#[async_trait]
pub trait NotesPeer: Send + Sync {
    fn origin(&self) -> &str;

    async fn is_live(&self) -> bool;

    /// `DELETE /api/notes` for every note referencing `notebook_id`.
    async fn delete_by_notebook(&self, notebook_id: &str) -> Result<Cleanup, PeerError>;
}
