//! Notebook deletion with dependent note cleanup.
//!
//! The notebook row is removed only after the note service confirms its
//! notes are gone. There is no rollback: a failure after cleanup leaves the
//! notebook in place with no notes, which is an accepted state.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::peers::{Cleanup, NotesPeer, PeerError};
use crate::application::repos::{NotebooksRepo, RepoError};

pub const METRIC_CASCADE_TOTAL: &str = "notekeep_cascade_delete_total";

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("note service is unavailable")]
    DependentsUnavailable,
    #[error("notebook not found")]
    NotFound,
    #[error("note service rejected cleanup with status {status}")]
    CleanupRejected { status: u16 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CascadeError {
    fn outcome(&self) -> &'static str {
        match self {
            CascadeError::DependentsUnavailable => "dependents_unavailable",
            CascadeError::NotFound => "not_found",
            CascadeError::CleanupRejected { .. } => "cleanup_rejected",
            CascadeError::Repo(_) => "repository_error",
        }
    }
}

#[derive(Clone)]
pub struct NotebookDeletion {
    notebooks: Arc<dyn NotebooksRepo>,
    notes: Arc<dyn NotesPeer>,
}

impl NotebookDeletion {
    pub fn new(notebooks: Arc<dyn NotebooksRepo>, notes: Arc<dyn NotesPeer>) -> Self {
        Self { notebooks, notes }
    }

    pub async fn delete(&self, notebook_id: &str) -> Result<(), CascadeError> {
        let result = self.run(notebook_id).await;
        let outcome = match &result {
            Ok(()) => "deleted",
            Err(err) => err.outcome(),
        };
        counter!(METRIC_CASCADE_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, notebook_id: &str) -> Result<(), CascadeError> {
        if !self.notes.is_live().await {
            warn!(
                target = "notekeep::cascade",
                notebook_id,
                origin = self.notes.origin(),
                "note service is down, refusing to delete notebook"
            );
            return Err(CascadeError::DependentsUnavailable);
        }

        if self.notebooks.find_notebook(notebook_id).await?.is_none() {
            return Err(CascadeError::NotFound);
        }

        match self.notes.delete_by_notebook(notebook_id).await {
            Ok(Cleanup::Deleted) => {
                info!(
                    target = "notekeep::cascade",
                    notebook_id, "dependent notes deleted"
                );
            }
            Ok(Cleanup::NoneMatched) => {
                info!(
                    target = "notekeep::cascade",
                    notebook_id, "notebook had no dependent notes"
                );
            }
            Err(PeerError::Status { status }) => {
                warn!(
                    target = "notekeep::cascade",
                    notebook_id, status, "note service rejected dependent cleanup"
                );
                return Err(CascadeError::CleanupRejected { status });
            }
            Err(err) => {
                warn!(
                    target = "notekeep::cascade",
                    notebook_id,
                    error = %err,
                    "dependent cleanup did not complete"
                );
                return Err(CascadeError::DependentsUnavailable);
            }
        }

        if !self.notebooks.delete_notebook(notebook_id).await? {
            return Err(CascadeError::NotFound);
        }

        info!(target = "notekeep::cascade", notebook_id, "notebook deleted");
        Ok(())
    }
}
