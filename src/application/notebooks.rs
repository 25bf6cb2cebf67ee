use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::cascade::{CascadeError, NotebookDeletion};
use crate::application::ids::{IdAllocationError, IdAllocator};
use crate::application::repos::{
    CreateNotebookParams, NotebooksRepo, RepoError, UpdateNotebookParams,
};
use crate::domain::entities::NotebookRecord;
use crate::domain::error::{DomainError, ensure_present};

#[derive(Debug, Error)]
pub enum NotebookServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Ids(#[from] IdAllocationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

#[derive(Debug, Clone)]
pub struct CreateNotebookCommand {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNotebookCommand {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct NotebookService {
    repo: Arc<dyn NotebooksRepo>,
    ids: IdAllocator,
    deletion: NotebookDeletion,
}

impl NotebookService {
    pub fn new(repo: Arc<dyn NotebooksRepo>, ids: IdAllocator, deletion: NotebookDeletion) -> Self {
        Self {
            repo,
            ids,
            deletion,
        }
    }

    pub async fn list(&self) -> Result<Vec<NotebookRecord>, NotebookServiceError> {
        self.repo
            .list_notebooks()
            .await
            .map_err(NotebookServiceError::from)
    }

    pub async fn get(&self, id: &str) -> Result<NotebookRecord, NotebookServiceError> {
        self.repo
            .find_notebook(id)
            .await?
            .ok_or_else(|| DomainError::not_found("notebook").into())
    }

    pub async fn create(
        &self,
        command: CreateNotebookCommand,
    ) -> Result<NotebookRecord, NotebookServiceError> {
        ensure_present(command.name.as_deref(), "name")?;
        let name = command.name.unwrap_or_default().trim().to_string();

        let id = self.ids.next_id().await?;
        let record = self
            .repo
            .create_notebook(CreateNotebookParams {
                id,
                name,
                description: command.description,
            })
            .await?;

        info!(
            target = "notekeep::notebooks",
            notebook_id = %record.id,
            "notebook created"
        );
        Ok(record)
    }

    pub async fn update(
        &self,
        id: &str,
        command: UpdateNotebookCommand,
    ) -> Result<NotebookRecord, NotebookServiceError> {
        if command.name.is_some() {
            ensure_present(command.name.as_deref(), "name")?;
        }

        let params = UpdateNotebookParams {
            name: command.name.map(|name| name.trim().to_string()),
            description: command.description,
        };
        self.repo
            .update_notebook(id, params)
            .await?
            .ok_or_else(|| DomainError::not_found("notebook").into())
    }

    /// Delete the notebook after its notes have been removed.
    pub async fn delete(&self, id: &str) -> Result<(), NotebookServiceError> {
        self.deletion.delete(id).await?;
        Ok(())
    }
}
