use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::ids::{IdAllocationError, IdAllocator};
use crate::application::repos::{CreateNoteParams, NotesRepo, RepoError, UpdateNoteParams};
use crate::application::retry::{Attempt, RetryError, RetryPolicy, retry};
use crate::application::validation::NotebookValidator;
use crate::domain::entities::{NOTE_CONTENT_MAX_CHARS, NOTE_TITLE_MAX_CHARS, NoteRecord};
use crate::domain::error::{DomainError, ensure_max_chars, ensure_present};

#[derive(Debug, Error)]
pub enum NoteServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Ids(#[from] IdAllocationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateNoteCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notebook_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNoteCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notebook_id: Option<String>,
}

#[derive(Debug, Error)]
#[error("notebook `{0}` has not been confirmed")]
struct Unconfirmed(String);

#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn NotesRepo>,
    ids: IdAllocator,
    validator: NotebookValidator,
    retry: RetryPolicy,
}

impl NoteService {
    pub fn new(
        repo: Arc<dyn NotesRepo>,
        ids: IdAllocator,
        validator: NotebookValidator,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            repo,
            ids,
            validator,
            retry,
        }
    }

    pub async fn list(&self) -> Result<Vec<NoteRecord>, NoteServiceError> {
        self.repo.list_notes().await.map_err(NoteServiceError::from)
    }

    pub async fn get(&self, id: &str) -> Result<NoteRecord, NoteServiceError> {
        self.repo
            .find_note(id)
            .await?
            .ok_or_else(|| DomainError::not_found("note").into())
    }

    /// Create a note. A referenced notebook must be confirmed first; an
    /// unconfirmed reference is reported as not found and consumes no id.
    pub async fn create(&self, command: CreateNoteCommand) -> Result<NoteRecord, NoteServiceError> {
        ensure_present(command.title.as_deref(), "title")?;
        ensure_present(command.content.as_deref(), "content")?;
        let title = command.title.unwrap_or_default();
        let content = command.content.unwrap_or_default();
        ensure_max_chars(&title, NOTE_TITLE_MAX_CHARS, "title")?;
        ensure_max_chars(&content, NOTE_CONTENT_MAX_CHARS, "content")?;

        if let Some(notebook_id) = command.notebook_id.as_deref() {
            self.confirm_notebook(notebook_id).await?;
        }

        let id = self.ids.next_id().await?;
        let record = self
            .repo
            .create_note(CreateNoteParams {
                id,
                title,
                content,
                notebook_id: command.notebook_id,
            })
            .await?;

        info!(
            target = "notekeep::notes",
            note_id = %record.id,
            notebook_id = record.notebook_id.as_deref().unwrap_or(""),
            "note created"
        );
        Ok(record)
    }

    /// Field changes only. The notebook reference is not checked again.
    pub async fn update(
        &self,
        id: &str,
        command: UpdateNoteCommand,
    ) -> Result<NoteRecord, NoteServiceError> {
        if let Some(title) = command.title.as_deref() {
            ensure_present(Some(title), "title")?;
            ensure_max_chars(title, NOTE_TITLE_MAX_CHARS, "title")?;
        }
        if let Some(content) = command.content.as_deref() {
            ensure_present(Some(content), "content")?;
            ensure_max_chars(content, NOTE_CONTENT_MAX_CHARS, "content")?;
        }

        let params = UpdateNoteParams {
            title: command.title,
            content: command.content,
            notebook_id: command.notebook_id,
        };
        self.repo
            .update_note(id, params)
            .await?
            .ok_or_else(|| DomainError::not_found("note").into())
    }

    pub async fn delete(&self, id: &str) -> Result<(), NoteServiceError> {
        if self.repo.delete_note(id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("note").into())
        }
    }

    /// Remove every note referencing `notebook_id`. Matching nothing is
    /// reported as not found.
    pub async fn delete_by_notebook(
        &self,
        notebook_id: Option<&str>,
    ) -> Result<u64, NoteServiceError> {
        ensure_present(notebook_id, "notebookId")?;
        let notebook_id = notebook_id.unwrap_or_default();

        let deleted = self.repo.delete_notes_by_notebook(notebook_id).await?;
        if deleted == 0 {
            return Err(DomainError::not_found("note").into());
        }
        info!(
            target = "notekeep::notes",
            notebook_id, deleted, "notes deleted for notebook"
        );
        Ok(deleted)
    }

    async fn confirm_notebook(&self, notebook_id: &str) -> Result<(), NoteServiceError> {
        let result = retry(self.retry, "validate_notebook", || async move {
            if self.validator.exists(notebook_id).await {
                Ok(())
            } else {
                Err(Attempt::Transient(Unconfirmed(notebook_id.to_string())))
            }
        })
        .await;

        // Every attempt is transient, so a failure is always exhaustion.
        result.map_err(|err: RetryError<Unconfirmed>| {
            warn!(
                target = "notekeep::notes",
                notebook_id,
                error = %err,
                "rejecting note for unconfirmed notebook"
            );
            DomainError::not_found("notebook").into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use notekeep_api_types::IdEntry;

    use super::*;
    use crate::application::ids::NOTE_COUNTER;
    use crate::application::peers::{NotebooksPeer, PeerError};
    use crate::cache::{CacheTierStore, MemoryTierStore, Tier};
    use crate::domain::ids::{DEFAULT_MULTIPLIER, DEFAULT_NOTE_SALT, IdCodec, NOTE_PREFIX};
    use crate::infra::memory::MemoryRepositories;

    struct Owner {
        ids: Vec<&'static str>,
        listings: AtomicUsize,
    }

    #[async_trait]
    impl NotebooksPeer for Owner {
        fn origin(&self) -> &str {
            "http://notebooks.test"
        }

        async fn is_live(&self) -> bool {
            true
        }

        async fn list_ids(&self) -> Result<Vec<IdEntry>, PeerError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids.iter().map(|id| IdEntry::new(*id)).collect())
        }

        async fn notebook_exists(&self, id: &str) -> Result<bool, PeerError> {
            Ok(self.ids.contains(&id))
        }
    }

    struct Fixture {
        service: NoteService,
        repos: Arc<MemoryRepositories>,
        tiers: Arc<MemoryTierStore>,
        owner: Arc<Owner>,
    }

    fn fixture(notebooks: Vec<&'static str>) -> Fixture {
        let repos = Arc::new(MemoryRepositories::new());
        let tiers = Arc::new(MemoryTierStore::new());
        let owner = Arc::new(Owner {
            ids: notebooks,
            listings: AtomicUsize::new(0),
        });
        let codec = IdCodec::new(NOTE_PREFIX, 6, DEFAULT_NOTE_SALT, DEFAULT_MULTIPLIER).unwrap();
        let ids = IdAllocator::new(repos.clone(), NOTE_COUNTER, codec);
        // Zero fresh TTL keeps every lookup going back to the owner.
        let validator = NotebookValidator::new(tiers.clone(), owner.clone(), Duration::ZERO);
        let policy = RetryPolicy::new(NonZeroU32::new(2).unwrap(), Duration::from_millis(1000));
        Fixture {
            service: NoteService::new(repos.clone(), ids, validator, policy),
            repos,
            tiers,
            owner,
        }
    }

    fn command(notebook_id: Option<&str>) -> CreateNoteCommand {
        CreateNoteCommand {
            title: Some("Standup".to_string()),
            content: Some("notes from standup".to_string()),
            notebook_id: notebook_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn confirmed_notebook_reference_is_stored() {
        let fixture = fixture(vec!["b1"]);

        let note = fixture.service.create(command(Some("b1"))).await.unwrap();

        assert_eq!(note.id, "nyUmPne");
        assert_eq!(note.notebook_id.as_deref(), Some("b1"));
    }

    #[tokio::test]
    async fn note_without_notebook_skips_validation() {
        let fixture = fixture(vec![]);

        fixture.service.create(command(None)).await.unwrap();

        assert_eq!(fixture.owner.listings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_notebook_is_not_found_after_retries() {
        let fixture = fixture(vec!["b1"]);
        let started = tokio::time::Instant::now();

        let err = fixture
            .service
            .create(command(Some("b404")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NoteServiceError::Domain(DomainError::NotFound { entity: "notebook" })
        ));
        assert_eq!(fixture.owner.listings.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
        assert!(fixture.repos.list_notes().await.unwrap().is_empty());

        // The rejected attempt did not consume a counter value.
        let note = fixture.service.create(command(None)).await.unwrap();
        assert_eq!(note.id, "nyUmPne");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_fresh_expiry_confirms_new_notebook() {
        let repos = Arc::new(MemoryRepositories::new());
        let tiers = Arc::new(MemoryTierStore::new());
        let owner = Arc::new(Owner {
            ids: vec!["b-old", "b-new"],
            listings: AtomicUsize::new(0),
        });
        let fresh_ttl = Duration::from_secs(1);
        tiers
            .refresh(&[IdEntry::new("b-old")], fresh_ttl)
            .await
            .unwrap();
        let codec = IdCodec::new(NOTE_PREFIX, 6, DEFAULT_NOTE_SALT, DEFAULT_MULTIPLIER).unwrap();
        let service = NoteService::new(
            repos.clone(),
            IdAllocator::new(repos, NOTE_COUNTER, codec),
            NotebookValidator::new(tiers, owner.clone(), fresh_ttl),
            RetryPolicy::new(NonZeroU32::new(2).unwrap(), Duration::from_millis(1000)),
        );
        let started = tokio::time::Instant::now();

        let note = service.create(command(Some("b-new"))).await.unwrap();

        assert_eq!(note.notebook_id.as_deref(), Some("b-new"));
        assert_eq!(owner.listings.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn fresh_tier_confirms_without_owner() {
        let fixture = fixture(vec![]);
        fixture
            .tiers
            .put_raw(Tier::Fresh, r#"[{"id":"b7"}]"#, None);

        fixture.service.create(command(Some("b7"))).await.unwrap();

        assert_eq!(fixture.owner.listings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let fixture = fixture(vec![]);

        let mut long_title = command(None);
        long_title.title = Some("t".repeat(NOTE_TITLE_MAX_CHARS + 1));
        let mut no_content = command(None);
        no_content.content = None;

        for bad in [long_title, no_content] {
            let err = fixture.service.create(bad).await.unwrap_err();
            assert!(matches!(
                err,
                NoteServiceError::Domain(DomainError::Validation { .. })
            ));
        }
    }

    #[tokio::test]
    async fn update_keeps_reference_unchecked() {
        let fixture = fixture(vec!["b1"]);
        let note = fixture.service.create(command(Some("b1"))).await.unwrap();
        let listings = fixture.owner.listings.load(Ordering::SeqCst);

        let updated = fixture
            .service
            .update(
                &note.id,
                UpdateNoteCommand {
                    title: Some("Retro".to_string()),
                    notebook_id: Some("b-unknown".to_string()),
                    ..UpdateNoteCommand::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Retro");
        assert_eq!(updated.notebook_id.as_deref(), Some("b-unknown"));
        assert_eq!(fixture.owner.listings.load(Ordering::SeqCst), listings);
    }

    #[tokio::test]
    async fn delete_by_notebook_reports_matches() {
        let fixture = fixture(vec!["b1"]);
        fixture.service.create(command(Some("b1"))).await.unwrap();
        fixture.service.create(command(Some("b1"))).await.unwrap();

        assert_eq!(
            fixture.service.delete_by_notebook(Some("b1")).await.unwrap(),
            2
        );
        assert!(matches!(
            fixture.service.delete_by_notebook(Some("b1")).await,
            Err(NoteServiceError::Domain(DomainError::NotFound { .. }))
        ));
        assert!(matches!(
            fixture.service.delete_by_notebook(None).await,
            Err(NoteServiceError::Domain(DomainError::Validation { .. }))
        ));
    }
}
