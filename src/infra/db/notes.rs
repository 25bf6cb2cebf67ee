use async_trait::async_trait;

use crate::{
    application::repos::{CreateNoteParams, NotesRepo, RepoError, UpdateNoteParams},
    domain::entities::NoteRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: String,
    title: String,
    content: String,
    notebook_id: Option<String>,
}

impl From<NoteRow> for NoteRecord {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            notebook_id: row.notebook_id,
        }
    }
}

#[async_trait]
impl NotesRepo for PostgresRepositories {
    async fn list_notes(&self) -> Result<Vec<NoteRecord>, RepoError> {
        let rows = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, title, content, notebook_id
            FROM notes
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(NoteRecord::from).collect())
    }

    async fn find_note(&self, id: &str) -> Result<Option<NoteRecord>, RepoError> {
        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, title, content, notebook_id
            FROM notes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NoteRecord::from))
    }

    async fn create_note(&self, params: CreateNoteParams) -> Result<NoteRecord, RepoError> {
        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            INSERT INTO notes (id, title, content, notebook_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, content, notebook_id
            "#,
        )
        .bind(params.id)
        .bind(params.title)
        .bind(params.content)
        .bind(params.notebook_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_note(
        &self,
        id: &str,
        params: UpdateNoteParams,
    ) -> Result<Option<NoteRecord>, RepoError> {
        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            UPDATE notes
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                notebook_id = COALESCE($4, notebook_id),
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, content, notebook_id
            "#,
        )
        .bind(id)
        .bind(params.title)
        .bind(params.content)
        .bind(params.notebook_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NoteRecord::from))
    }

    async fn delete_note(&self, id: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_notes_by_notebook(&self, notebook_id: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM notes WHERE notebook_id = $1")
            .bind(notebook_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
