use async_trait::async_trait;

use crate::{
    application::repos::{CreateNotebookParams, NotebooksRepo, RepoError, UpdateNotebookParams},
    domain::entities::NotebookRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct NotebookRow {
    id: String,
    name: String,
    description: Option<String>,
}

impl From<NotebookRow> for NotebookRecord {
    fn from(row: NotebookRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

#[async_trait]
impl NotebooksRepo for PostgresRepositories {
    async fn list_notebooks(&self) -> Result<Vec<NotebookRecord>, RepoError> {
        let rows = sqlx::query_as::<_, NotebookRow>(
            r#"
            SELECT id, name, description
            FROM notebooks
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(NotebookRecord::from).collect())
    }

    async fn find_notebook(&self, id: &str) -> Result<Option<NotebookRecord>, RepoError> {
        let row = sqlx::query_as::<_, NotebookRow>(
            r#"
            SELECT id, name, description
            FROM notebooks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NotebookRecord::from))
    }

    async fn create_notebook(
        &self,
        params: CreateNotebookParams,
    ) -> Result<NotebookRecord, RepoError> {
        let row = sqlx::query_as::<_, NotebookRow>(
            r#"
            INSERT INTO notebooks (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, description
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.description)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_notebook(
        &self,
        id: &str,
        params: UpdateNotebookParams,
    ) -> Result<Option<NotebookRecord>, RepoError> {
        let row = sqlx::query_as::<_, NotebookRow>(
            r#"
            UPDATE notebooks
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(params.name)
        .bind(params.description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NotebookRecord::from))
    }

    async fn delete_notebook(&self, id: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM notebooks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
