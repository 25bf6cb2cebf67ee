use async_trait::async_trait;

use crate::application::repos::{RepoError, SequenceRepo};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl SequenceRepo for PostgresRepositories {
    async fn next_value(&self, name: &str) -> Result<i64, RepoError> {
        // One statement, so concurrent callers never observe the same value.
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO sequences (name, value)
            VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET value = sequences.value + 1
            RETURNING value - 1
            "#,
        )
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(value)
    }
}
