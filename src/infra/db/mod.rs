//! Postgres-backed repository implementations.

mod notebooks;
mod notes;
mod sequences;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::config::ServiceRole;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    /// Apply the migrations owned by `role`. Both services may share one
    /// database, so versions applied by the other service are tolerated.
    pub async fn run_migrations(pool: &PgPool, role: ServiceRole) -> Result<(), sqlx::Error> {
        let mut migrator = match role {
            ServiceRole::Notebooks => sqlx::migrate!("./migrations/notebooks"),
            ServiceRole::Notes => sqlx::migrate!("./migrations/notes"),
        };
        migrator.set_ignore_missing(true);
        migrator.run(pool).await.map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}
