mod error;
mod middleware;
mod notebooks;
mod notes;

pub use error::{ApiError, codes};
pub use middleware::RequestContext;
pub use notebooks::{NotebooksState, build_notebooks_router};
pub use notes::{NotesState, build_notes_router};

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::error::ErrorReport;
use crate::infra::db::PostgresRepositories;

/// `200` when the backing store answers. Services on in-memory repositories
/// are always healthy.
async fn health_response(db: Option<&Arc<PostgresRepositories>>) -> Response {
    let Some(db) = db else {
        return (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response();
    };

    match db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(err) => {
            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
