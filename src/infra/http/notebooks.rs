use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, middleware as axum_middleware, routing::get};
use notekeep_api_types::{Notebook, NotebookCreateRequest, NotebookUpdateRequest};

use crate::application::notebooks::{
    CreateNotebookCommand, NotebookService, UpdateNotebookCommand,
};
use crate::infra::db::PostgresRepositories;

use super::error::{ApiError, notebook_to_api};
use super::health_response;
use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct NotebooksState {
    pub notebooks: Arc<NotebookService>,
    pub db: Option<Arc<PostgresRepositories>>,
}

pub fn build_notebooks_router(state: NotebooksState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/notebooks",
            get(list_notebooks).post(create_notebook),
        )
        .route(
            "/api/notebooks/{id}",
            get(get_notebook)
                .put(update_notebook)
                .delete(delete_notebook),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health(State(state): State<NotebooksState>) -> Response {
    health_response(state.db.as_ref()).await
}

async fn list_notebooks(
    State(state): State<NotebooksState>,
) -> Result<Json<Vec<Notebook>>, ApiError> {
    let notebooks = state.notebooks.list().await.map_err(notebook_to_api)?;
    Ok(Json(notebooks.into_iter().map(Notebook::from).collect()))
}

async fn create_notebook(
    State(state): State<NotebooksState>,
    payload: Result<Json<NotebookCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let notebook = state
        .notebooks
        .create(CreateNotebookCommand {
            name: payload.name,
            description: payload.description,
        })
        .await
        .map_err(notebook_to_api)?;

    Ok((StatusCode::CREATED, Json(Notebook::from(notebook))))
}

async fn get_notebook(
    State(state): State<NotebooksState>,
    Path(id): Path<String>,
) -> Result<Json<Notebook>, ApiError> {
    let notebook = state.notebooks.get(&id).await.map_err(notebook_to_api)?;
    Ok(Json(notebook.into()))
}

async fn update_notebook(
    State(state): State<NotebooksState>,
    Path(id): Path<String>,
    payload: Result<Json<NotebookUpdateRequest>, JsonRejection>,
) -> Result<Json<Notebook>, ApiError> {
    let Json(payload) = payload?;
    let notebook = state
        .notebooks
        .update(
            &id,
            UpdateNotebookCommand {
                name: payload.name,
                description: payload.description,
            },
        )
        .await
        .map_err(notebook_to_api)?;

    Ok(Json(notebook.into()))
}

async fn delete_notebook(
    State(state): State<NotebooksState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.notebooks.delete(&id).await.map_err(notebook_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
