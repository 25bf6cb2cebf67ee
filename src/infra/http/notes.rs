use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, middleware as axum_middleware, routing::get};
use notekeep_api_types::{DeleteNotesByNotebookRequest, Note, NoteCreateRequest, NoteUpdateRequest};

use crate::application::notes::{CreateNoteCommand, NoteService, UpdateNoteCommand};
use crate::infra::db::PostgresRepositories;

use super::error::{ApiError, note_to_api};
use super::health_response;
use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct NotesState {
    pub notes: Arc<NoteService>,
    pub db: Option<Arc<PostgresRepositories>>,
}

pub fn build_notes_router(state: NotesState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/notes",
            get(list_notes)
                .post(create_note)
                .delete(delete_notes_by_notebook),
        )
        .route(
            "/api/notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health(State(state): State<NotesState>) -> Response {
    health_response(state.db.as_ref()).await
}

async fn list_notes(State(state): State<NotesState>) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.notes.list().await.map_err(note_to_api)?;
    Ok(Json(notes.into_iter().map(Note::from).collect()))
}

async fn create_note(
    State(state): State<NotesState>,
    payload: Result<Json<NoteCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let note = state
        .notes
        .create(CreateNoteCommand {
            title: payload.title,
            content: payload.content,
            notebook_id: payload.notebook_id,
        })
        .await
        .map_err(note_to_api)?;

    Ok((StatusCode::CREATED, Json(Note::from(note))))
}

async fn get_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let note = state.notes.get(&id).await.map_err(note_to_api)?;
    Ok(Json(note.into()))
}

async fn update_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
    payload: Result<Json<NoteUpdateRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(payload) = payload?;
    let note = state
        .notes
        .update(
            &id,
            UpdateNoteCommand {
                title: payload.title,
                content: payload.content,
                notebook_id: payload.notebook_id,
            },
        )
        .await
        .map_err(note_to_api)?;

    Ok(Json(note.into()))
}

async fn delete_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.notes.delete(&id).await.map_err(note_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_notes_by_notebook(
    State(state): State<NotesState>,
    payload: Result<Json<DeleteNotesByNotebookRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;
    state
        .notes
        .delete_by_notebook(payload.notebook_id.as_deref())
        .await
        .map_err(note_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
