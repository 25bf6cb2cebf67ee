use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notekeep_api_types::{ApiErrorBody, ApiErrorMessage};

use crate::application::cascade::CascadeError;
use crate::application::error::ErrorReport;
use crate::application::ids::IdAllocationError;
use crate::application::notebooks::NotebookServiceError;
use crate::application::notes::NoteServiceError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const ID_ALLOCATION: &str = "id_allocation_error";
    pub const DEPENDENTS_UNAVAILABLE: &str = "dependents_unavailable";
    pub const CLEANUP_REJECTED: &str = "cleanup_rejected";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::error",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Malformed request body", Some(rejection.body_text()))
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { entity } => ApiError::not_found(match entity {
            "notebook" => "notebook not found",
            "note" => "note not found",
            _ => "resource not found",
        }),
        DomainError::Validation { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
    }
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn ids_to_api(err: IdAllocationError) -> ApiError {
    match err {
        IdAllocationError::Sequence(repo) => repo_to_api(repo),
        IdAllocationError::Codec(codec) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::ID_ALLOCATION,
            "Identifier could not be assigned",
            Some(codec.to_string()),
        ),
    }
}

pub(crate) fn cascade_to_api(err: CascadeError) -> ApiError {
    match err {
        CascadeError::DependentsUnavailable => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DEPENDENTS_UNAVAILABLE,
            "Note service unavailable",
            Some("notebook was not deleted; retry once the note service is up".to_string()),
        ),
        CascadeError::NotFound => ApiError::not_found("notebook not found"),
        CascadeError::CleanupRejected { status } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::CLEANUP_REJECTED,
            "Note cleanup failed",
            Some(format!("note service answered {status}")),
        ),
        CascadeError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn notebook_to_api(err: NotebookServiceError) -> ApiError {
    match err {
        NotebookServiceError::Domain(domain) => domain_to_api(domain),
        NotebookServiceError::Ids(ids) => ids_to_api(ids),
        NotebookServiceError::Repo(repo) => repo_to_api(repo),
        NotebookServiceError::Cascade(cascade) => cascade_to_api(cascade),
    }
}

pub(crate) fn note_to_api(err: NoteServiceError) -> ApiError {
    match err {
        NoteServiceError::Domain(domain) => domain_to_api(domain),
        NoteServiceError::Ids(ids) => ids_to_api(ids),
        NoteServiceError::Repo(repo) => repo_to_api(repo),
    }
}
