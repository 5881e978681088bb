//! Uniform HTTP error mapping (§7): validation failures -> 400, NotFound ->
//! 404, everything else -> 500, matching the taxonomy in the error-handling
//! design section.

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use pulsewatch_agentconfig::AgentConfigError;
use pulsewatch_alerting::AlertingError;
use pulsewatch_repo::RepoError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ApiError::not_found(),
            RepoError::Conflict(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            RepoError::Backend(msg) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl From<AgentConfigError> for ApiError {
    fn from(err: AgentConfigError) -> Self {
        match err {
            AgentConfigError::Repo(inner) => inner.into(),
            AgentConfigError::SubjectNotFound(name) => {
                ApiError::bad_request(format!("unknown subject {name} and no roles supplied"))
            }
        }
    }
}

impl From<AlertingError> for ApiError {
    fn from(err: AlertingError) -> Self {
        match err {
            AlertingError::Repo(inner) => inner.into(),
        }
    }
}

impl From<pulsewatch_ids::IdParseError> for ApiError {
    fn from(err: pulsewatch_ids::IdParseError) -> Self {
        ApiError::bad_request(format!("invalid identifier: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
