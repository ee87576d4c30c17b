/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / {"detail": ...} JSON body)
 * - auth error / repo error / validation error を統一的に変換
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::error::AuthError;
use crate::services::documents::DocumentError;

/// One entry of a 422 response body.
///
/// `loc` is the path to the offending input (e.g. `["query", "protocol"]`),
/// `kind` a machine-readable tag such as `missing` or `value_error`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ValidationIssue {
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: &'static str) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind,
        }
    }

    pub fn query(field: &str, msg: impl Into<String>, kind: &'static str) -> Self {
        Self::new(vec!["query".to_string(), field.to_string()], msg, kind)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {detail}")]
    Unauthorized { detail: &'static str },

    #[error("service unavailable: {detail}")]
    ServiceUnavailable { detail: &'static str },

    #[error("validation failed")]
    Validation(Vec<ValidationIssue>),

    #[error("not found: {resource}")]
    NotFound { resource: &'static str },

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn unauthorized(detail: &'static str) -> Self {
        Self::Unauthorized { detail }
    }

    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Self::Validation(issues)
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Bodies keep the {"detail": ...} shape for every status: a string
        // for simple failures, a list of issues for 422.
        let (status, body) = match self {
            AppError::Unauthorized { detail } => {
                (StatusCode::UNAUTHORIZED, json!({ "detail": detail }))
            }
            AppError::ServiceUnavailable { detail } => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "detail": detail }))
            }
            AppError::Validation(issues) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "detail": issues }))
            }
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                json!({ "detail": format!("{resource} not found") }),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            // No credentials at all is reported distinctly from a bad token.
            AuthError::MissingCredentials => AppError::unauthorized("Not authenticated"),

            // Provider-side fault: the client did nothing wrong, so this must
            // not surface as 401. Operators see the cause in the logs.
            AuthError::KeyRetrieval(_) => AppError::ServiceUnavailable {
                detail: "Signing keys unavailable",
            },

            // Every caller fault collapses into one external message. The
            // precise kind stays server-side (logged by the middleware).
            _ => AppError::unauthorized("Invalid credentials"),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Db(_) => AppError::Internal,
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(_: DocumentError) -> Self {
        AppError::Internal
    }
}
