use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use storage::error::StorageError;
use validator::ValidationErrors;

/// Web layer errors. Every variant renders as `{ error, message, details? }`.
#[derive(Debug)]
pub enum WebError {
    StoreNotConfigured,
    Storage(StorageError),
    Validation(ValidationErrors),
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    InternalServerError(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreNotConfigured => write!(f, "Statistics store is not configured"),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

fn field_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                format!(
                    "{}: {}",
                    field,
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                )
            })
        })
        .collect();

    // Nested result errors are keyed by index.
    for (field, kind) in errors.errors() {
        if let validator::ValidationErrorsKind::List(items) = kind {
            for (index, item) in items {
                messages.push(format!("{}[{}]: {}", field, index, field_errors(item)));
            }
        }
    }

    messages.sort();
    messages.join("; ")
}

impl WebError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::StoreNotConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "store_not_configured"),
            Self::Storage(StorageError::SchemaNotReady(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "not_initialized")
            }
            Self::Storage(StorageError::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Storage(StorageError::CompetitionOwnedElsewhere(_)) => {
                (StatusCode::FORBIDDEN, "forbidden")
            }
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "query_failed"),
            Self::Validation(_) | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::InternalServerError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status_code, code) = self.status_and_code();

        let (message, details) = match &self {
            Self::StoreNotConfigured => {
                tracing::error!("Request needs a store but DATABASE_URL is not set");
                (
                    "Statistics store is not configured".to_string(),
                    None,
                )
            }
            Self::Storage(StorageError::SchemaNotReady(msg)) => {
                tracing::warn!("Schema not initialized: {}", msg);
                (
                    "Statistics tables are not initialized; run the database migrations"
                        .to_string(),
                    Some(msg.clone()),
                )
            }
            Self::Storage(StorageError::NotFound) => ("Resource not found".to_string(), None),
            Self::Storage(e @ StorageError::CompetitionOwnedElsewhere(_)) => {
                tracing::warn!("{}", e);
                (
                    "Only the organizing streamer may submit this competition".to_string(),
                    None,
                )
            }
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                ("Statistics query failed".to_string(), Some(e.to_string()))
            }
            Self::Validation(errors) => (
                "Validation failed".to_string(),
                Some(field_errors(errors)),
            ),
            Self::BadRequest(msg) => (msg.clone(), None),
            Self::Unauthorized => ("Missing or invalid API key".to_string(), None),
            Self::Forbidden(msg) => (msg.clone(), None),
            Self::NotFound(msg) => (msg.clone(), None),
            Self::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = match details {
            Some(details) => json!({ "error": code, "message": message, "details": details }),
            None => json!({ "error": code, "message": message }),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

pub type WebResult<T> = Result<T, WebError>;
