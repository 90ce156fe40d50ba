// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid payload")]
    InvalidPayload(#[from] validator::ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplication error: {0}")]
    Duplication(String),

    // Identity could not be established (no session, invalid or revoked token).
    #[error("not authorized")]
    NotAuthorized,

    // Identity is known but the role does not reach the required level.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("organization ID missing")]
    OrganizationIdMissing,

    #[error("user ID missing")]
    UserIdMissing,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AppError::InvalidState(message.into())
    }

    /// Stable machine-readable code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidPayload(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Duplication(_) => "conflict",
            AppError::NotAuthorized | AppError::UserIdMissing => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::OrganizationIdMissing => "organization_id_missing",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Database(_) | AppError::Internal(_) => "internal_server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::OrganizationIdMissing => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Duplication(_) | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::NotAuthorized | AppError::UserIdMissing => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a sqlx error coming out of a repository into the domain taxonomy.
    /// `what` names the entity for not-found messages.
    pub fn from_db(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound(what.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                AppError::Duplication(format!("{what} violates {constraint}"))
            }
            _ => AppError::Database(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::InvalidPayload(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": {
                        "code": self.code(),
                        "message": "one or more fields are invalid",
                        "details": details,
                    }
                }));
                return (status, body).into_response();
            }
            AppError::Database(_) | AppError::Internal(_) => {
                // Raw SQL / internal errors stay in the logs.
                tracing::error!(error = ?self, "internal server error");
                "an unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}
