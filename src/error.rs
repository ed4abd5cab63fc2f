// src/error.rs

use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (validation, duplicate email, missing file)
    BadRequest(String),

    // 401 Unauthorized (no session, bad credentials, vanished user)
    AuthError(String),

    // 403 Forbidden (wrong role, not the owner, role mismatch at login)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (mutating an ended live session)
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON `{"message": ...}` response with the matching status.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erreur interne du serveur".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => {
                AppError::BadRequest("Cet email est déjà utilisé".to_string())
            }
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("Le fichier dépasse la taille autorisée".to_string())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(first_validation_message(&errors))
    }
}

/// Picks the first human-readable message out of a validator error tree.
/// Falls back to the error code, then to the whole report.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    for (field, errs) in fields {
        if let Some(e) = errs.first() {
            return match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{}: {}", field, e.code),
            };
        }
    }

    errors.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Le titre doit contenir au moins 3 caractères"))]
        title: String,
        #[validate(range(min = 15, max = 180))]
        duration: i32,
    }

    #[test]
    fn validation_errors_surface_the_custom_message() {
        let err = Sample { title: "ab".into(), duration: 60 }.validate().unwrap_err();
        match AppError::from(err) {
            AppError::BadRequest(msg) => {
                assert_eq!(msg, "Le titre doit contenir au moins 3 caractères")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_errors_without_message_name_the_field() {
        let err = Sample { title: "abc".into(), duration: 200 }.validate().unwrap_err();
        match AppError::from(err) {
            AppError::BadRequest(msg) => assert_eq!(msg, "duration: range"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_email_is_a_bad_request() {
        let status = AppError::from(StoreError::DuplicateEmail).into_response().status();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let status = AppError::InternalServerError("boom".into()).into_response().status();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
