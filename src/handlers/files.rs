// src/handlers/files.rs

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::AppError,
    utils::upload::{FileStore, PDF_MIME, is_safe_file_name},
};

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Sends a stored PDF as an attachment. Requires a session.
pub async fn download(
    State(files): State<FileStore>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !is_safe_file_name(&file_name) {
        return Err(AppError::BadRequest("Nom de fichier invalide".to_string()));
    }

    let not_found = || AppError::NotFound("Fichier non trouvé".to_string());
    let path = files.resolve(&file_name).ok_or_else(not_found)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            tracing::error!("Failed to read {:?}: {:?}", path, e);
            return Err(AppError::InternalServerError(e.to_string()));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, PDF_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        bytes,
    ))
}
