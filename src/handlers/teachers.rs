// src/handlers/teachers.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::{error::AppError, store::Store};

/// Public directory of approved teachers with their course and live counts.
pub async fn list_teachers(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_teacher_summaries().await?))
}
