// src/handlers/stats.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::{error::AppError, store::Store, utils::session::SessionUser};

/// Counters for the student dashboard. Any logged-in user may read them.
pub async fn student_stats(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.student_stats(session.id(), Utc::now()).await?))
}

/// Counters over the caller's own content.
pub async fn teacher_stats(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.teacher_stats(session.id()).await?))
}

pub async fn admin_stats(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.admin_stats().await?))
}
