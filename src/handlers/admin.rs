// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    handlers::{course, live_course},
    models::{
        course::CourseFilter,
        live_course::LiveCourseFilter,
        user::{TeacherStatus, User},
    },
    store::Store,
    utils::{session::SessionUser, upload::FileStore},
};

/// Lists all users in the system, newest first.
/// Admin only.
pub async fn list_users(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_users().await?))
}

/// Deletes a user together with their content, then their PDFs best effort.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(store): State<Arc<dyn Store>>,
    State(files): State<FileStore>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == session.id() {
        return Err(AppError::BadRequest(
            "Vous ne pouvez pas supprimer votre propre compte".to_string(),
        ));
    }

    let pdf_urls = store
        .delete_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé".to_string()))?;

    for url in &pdf_urls {
        files.remove_by_url(url).await;
    }

    tracing::info!(
        "Admin {} deleted user {} ({} course files)",
        session.id(),
        id,
        pdf_urls.len()
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Every course, unpublished ones included.
/// Admin only.
pub async fn list_courses(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = CourseFilter {
        include_unpublished: true,
        ..Default::default()
    };
    let courses = store.list_courses(&filter).await?;
    Ok(Json(course::with_teachers(store.as_ref(), courses).await?))
}

/// Every live session in any state.
/// Admin only.
pub async fn list_live_courses(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let lives = store
        .list_live_courses(&LiveCourseFilter::default(), Utc::now())
        .await?;
    Ok(Json(live_course::with_teachers(store.as_ref(), lives).await?))
}

/// Teachers waiting for approval.
/// Admin only.
pub async fn pending_teachers(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_teachers(TeacherStatus::Pending).await?))
}

async fn set_teacher_status(
    store: &dyn Store,
    admin: &SessionUser,
    id: i64,
    status: TeacherStatus,
) -> Result<Json<User>, AppError> {
    let teacher = store
        .set_teacher_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Professeur non trouvé".to_string()))?;

    tracing::info!("Admin {} set teacher {} to {:?}", admin.id(), id, status);
    Ok(Json(teacher))
}

/// Admin only.
pub async fn approve_teacher(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    set_teacher_status(store.as_ref(), &session, id, TeacherStatus::Approved).await
}

/// Admin only.
pub async fn reject_teacher(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    set_teacher_status(store.as_ref(), &session, id, TeacherStatus::Rejected).await
}
