// src/handlers/course.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::teachers_by_id,
    models::course::{
        Course, CourseChanges, CourseFilter, CourseListParams, CourseWithTeacher,
        CreateCourseRequest, Level, NewCourse, Subject, UpdateCourseRequest,
    },
    store::Store,
    utils::{
        html::clean_html,
        session::{SessionUser, ensure_can_manage},
        upload::{FileStore, is_pdf},
    },
};

fn not_found() -> AppError {
    AppError::NotFound("Cours non trouvé".to_string())
}

/// Embeds each course's teacher.
pub(crate) async fn with_teachers(
    store: &dyn Store,
    courses: Vec<Course>,
) -> Result<Vec<CourseWithTeacher>, AppError> {
    let teachers = teachers_by_id(store, courses.iter().map(|c| c.teacher_id)).await?;
    Ok(courses
        .into_iter()
        .map(|course| CourseWithTeacher {
            teacher: teachers.get(&course.teacher_id).cloned(),
            course,
        })
        .collect())
}

/// Public catalogue: published courses only, newest first.
///
/// Filters: `search` (title or description), `level`, `subject`, `teacherId`, `limit`.
pub async fn list_courses(
    State(store): State<Arc<dyn Store>>,
    params: Result<Query<CourseListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let courses = store.list_courses(&CourseFilter::public(params)).await?;
    Ok(Json(with_teachers(store.as_ref(), courses).await?))
}

/// Course detail. Every successful fetch counts as one view.
pub async fn get_course(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store.increment_course_views(id).await?.ok_or_else(not_found)?;
    let teacher = store.find_user(course.teacher_id).await?;
    Ok(Json(CourseWithTeacher { course, teacher }))
}

/// Creates a course from a multipart form: `title`, `description`, `subject`,
/// `level` and the PDF in the `pdf` field.
pub async fn create_course(
    State(store): State<Arc<dyn Store>>,
    State(files): State<FileStore>,
    Extension(session): Extension<SessionUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart?;
    let mut form = CreateCourseRequest::default();
    let mut pdf: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf" => {
                if !is_pdf(field.content_type()) {
                    return Err(AppError::BadRequest(
                        "Seuls les fichiers PDF sont acceptés".to_string(),
                    ));
                }
                let file_name = field.file_name().unwrap_or("document.pdf").to_string();

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if bytes.len() + chunk.len() > files.max_bytes() {
                        return Err(AppError::PayloadTooLarge(format!(
                            "Le fichier ne doit pas dépasser {} Mo",
                            files.max_bytes() / (1024 * 1024)
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                if !bytes.is_empty() {
                    pdf = Some((file_name, bytes));
                }
            }
            "title" => form.title = field.text().await?.trim().to_string(),
            "description" => form.description = field.text().await?.trim().to_string(),
            "subject" => form.subject = field.text().await?.trim().to_string(),
            "level" => form.level = field.text().await?.trim().to_string(),
            _ => {}
        }
    }

    let (original_name, bytes) =
        pdf.ok_or_else(|| AppError::BadRequest("Le fichier PDF est requis".to_string()))?;

    form.validate()?;
    let (Some(subject), Some(level)) = (Subject::parse(&form.subject), Level::parse(&form.level))
    else {
        return Err(AppError::BadRequest("Matière ou niveau invalide".to_string()));
    };

    let stored = files.save(&original_name, &bytes).await.map_err(|e| {
        tracing::error!("Failed to store uploaded PDF: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let created = store
        .create_course(NewCourse {
            title: form.title,
            description: clean_html(&form.description),
            subject,
            level,
            pdf_url: stored.url.clone(),
            pdf_file_name: Some(original_name),
            teacher_id: session.id(),
        })
        .await;

    let course = match created {
        Ok(course) => course,
        Err(e) => {
            files.remove_by_url(&stored.url).await;
            return Err(e.into());
        }
    };

    tracing::info!("Teacher {} created course {}", session.id(), course.id);
    Ok((StatusCode::CREATED, Json(course)))
}

/// Edits a course. Owner or admin only.
pub async fn update_course(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let course = store.find_course(id).await?.ok_or_else(not_found)?;
    ensure_can_manage(course.teacher_id, &session.user)?;

    let Json(mut payload) = payload?;
    payload.title = payload.title.map(|t| t.trim().to_string());
    payload.description = payload.description.map(|d| d.trim().to_string());
    payload.validate()?;

    let changes = CourseChanges {
        title: payload.title,
        description: payload.description.map(|d| clean_html(&d)),
        subject: payload.subject.as_deref().and_then(Subject::parse),
        level: payload.level.as_deref().and_then(Level::parse),
        is_published: payload.is_published,
    };

    let course = store.update_course(id, changes).await?.ok_or_else(not_found)?;
    Ok(Json(course))
}

/// Deletes a course and then, best effort, its PDF. Owner or admin only.
pub async fn delete_course(
    State(store): State<Arc<dyn Store>>,
    State(files): State<FileStore>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store.find_course(id).await?.ok_or_else(not_found)?;
    ensure_can_manage(course.teacher_id, &session.user)?;

    if !store.delete_course(id).await? {
        return Err(not_found());
    }
    files.remove_by_url(&course.pdf_url).await;

    tracing::info!("User {} deleted course {}", session.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own courses, published or not.
pub async fn my_courses(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let courses = store.list_courses(&CourseFilter::owned_by(session.id())).await?;
    Ok(Json(courses))
}
