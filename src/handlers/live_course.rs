// src/handlers/live_course.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::teachers_by_id,
    models::{
        course::{Level, Subject},
        live_course::{
            CreateLiveCourseRequest, DEFAULT_DURATION_MINUTES, DEFAULT_MAX_PARTICIPANTS,
            LiveCourse, LiveCourseChanges, LiveCourseFilter, LiveCourseListParams,
            LiveCourseWithTeacher, NewLiveCourse, UpdateLiveCourseRequest,
            parse_scheduled_at,
        },
    },
    store::Store,
    utils::{
        html::{clean_html, clean_optional},
        meeting::{generate_room_id, join_url},
        session::{SessionUser, ensure_can_manage},
    },
};

fn not_found() -> AppError {
    AppError::NotFound("Live non trouvé".to_string())
}

fn already_ended() -> AppError {
    AppError::Conflict("Ce live est déjà terminé".to_string())
}

fn invalid_date() -> AppError {
    AppError::BadRequest("Date invalide".to_string())
}

pub(crate) async fn with_teachers(
    store: &dyn Store,
    lives: Vec<LiveCourse>,
) -> Result<Vec<LiveCourseWithTeacher>, AppError> {
    let teachers = teachers_by_id(store, lives.iter().map(|l| l.teacher_id)).await?;
    Ok(lives
        .into_iter()
        .map(|live_course| LiveCourseWithTeacher {
            teacher: teachers.get(&live_course.teacher_id).cloned(),
            live_course,
        })
        .collect())
}

/// Loads a session the caller is allowed to manage.
async fn find_managed(
    store: &dyn Store,
    session: &SessionUser,
    id: i64,
) -> Result<LiveCourse, AppError> {
    let live = store.find_live_course(id).await?.ok_or_else(not_found)?;
    ensure_can_manage(live.teacher_id, &session.user)?;
    Ok(live)
}

/// Lists live sessions, latest `scheduledAt` first.
///
/// `status` is one of `live`, `upcoming` (scheduled, not started, not in the past) or `past`.
pub async fn list_live_courses(
    State(store): State<Arc<dyn Store>>,
    params: Result<Query<LiveCourseListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let filter = LiveCourseFilter::from(params);
    let lives = store.list_live_courses(&filter, Utc::now()).await?;
    Ok(Json(with_teachers(store.as_ref(), lives).await?))
}

pub async fn get_live_course(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let live_course = store.find_live_course(id).await?.ok_or_else(not_found)?;
    let teacher = store.find_user(live_course.teacher_id).await?;
    Ok(Json(LiveCourseWithTeacher {
        live_course,
        teacher,
    }))
}

/// Schedules a live session and allocates its conferencing room.
pub async fn create_live_course(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Extension(session): Extension<SessionUser>,
    payload: Result<Json<CreateLiveCourseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    payload.title = payload.title.trim().to_string();
    payload.validate()?;

    let scheduled_at = payload
        .scheduled_at
        .as_deref()
        .and_then(parse_scheduled_at)
        .ok_or_else(invalid_date)?;

    let (Some(subject), Some(level)) =
        (Subject::parse(&payload.subject), Level::parse(&payload.level))
    else {
        return Err(AppError::BadRequest("Matière ou niveau invalide".to_string()));
    };

    let room_id = generate_room_id(&config.meeting_room_prefix);
    let live = store
        .create_live_course(NewLiveCourse {
            title: payload.title,
            description: clean_optional(payload.description),
            subject,
            level,
            teacher_id: session.id(),
            join_url: join_url(&config.meeting_base_url, &room_id),
            room_id,
            scheduled_at,
            duration: payload.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            max_participants: DEFAULT_MAX_PARTICIPANTS,
        })
        .await?;

    tracing::info!(
        "Teacher {} scheduled live {} in room {}",
        session.id(),
        live.id,
        live.room_id
    );
    Ok((StatusCode::CREATED, Json(live)))
}

/// Edits a session that has not ended yet. Owner or admin only.
pub async fn update_live_course(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateLiveCourseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let live = find_managed(store.as_ref(), &session, id).await?;
    if live.state.is_ended() {
        return Err(already_ended());
    }

    let Json(mut payload) = payload?;
    payload.title = payload.title.map(|t| t.trim().to_string());
    payload.description = payload.description.map(|d| d.trim().to_string());
    payload.validate()?;

    let scheduled_at = match payload.scheduled_at.as_deref() {
        Some(raw) => Some(parse_scheduled_at(raw).ok_or_else(invalid_date)?),
        None => None,
    };

    let changes = LiveCourseChanges {
        title: payload.title,
        description: payload.description.map(|d| clean_html(&d)),
        subject: payload.subject.as_deref().and_then(Subject::parse),
        level: payload.level.as_deref().and_then(Level::parse),
        scheduled_at,
        duration: payload.duration,
    };

    let live = store
        .update_live_course(id, changes)
        .await?
        .ok_or_else(already_ended)?;
    Ok(Json(live))
}

/// Scheduled or Live -> Live. Refused once the session has ended.
pub async fn start_live_course(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let live = find_managed(store.as_ref(), &session, id).await?;
    let next = live
        .state
        .start()
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    // The store re-checks `is_ended`, so a concurrent `end` wins.
    let live = store
        .set_live_state(id, next)
        .await?
        .ok_or_else(already_ended)?;

    tracing::info!("Live {} started by user {}", id, session.id());
    Ok(Json(live))
}

/// Any state -> Ended. Ending an ended session returns it unchanged.
pub async fn end_live_course(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let live = find_managed(store.as_ref(), &session, id).await?;
    if live.state.is_ended() {
        return Ok(Json(live));
    }

    let live = match store.set_live_state(id, live.state.end()).await? {
        Some(live) => live,
        None => store.find_live_course(id).await?.ok_or_else(not_found)?,
    };

    tracing::info!("Live {} ended by user {}", id, session.id());
    Ok(Json(live))
}

/// Deletes a session in any state. Owner or admin only.
pub async fn delete_live_course(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let live = find_managed(store.as_ref(), &session, id).await?;
    if !store.delete_live_course(live.id).await? {
        return Err(not_found());
    }

    tracing::info!("User {} deleted live {}", session.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own sessions, every state included.
pub async fn my_live_courses(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let lives = store
        .list_live_courses(&LiveCourseFilter::owned_by(session.id()), Utc::now())
        .await?;
    Ok(Json(lives))
}

