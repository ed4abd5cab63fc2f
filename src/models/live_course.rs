// src/models/live_course.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use validator::Validate;

use crate::models::{
    course::{Level, Subject, validate_level, validate_subject},
    user::User,
};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;
pub const DEFAULT_MAX_PARTICIPANTS: i32 = 100;

/// Lifecycle of a live session: Scheduled -> Live -> Ended.
///
/// Persisted as the two columns `is_active` / `is_ended`; `(true, true)` is not
/// representable here and is rejected by a CHECK constraint in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Scheduled,
    Live,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Ce live est déjà terminé")]
    AlreadyEnded,
}

impl LiveState {
    /// Reads the stored flags. `is_ended` wins over `is_active`.
    pub fn from_flags(is_active: bool, is_ended: bool) -> Self {
        match (is_active, is_ended) {
            (_, true) => LiveState::Ended,
            (true, false) => LiveState::Live,
            (false, false) => LiveState::Scheduled,
        }
    }

    /// `(is_active, is_ended)`
    pub fn flags(self) -> (bool, bool) {
        match self {
            LiveState::Scheduled => (false, false),
            LiveState::Live => (true, false),
            LiveState::Ended => (false, true),
        }
    }

    pub fn is_active(self) -> bool {
        self.flags().0
    }

    pub fn is_ended(self) -> bool {
        self.flags().1
    }

    /// Allowed from any non-ended state. Starting an already live session is a no-op.
    pub fn start(self) -> Result<Self, TransitionError> {
        match self {
            LiveState::Ended => Err(TransitionError::AlreadyEnded),
            LiveState::Scheduled | LiveState::Live => Ok(LiveState::Live),
        }
    }

    /// Always lands on `Ended`; ending twice changes nothing.
    pub fn end(self) -> Self {
        LiveState::Ended
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LiveState::Scheduled => "scheduled",
            LiveState::Live => "live",
            LiveState::Ended => "ended",
        }
    }
}

impl Serialize for LiveState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("LiveState", 3)?;
        s.serialize_field("status", self.as_str())?;
        s.serialize_field("isActive", &self.is_active())?;
        s.serialize_field("isEnded", &self.is_ended())?;
        s.end()
    }
}

/// Represents the 'live_courses' table in the database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCourse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject: Subject,
    pub level: Level,
    pub teacher_id: i64,

    /// Room name on the conferencing service; unique.
    pub room_id: String,
    pub join_url: String,

    pub scheduled_at: DateTime<Utc>,

    /// Minutes, within [15, 180].
    pub duration: i32,
    pub max_participants: i32,

    #[serde(flatten)]
    pub state: LiveState,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCourseWithTeacher {
    #[serde(flatten)]
    pub live_course: LiveCourse,
    pub teacher: Option<User>,
}

#[derive(Debug, Clone)]
pub struct NewLiveCourse {
    pub title: String,
    pub description: Option<String>,
    pub subject: Subject,
    pub level: Level,
    pub teacher_id: i64,
    pub room_id: String,
    pub join_url: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration: i32,
    pub max_participants: i32,
}

/// DTO for scheduling a live session.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLiveCourseRequest {
    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 255,
        message = "Le titre doit contenir au moins 3 caractères"
    ))]
    pub title: String,

    #[validate(length(max = 20000))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(custom(function = validate_subject))]
    pub subject: String,

    #[serde(default)]
    #[validate(custom(function = validate_level))]
    pub level: String,

    #[validate(required(message = "La date est requise"))]
    pub scheduled_at: Option<String>,

    #[validate(range(
        min = 15,
        max = 180,
        message = "La durée doit être comprise entre 15 et 180 minutes"
    ))]
    pub duration: Option<i32>,
}

/// DTO for editing a live session that has not ended. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLiveCourseRequest {
    #[validate(length(
        min = 3,
        max = 255,
        message = "Le titre doit contenir au moins 3 caractères"
    ))]
    pub title: Option<String>,

    #[validate(length(max = 20000))]
    pub description: Option<String>,

    #[validate(custom(function = validate_subject))]
    pub subject: Option<String>,

    #[validate(custom(function = validate_level))]
    pub level: Option<String>,

    pub scheduled_at: Option<String>,

    #[validate(range(
        min = 15,
        max = 180,
        message = "La durée doit être comprise entre 15 et 180 minutes"
    ))]
    pub duration: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct LiveCourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<Subject>,
    pub level: Option<Level>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
}

impl LiveCourseChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.subject.is_none()
            && self.level.is_none()
            && self.scheduled_at.is_none()
            && self.duration.is_none()
    }
}

/// Parses a schedule timestamp: RFC 3339, or the `datetime-local` form
/// (`2025-03-01T14:30` / `2025-03-01T14:30:00`) read as UTC.
pub fn parse_scheduled_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Status filter for live listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveStatusFilter {
    Live,
    Upcoming,
    Past,
}

impl LiveStatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            LiveStatusFilter::Live => "live",
            LiveStatusFilter::Upcoming => "upcoming",
            LiveStatusFilter::Past => "past",
        }
    }

    pub fn matches(self, state: LiveState, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            LiveStatusFilter::Live => state == LiveState::Live,
            LiveStatusFilter::Upcoming => state == LiveState::Scheduled && scheduled_at >= now,
            LiveStatusFilter::Past => state == LiveState::Ended,
        }
    }
}

/// Query parameters for listing live sessions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCourseListParams {
    pub status: Option<LiveStatusFilter>,

    /// Older clients send `upcoming=true` instead of `status=upcoming`.
    pub upcoming: Option<bool>,
    pub level: Option<Level>,
    pub subject: Option<Subject>,
    pub teacher_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct LiveCourseFilter {
    pub status: Option<LiveStatusFilter>,
    pub level: Option<Level>,
    pub subject: Option<Subject>,
    pub teacher_id: Option<i64>,
    pub limit: Option<i64>,
}

impl From<LiveCourseListParams> for LiveCourseFilter {
    fn from(params: LiveCourseListParams) -> Self {
        let status = if params.upcoming == Some(true) {
            Some(LiveStatusFilter::Upcoming)
        } else {
            params.status
        };
        Self {
            status,
            level: params.level,
            subject: params.subject,
            teacher_id: params.teacher_id,
            limit: params.limit.map(|l| l.max(0)),
        }
    }
}

impl LiveCourseFilter {
    pub fn owned_by(teacher_id: i64) -> Self {
        Self {
            teacher_id: Some(teacher_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, live: &LiveCourse, now: DateTime<Utc>) -> bool {
        self.status
            .is_none_or(|s| s.matches(live.state, live.scheduled_at, now))
            && self.level.is_none_or(|l| l == live.level)
            && self.subject.is_none_or(|s| s == live.subject)
            && self.teacher_id.is_none_or(|t| t == live.teacher_id)
    }
}
