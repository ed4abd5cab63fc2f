// src/models/course.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::User;

/// School subject. Stored as the Postgres enum `subject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subject", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Mathematiques,
    Francais,
    Anglais,
    Physique,
    Chimie,
    Svt,
    HistoireGeo,
    Philosophie,
    Informatique,
    Economie,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::Mathematiques,
        Subject::Francais,
        Subject::Anglais,
        Subject::Physique,
        Subject::Chimie,
        Subject::Svt,
        Subject::HistoireGeo,
        Subject::Philosophie,
        Subject::Informatique,
        Subject::Economie,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Mathematiques => "mathematiques",
            Subject::Francais => "francais",
            Subject::Anglais => "anglais",
            Subject::Physique => "physique",
            Subject::Chimie => "chimie",
            Subject::Svt => "svt",
            Subject::HistoireGeo => "histoire_geo",
            Subject::Philosophie => "philosophie",
            Subject::Informatique => "informatique",
            Subject::Economie => "economie",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

/// Education level. Stored as the Postgres enum `education_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "education_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Primaire,
    College,
    Lycee,
    Siem,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Primaire, Level::College, Level::Lycee, Level::Siem];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Primaire => "primaire",
            Level::College => "college",
            Level::Lycee => "lycee",
            Level::Siem => "siem",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == raw)
    }
}

pub(crate) fn validate_subject(raw: &str) -> Result<(), validator::ValidationError> {
    Subject::parse(raw).map(|_| ()).ok_or_else(|| {
        validator::ValidationError::new("invalid_subject").with_message("Matière invalide".into())
    })
}

pub(crate) fn validate_level(raw: &str) -> Result<(), validator::ValidationError> {
    Level::parse(raw).map(|_| ()).ok_or_else(|| {
        validator::ValidationError::new("invalid_level").with_message("Niveau invalide".into())
    })
}

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub subject: Subject,
    pub level: Level,

    /// Public path of the stored PDF, e.g. `/uploads/1700000000000-42-cours.pdf`.
    pub pdf_url: String,

    /// File name as sent by the uploader.
    pub pdf_file_name: Option<String>,
    pub thumbnail_url: Option<String>,

    pub teacher_id: i64,
    pub is_published: bool,

    /// Incremented once per successful detail fetch.
    pub view_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A course together with its owning teacher, as returned by listings and detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithTeacher {
    #[serde(flatten)]
    pub course: Course,
    pub teacher: Option<User>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub subject: Subject,
    pub level: Level,
    pub pdf_url: String,
    pub pdf_file_name: Option<String>,
    pub teacher_id: i64,
}

/// Text fields of the course creation form (the PDF travels in the same multipart body).
#[derive(Debug, Default, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(
        min = 3,
        max = 255,
        message = "Le titre doit contenir au moins 3 caractères"
    ))]
    pub title: String,

    #[validate(length(
        min = 10,
        max = 20000,
        message = "La description doit contenir au moins 10 caractères"
    ))]
    pub description: String,

    #[validate(custom(function = validate_subject))]
    pub subject: String,

    #[validate(custom(function = validate_level))]
    pub level: String,
}

/// DTO for updating a course. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(
        min = 3,
        max = 255,
        message = "Le titre doit contenir au moins 3 caractères"
    ))]
    pub title: Option<String>,

    #[validate(length(
        min = 10,
        max = 20000,
        message = "La description doit contenir au moins 10 caractères"
    ))]
    pub description: Option<String>,

    #[validate(custom(function = validate_subject))]
    pub subject: Option<String>,

    #[validate(custom(function = validate_level))]
    pub level: Option<String>,

    pub is_published: Option<bool>,
}

/// Validated, typed course edits handed to the store.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<Subject>,
    pub level: Option<Level>,
    pub is_published: Option<bool>,
}

impl CourseChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.subject.is_none()
            && self.level.is_none()
            && self.is_published.is_none()
    }
}

/// Query parameters for listing courses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListParams {
    pub search: Option<String>,
    pub level: Option<Level>,
    pub subject: Option<Subject>,
    pub teacher_id: Option<i64>,
    pub limit: Option<i64>,
}

/// Filter applied by the store when listing courses.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub level: Option<Level>,
    pub subject: Option<Subject>,
    pub teacher_id: Option<i64>,

    /// Public listings leave this off; owner and admin views turn it on.
    pub include_unpublished: bool,
    pub limit: Option<i64>,
}

impl CourseFilter {
    /// The public catalogue: published courses only.
    pub fn public(params: CourseListParams) -> Self {
        Self {
            search: params.search.filter(|s| !s.trim().is_empty()),
            level: params.level,
            subject: params.subject,
            teacher_id: params.teacher_id,
            include_unpublished: false,
            limit: params.limit.map(|l| l.max(0)),
        }
    }

    /// Everything owned by one teacher, published or not.
    pub fn owned_by(teacher_id: i64) -> Self {
        Self {
            teacher_id: Some(teacher_id),
            include_unpublished: true,
            ..Default::default()
        }
    }

    /// Whether a course passes every filter except `limit`.
    pub fn matches(&self, course: &Course) -> bool {
        if !self.include_unpublished && !course.is_published {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !course.title.to_lowercase().contains(&needle)
                && !course.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        self.level.is_none_or(|l| l == course.level)
            && self.subject.is_none_or(|s| s == course.subject)
            && self.teacher_id.is_none_or(|t| t == course.teacher_id)
    }
}
