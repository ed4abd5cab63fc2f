//! src/store/mod.rs
//!
//! The storage port. Handlers only ever talk to `dyn Store`; `PgStore` backs the
//! running service and `MemoryStore` backs the integration tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    course::{Course, CourseChanges, CourseFilter, NewCourse},
    live_course::{LiveCourse, LiveCourseChanges, LiveCourseFilter, LiveState, NewLiveCourse},
    session::Session,
    stats::{AdminStats, StudentStats, TeacherStats},
    user::{NewUser, ProfileChanges, TeacherApplication, TeacherStatus, TeacherSummary, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_users(&self, ids: &[i64]) -> StoreResult<Vec<User>>;

    /// All users, newest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Teachers in the given approval state, newest first.
    async fn list_teachers(&self, status: TeacherStatus) -> StoreResult<Vec<User>>;

    /// Approved teachers with their course and live counts, newest first.
    async fn list_teacher_summaries(&self) -> StoreResult<Vec<TeacherSummary>>;

    /// Changes the approval state of a teacher. `None` when no teacher has this id.
    async fn set_teacher_status(
        &self,
        id: i64,
        status: TeacherStatus,
    ) -> StoreResult<Option<User>>;

    /// Turns a student into a pending teacher.
    async fn promote_to_teacher(
        &self,
        id: i64,
        application: TeacherApplication,
    ) -> StoreResult<Option<User>>;

    async fn update_profile(&self, id: i64, changes: ProfileChanges)
    -> StoreResult<Option<User>>;

    /// Deletes a user and everything they own. Returns the PDF urls of the removed
    /// courses so the caller can clean up the files, or `None` if the user did not exist.
    async fn delete_user(&self, id: i64) -> StoreResult<Option<Vec<String>>>;

    // --- Sessions ---
    async fn create_session(&self, session: &Session) -> StoreResult<()>;

    async fn find_session(&self, id: &str) -> StoreResult<Option<Session>>;

    async fn delete_session(&self, id: &str) -> StoreResult<()>;

    // --- Courses ---
    async fn create_course(&self, course: NewCourse) -> StoreResult<Course>;

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>>;

    /// Courses matching the filter, newest first, truncated to `filter.limit`.
    async fn list_courses(&self, filter: &CourseFilter) -> StoreResult<Vec<Course>>;

    /// Atomically bumps `view_count` by one and returns the updated row.
    async fn increment_course_views(&self, id: i64) -> StoreResult<Option<Course>>;

    async fn update_course(&self, id: i64, changes: CourseChanges) -> StoreResult<Option<Course>>;

    async fn delete_course(&self, id: i64) -> StoreResult<bool>;

    // --- Live sessions ---
    async fn create_live_course(&self, live: NewLiveCourse) -> StoreResult<LiveCourse>;

    async fn find_live_course(&self, id: i64) -> StoreResult<Option<LiveCourse>>;

    /// Sessions matching the filter at `now`, latest `scheduled_at` first.
    async fn list_live_courses(
        &self,
        filter: &LiveCourseFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<LiveCourse>>;

    /// Edits a session that has not ended. `None` if it is missing or already ended.
    async fn update_live_course(
        &self,
        id: i64,
        changes: LiveCourseChanges,
    ) -> StoreResult<Option<LiveCourse>>;

    /// Writes a new lifecycle state onto a session that has not ended.
    /// `None` if it is missing or already ended.
    async fn set_live_state(&self, id: i64, state: LiveState) -> StoreResult<Option<LiveCourse>>;

    async fn delete_live_course(&self, id: i64) -> StoreResult<bool>;

    // --- Dashboards ---
    async fn student_stats(&self, student_id: i64, now: DateTime<Utc>)
    -> StoreResult<StudentStats>;

    async fn teacher_stats(&self, teacher_id: i64) -> StoreResult<TeacherStats>;

    async fn admin_stats(&self) -> StoreResult<AdminStats>;
}
