//! src/store/postgres.rs
//!
//! Postgres adapter for the `Store` port. Queries are checked at runtime so the
//! crate builds without a live database.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, PgPool, Postgres, QueryBuilder,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    models::{
        course::{Course, CourseChanges, CourseFilter, NewCourse},
        live_course::{
            LiveCourse, LiveCourseChanges, LiveCourseFilter, LiveState, NewLiveCourse,
        },
        session::Session,
        stats::{AdminStats, StudentStats, TeacherStats},
        user::{NewUser, ProfileChanges, TeacherApplication, TeacherStatus, TeacherSummary, User},
    },
    store::{Store, StoreError, StoreResult},
};

const USER_COLUMNS: &str = "id, email, password, first_name, last_name, profile_image_url, \
     role, teacher_status, specialization, bio, created_at, updated_at";

const COURSE_COLUMNS: &str = "id, title, description, subject, level, pdf_url, pdf_file_name, \
     thumbnail_url, teacher_id, is_published, view_count, created_at, updated_at";

const LIVE_COLUMNS: &str = "id, title, description, subject, level, teacher_id, room_id, \
     join_url, scheduled_at, duration, max_participants, is_active, is_ended, \
     created_at, updated_at";

/// A database adapter that implements the `Store` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with a few retries, for containers where the database comes up late.
    pub async fn connect(database_url: &str, attempts: u32) -> Result<Self, sqlx::Error> {
        let mut retry_count = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => return Ok(Self::new(pool)),
                Err(e) if retry_count < attempts => {
                    retry_count += 1;
                    tracing::warn!(
                        "Database not ready ({}), retrying in 2s... (Attempt {})",
                        e,
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_user(&self, sql: &str, id: i64) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count(&self, sql: &str) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await?)
    }
}

/// Row shape of `live_courses`; the two flags fold into `LiveState`.
struct LiveCourseRecord(LiveCourse);

impl<'r> FromRow<'r, PgRow> for LiveCourseRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let is_active: bool = row.try_get("is_active")?;
        let is_ended: bool = row.try_get("is_ended")?;

        Ok(Self(LiveCourse {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            subject: row.try_get("subject")?,
            level: row.try_get("level")?,
            teacher_id: row.try_get("teacher_id")?,
            room_id: row.try_get("room_id")?,
            join_url: row.try_get("join_url")?,
            scheduled_at: row.try_get("scheduled_at")?,
            duration: row.try_get("duration")?,
            max_participants: row.try_get("max_participants")?,
            state: LiveState::from_flags(is_active, is_ended),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

/// Escapes LIKE wildcards so user input matches literally, then wraps it in `%`.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn map_unique_email(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password, first_name, last_name, role, teacher_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.teacher_status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_email)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.fetch_user(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"), id)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_users(&self, ids: &[i64]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_teachers(&self, status: TeacherStatus) -> StoreResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'teacher' AND teacher_status = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_teacher_summaries(&self) -> StoreResult<Vec<TeacherSummary>> {
        let teachers = self.list_teachers(TeacherStatus::Approved).await?;
        if teachers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = teachers.iter().map(|t| t.id).collect();
        let counts: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                u.id,
                (SELECT COUNT(*) FROM courses c WHERE c.teacher_id = u.id),
                (SELECT COUNT(*) FROM live_courses l WHERE l.teacher_id = u.id)
            FROM users u
            WHERE u.id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(teachers
            .into_iter()
            .map(|user| {
                let (course_count, live_count) = counts
                    .iter()
                    .find(|(id, _, _)| *id == user.id)
                    .map(|(_, c, l)| (*c, *l))
                    .unwrap_or((0, 0));
                TeacherSummary {
                    user,
                    course_count,
                    live_count,
                }
            })
            .collect())
    }

    async fn set_teacher_status(
        &self,
        id: i64,
        status: TeacherStatus,
    ) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET teacher_status = $2, updated_at = NOW()
            WHERE id = $1 AND role = 'teacher'
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn promote_to_teacher(
        &self,
        id: i64,
        application: TeacherApplication,
    ) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role = 'teacher', teacher_status = 'pending',
                specialization = $2, bio = $3, updated_at = NOW()
            WHERE id = $1 AND role = 'student'
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&application.specialization)
        .bind(&application.bio)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> StoreResult<Option<User>> {
        if changes.is_empty() {
            return self.find_user(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = builder.separated(", ");

        if let Some(first_name) = changes.first_name {
            separated.push("first_name = ");
            separated.push_bind_unseparated(first_name);
        }
        if let Some(last_name) = changes.last_name {
            separated.push("last_name = ");
            separated.push_bind_unseparated(last_name);
        }
        if let Some(url) = changes.profile_image_url {
            separated.push("profile_image_url = ");
            separated.push_bind_unseparated(url);
        }
        if let Some(specialization) = changes.specialization {
            separated.push("specialization = ");
            separated.push_bind_unseparated(specialization);
        }
        if let Some(bio) = changes.bio {
            separated.push("bio = ");
            separated.push_bind_unseparated(bio);
        }
        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        Ok(builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<Option<Vec<String>>> {
        let pdf_urls: Vec<String> =
            sqlx::query_scalar("SELECT pdf_url FROM courses WHERE teacher_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        // Courses, live sessions, enrollments and sessions cascade.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(pdf_urls))
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, user_role, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.user_role)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(sqlx::query_as::<_, Session>(
            "SELECT id, user_id, user_role, expires_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        Ok(sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses
            (title, description, subject, level, pdf_url, pdf_file_name, teacher_id, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.subject)
        .bind(course.level)
        .bind(&course.pdf_url)
        .bind(&course.pdf_file_name)
        .bind(course.teacher_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_courses(&self, filter: &CourseFilter) -> StoreResult<Vec<Course>> {
        let search = filter.search.as_deref().map(like_pattern);

        Ok(sqlx::query_as::<_, Course>(&format!(
            r#"
            SELECT {COURSE_COLUMNS}
            FROM courses
            WHERE ($1 OR is_published)
              AND ($2::TEXT IS NULL OR title ILIKE $2 OR description ILIKE $2)
              AND ($3::education_level IS NULL OR level = $3)
              AND ($4::subject IS NULL OR subject = $4)
              AND ($5::BIGINT IS NULL OR teacher_id = $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6
            "#
        ))
        .bind(filter.include_unpublished)
        .bind(search)
        .bind(filter.level)
        .bind(filter.subject)
        .bind(filter.teacher_id)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn increment_course_views(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses SET view_count = view_count + 1
            WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_course(&self, id: i64, changes: CourseChanges) -> StoreResult<Option<Course>> {
        if changes.is_empty() {
            return self.find_course(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE courses SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }
        if let Some(description) = changes.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(subject) = changes.subject {
            separated.push("subject = ");
            separated.push_bind_unseparated(subject);
        }
        if let Some(level) = changes.level {
            separated.push("level = ");
            separated.push_bind_unseparated(level);
        }
        if let Some(is_published) = changes.is_published {
            separated.push("is_published = ");
            separated.push_bind_unseparated(is_published);
        }
        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {COURSE_COLUMNS}"));

        Ok(builder
            .build_query_as::<Course>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_course(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_live_course(&self, live: NewLiveCourse) -> StoreResult<LiveCourse> {
        let record = sqlx::query_as::<_, LiveCourseRecord>(&format!(
            r#"
            INSERT INTO live_courses
            (title, description, subject, level, teacher_id, room_id, join_url,
             scheduled_at, duration, max_participants)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LIVE_COLUMNS}
            "#
        ))
        .bind(&live.title)
        .bind(&live.description)
        .bind(live.subject)
        .bind(live.level)
        .bind(live.teacher_id)
        .bind(&live.room_id)
        .bind(&live.join_url)
        .bind(live.scheduled_at)
        .bind(live.duration)
        .bind(live.max_participants)
        .fetch_one(&self.pool)
        .await?;
        Ok(record.0)
    }

    async fn find_live_course(&self, id: i64) -> StoreResult<Option<LiveCourse>> {
        let record = sqlx::query_as::<_, LiveCourseRecord>(&format!(
            "SELECT {LIVE_COLUMNS} FROM live_courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(|r| r.0))
    }

    async fn list_live_courses(
        &self,
        filter: &LiveCourseFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<LiveCourse>> {
        let records = sqlx::query_as::<_, LiveCourseRecord>(&format!(
            r#"
            SELECT {LIVE_COLUMNS}
            FROM live_courses
            WHERE ($1::TEXT IS NULL
                   OR ($1 = 'live' AND is_active AND NOT is_ended)
                   OR ($1 = 'upcoming' AND NOT is_active AND NOT is_ended AND scheduled_at >= $2)
                   OR ($1 = 'past' AND is_ended))
              AND ($3::education_level IS NULL OR level = $3)
              AND ($4::subject IS NULL OR subject = $4)
              AND ($5::BIGINT IS NULL OR teacher_id = $5)
            ORDER BY scheduled_at DESC, id DESC
            LIMIT $6
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(now)
        .bind(filter.level)
        .bind(filter.subject)
        .bind(filter.teacher_id)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(|r| r.0).collect())
    }

    async fn update_live_course(
        &self,
        id: i64,
        changes: LiveCourseChanges,
    ) -> StoreResult<Option<LiveCourse>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE live_courses SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }
        if let Some(description) = changes.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(subject) = changes.subject {
            separated.push("subject = ");
            separated.push_bind_unseparated(subject);
        }
        if let Some(level) = changes.level {
            separated.push("level = ");
            separated.push_bind_unseparated(level);
        }
        if let Some(scheduled_at) = changes.scheduled_at {
            separated.push("scheduled_at = ");
            separated.push_bind_unseparated(scheduled_at);
        }
        if let Some(duration) = changes.duration {
            separated.push("duration = ");
            separated.push_bind_unseparated(duration);
        }
        separated.push("updated_at = NOW()");

        builder.push(" WHERE is_ended = FALSE AND id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {LIVE_COLUMNS}"));

        let record = builder
            .build_query_as::<LiveCourseRecord>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(|r| r.0))
    }

    async fn set_live_state(&self, id: i64, state: LiveState) -> StoreResult<Option<LiveCourse>> {
        let (is_active, is_ended) = state.flags();
        let record = sqlx::query_as::<_, LiveCourseRecord>(&format!(
            r#"
            UPDATE live_courses
            SET is_active = $2, is_ended = $3, updated_at = NOW()
            WHERE id = $1 AND is_ended = FALSE
            RETURNING {LIVE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(is_active)
        .bind(is_ended)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(|r| r.0))
    }

    async fn delete_live_course(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM live_courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn student_stats(
        &self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<StudentStats> {
        let (total_courses, upcoming_lives, enrolled_courses): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM courses WHERE is_published),
                (SELECT COUNT(*) FROM live_courses WHERE NOT is_ended AND scheduled_at >= $2),
                (SELECT COUNT(*) FROM enrollments WHERE student_id = $1)
            "#,
        )
        .bind(student_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(StudentStats {
            total_courses,
            upcoming_lives,
            study_hours: 0,
            enrolled_courses,
        })
    }

    async fn teacher_stats(&self, teacher_id: i64) -> StoreResult<TeacherStats> {
        let (total_courses, total_views, total_lives): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM courses WHERE teacher_id = $1),
                (SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM courses WHERE teacher_id = $1),
                (SELECT COUNT(*) FROM live_courses WHERE teacher_id = $1)
            "#,
        )
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TeacherStats {
            total_courses,
            total_lives,
            total_views,
            total_students: 0,
        })
    }

    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        Ok(AdminStats {
            total_users: self.count("SELECT COUNT(*) FROM users").await?,
            total_teachers: self
                .count(
                    "SELECT COUNT(*) FROM users \
                     WHERE role = 'teacher' AND teacher_status = 'approved'",
                )
                .await?,
            pending_teachers: self
                .count(
                    "SELECT COUNT(*) FROM users \
                     WHERE role = 'teacher' AND teacher_status = 'pending'",
                )
                .await?,
            total_courses: self.count("SELECT COUNT(*) FROM courses").await?,
            total_lives: self.count("SELECT COUNT(*) FROM live_courses").await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("algèbre"), "%algèbre%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
