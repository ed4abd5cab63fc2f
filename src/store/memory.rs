//! src/store/memory.rs
//!
//! In-process implementation of the `Store` port. Used by the integration tests
//! and handy for running the API without Postgres.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    models::{
        course::{Course, CourseChanges, CourseFilter, NewCourse},
        enrollment::Enrollment,
        live_course::{LiveCourse, LiveCourseChanges, LiveCourseFilter, LiveState, NewLiveCourse},
        session::Session,
        stats::{AdminStats, StudentStats, TeacherStats},
        user::{
            NewUser, ProfileChanges, Role, TeacherApplication, TeacherStatus, TeacherSummary,
            User,
        },
    },
    store::{Store, StoreError, StoreResult},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    courses: Vec<Course>,
    live_courses: Vec<LiveCourse>,
    enrollments: Vec<Enrollment>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, id: i64) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Newest first, ids break ties so equal timestamps still sort deterministically.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn truncate<T>(mut items: Vec<T>, limit: Option<i64>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(usize::try_from(limit).unwrap_or(0));
    }
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let created = User {
            id: tables.next_id(),
            email: user.email,
            password: user.password_hash,
            first_name: Some(user.first_name),
            last_name: Some(user.last_name),
            profile_image_url: None,
            role: user.role,
            teacher_status: user.teacher_status,
            specialization: None,
            bio: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[i64]) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users = self.lock()?.users.clone();
        newest_first(&mut users, |u| (u.created_at, u.id));
        Ok(users)
    }

    async fn list_teachers(&self, status: TeacherStatus) -> StoreResult<Vec<User>> {
        let mut teachers: Vec<User> = self
            .lock()?
            .users
            .iter()
            .filter(|u| u.role == Role::Teacher && u.teacher_status == Some(status))
            .cloned()
            .collect();
        newest_first(&mut teachers, |u| (u.created_at, u.id));
        Ok(teachers)
    }

    async fn list_teacher_summaries(&self) -> StoreResult<Vec<TeacherSummary>> {
        let teachers = self.list_teachers(TeacherStatus::Approved).await?;
        let tables = self.lock()?;
        Ok(teachers
            .into_iter()
            .map(|user| {
                let course_count =
                    tables.courses.iter().filter(|c| c.teacher_id == user.id).count() as i64;
                let live_count =
                    tables.live_courses.iter().filter(|l| l.teacher_id == user.id).count() as i64;
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
        let mut tables = self.lock()?;
        Ok(tables
            .user_mut(id)
            .filter(|u| u.role == Role::Teacher)
            .map(|u| {
                u.teacher_status = Some(status);
                u.updated_at = Utc::now();
                u.clone()
            }))
    }

    async fn promote_to_teacher(
        &self,
        id: i64,
        application: TeacherApplication,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.lock()?;
        Ok(tables
            .user_mut(id)
            .filter(|u| u.role == Role::Student)
            .map(|u| {
                u.role = Role::Teacher;
                u.teacher_status = Some(TeacherStatus::Pending);
                u.specialization = Some(application.specialization);
                u.bio = Some(application.bio);
                u.updated_at = Utc::now();
                u.clone()
            }))
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.lock()?;
        Ok(tables.user_mut(id).map(|u| {
            if changes.is_empty() {
                return u.clone();
            }
            if let Some(v) = changes.first_name {
                u.first_name = Some(v);
            }
            if let Some(v) = changes.last_name {
                u.last_name = Some(v);
            }
            if let Some(v) = changes.profile_image_url {
                u.profile_image_url = Some(v);
            }
            if let Some(v) = changes.specialization {
                u.specialization = Some(v);
            }
            if let Some(v) = changes.bio {
                u.bio = Some(v);
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<Option<Vec<String>>> {
        let mut tables = self.lock()?;
        if !tables.users.iter().any(|u| u.id == id) {
            return Ok(None);
        }

        let pdf_urls = tables
            .courses
            .iter()
            .filter(|c| c.teacher_id == id)
            .map(|c| c.pdf_url.clone())
            .collect();

        let course_ids: Vec<i64> = tables
            .courses
            .iter()
            .filter(|c| c.teacher_id == id)
            .map(|c| c.id)
            .collect();
        let live_ids: Vec<i64> = tables
            .live_courses
            .iter()
            .filter(|l| l.teacher_id == id)
            .map(|l| l.id)
            .collect();

        tables.users.retain(|u| u.id != id);
        tables.sessions.retain(|s| s.user_id != id);
        tables.courses.retain(|c| c.teacher_id != id);
        tables.live_courses.retain(|l| l.teacher_id != id);
        tables.enrollments.retain(|e| {
            e.student_id != id
                && !e.course_id.is_some_and(|c| course_ids.contains(&c))
                && !e.live_course_id.is_some_and(|l| live_ids.contains(&l))
        });

        Ok(Some(pdf_urls))
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        self.lock()?.sessions.push(session.clone());
        Ok(())
    }

    async fn find_session(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.lock()?.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.lock()?.sessions.retain(|s| s.id != id);
        Ok(())
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let created = Course {
            id: tables.next_id(),
            title: course.title,
            description: course.description,
            subject: course.subject,
            level: course.level,
            pdf_url: course.pdf_url,
            pdf_file_name: course.pdf_file_name,
            thumbnail_url: None,
            teacher_id: course.teacher_id,
            is_published: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.courses.push(created.clone());
        Ok(created)
    }

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(self.lock()?.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> StoreResult<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .lock()?
            .courses
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        newest_first(&mut courses, |c| (c.created_at, c.id));
        Ok(truncate(courses, filter.limit))
    }

    async fn increment_course_views(&self, id: i64) -> StoreResult<Option<Course>> {
        let mut tables = self.lock()?;
        Ok(tables.courses.iter_mut().find(|c| c.id == id).map(|c| {
            c.view_count += 1;
            c.clone()
        }))
    }

    async fn update_course(&self, id: i64, changes: CourseChanges) -> StoreResult<Option<Course>> {
        let mut tables = self.lock()?;
        Ok(tables.courses.iter_mut().find(|c| c.id == id).map(|c| {
            if changes.is_empty() {
                return c.clone();
            }
            if let Some(v) = changes.title {
                c.title = v;
            }
            if let Some(v) = changes.description {
                c.description = v;
            }
            if let Some(v) = changes.subject {
                c.subject = v;
            }
            if let Some(v) = changes.level {
                c.level = v;
            }
            if let Some(v) = changes.is_published {
                c.is_published = v;
            }
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_course(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.courses.len();
        tables.courses.retain(|c| c.id != id);
        tables.enrollments.retain(|e| e.course_id != Some(id));
        Ok(tables.courses.len() < before)
    }

    async fn create_live_course(&self, live: NewLiveCourse) -> StoreResult<LiveCourse> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let created = LiveCourse {
            id: tables.next_id(),
            title: live.title,
            description: live.description,
            subject: live.subject,
            level: live.level,
            teacher_id: live.teacher_id,
            room_id: live.room_id,
            join_url: live.join_url,
            scheduled_at: live.scheduled_at,
            duration: live.duration,
            max_participants: live.max_participants,
            state: LiveState::Scheduled,
            created_at: now,
            updated_at: now,
        };
        tables.live_courses.push(created.clone());
        Ok(created)
    }

    async fn find_live_course(&self, id: i64) -> StoreResult<Option<LiveCourse>> {
        Ok(self.lock()?.live_courses.iter().find(|l| l.id == id).cloned())
    }

    async fn list_live_courses(
        &self,
        filter: &LiveCourseFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<LiveCourse>> {
        let mut lives: Vec<LiveCourse> = self
            .lock()?
            .live_courses
            .iter()
            .filter(|l| filter.matches(l, now))
            .cloned()
            .collect();
        newest_first(&mut lives, |l| (l.scheduled_at, l.id));
        Ok(truncate(lives, filter.limit))
    }

    async fn update_live_course(
        &self,
        id: i64,
        changes: LiveCourseChanges,
    ) -> StoreResult<Option<LiveCourse>> {
        let mut tables = self.lock()?;
        Ok(tables
            .live_courses
            .iter_mut()
            .find(|l| l.id == id && !l.state.is_ended())
            .map(|l| {
                if let Some(v) = changes.title {
                    l.title = v;
                }
                if let Some(v) = changes.description {
                    l.description = Some(v);
                }
                if let Some(v) = changes.subject {
                    l.subject = v;
                }
                if let Some(v) = changes.level {
                    l.level = v;
                }
                if let Some(v) = changes.scheduled_at {
                    l.scheduled_at = v;
                }
                if let Some(v) = changes.duration {
                    l.duration = v;
                }
                l.updated_at = Utc::now();
                l.clone()
            }))
    }

    async fn set_live_state(&self, id: i64, state: LiveState) -> StoreResult<Option<LiveCourse>> {
        let mut tables = self.lock()?;
        Ok(tables
            .live_courses
            .iter_mut()
            .find(|l| l.id == id && !l.state.is_ended())
            .map(|l| {
                l.state = state;
                l.updated_at = Utc::now();
                l.clone()
            }))
    }

    async fn delete_live_course(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.live_courses.len();
        tables.live_courses.retain(|l| l.id != id);
        tables.enrollments.retain(|e| e.live_course_id != Some(id));
        Ok(tables.live_courses.len() < before)
    }

    async fn student_stats(
        &self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<StudentStats> {
        let tables = self.lock()?;
        Ok(StudentStats {
            total_courses: tables.courses.iter().filter(|c| c.is_published).count() as i64,
            upcoming_lives: tables
                .live_courses
                .iter()
                .filter(|l| !l.state.is_ended() && l.scheduled_at >= now)
                .count() as i64,
            study_hours: 0,
            enrolled_courses: tables
                .enrollments
                .iter()
                .filter(|e| e.student_id == student_id)
                .count() as i64,
        })
    }

    async fn teacher_stats(&self, teacher_id: i64) -> StoreResult<TeacherStats> {
        let tables = self.lock()?;
        let own: Vec<&Course> = tables
            .courses
            .iter()
            .filter(|c| c.teacher_id == teacher_id)
            .collect();
        Ok(TeacherStats {
            total_courses: own.len() as i64,
            total_lives: tables
                .live_courses
                .iter()
                .filter(|l| l.teacher_id == teacher_id)
                .count() as i64,
            total_views: own.iter().map(|c| c.view_count).sum(),
            total_students: 0,
        })
    }

    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let tables = self.lock()?;
        let teachers_with = |status: TeacherStatus| {
            tables
                .users
                .iter()
                .filter(|u| u.role == Role::Teacher && u.teacher_status == Some(status))
                .count() as i64
        };
        Ok(AdminStats {
            total_users: tables.users.len() as i64,
            total_teachers: teachers_with(TeacherStatus::Approved),
            pending_teachers: teachers_with(TeacherStatus::Pending),
            total_courses: tables.courses.len() as i64,
            total_lives: tables.live_courses.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::{Level, Subject};

    fn teacher(email: &str) -> NewUser {
        NewUser::registered(email, "hash".into(), "Ada".into(), "Lovelace".into(), Role::Teacher)
    }

    fn course(teacher_id: i64, title: &str) -> NewCourse {
        NewCourse {
            title: title.into(),
            description: "Une description suffisante".into(),
            subject: Subject::Informatique,
            level: Level::Lycee,
            pdf_url: format!("/uploads/{title}.pdf"),
            pdf_file_name: Some(format!("{title}.pdf")),
            teacher_id,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(teacher("ada@example.com")).await.unwrap();
        let err = store.create_user(teacher("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn view_counter_accumulates() {
        let store = MemoryStore::new();
        let t = store.create_user(teacher("ada@example.com")).await.unwrap();
        let c = store.create_course(course(t.id, "algo")).await.unwrap();
        for _ in 0..3 {
            store.increment_course_views(c.id).await.unwrap();
        }
        let c = store.find_course(c.id).await.unwrap().unwrap();
        assert_eq!(c.view_count, 3);
        assert_eq!(store.teacher_stats(t.id).await.unwrap().total_views, 3);
    }

    #[tokio::test]
    async fn ended_sessions_reject_further_writes() {
        let store = MemoryStore::new();
        let t = store.create_user(teacher("ada@example.com")).await.unwrap();
        let live = store
            .create_live_course(NewLiveCourse {
                title: "Révisions".into(),
                description: None,
                subject: Subject::Physique,
                level: Level::Lycee,
                teacher_id: t.id,
                room_id: "room_1".into(),
                join_url: "https://meet.example/room_1".into(),
                scheduled_at: Utc::now(),
                duration: 60,
                max_participants: 100,
            })
            .await
            .unwrap();

        let ended = store.set_live_state(live.id, LiveState::Ended).await.unwrap();
        assert_eq!(ended.unwrap().state, LiveState::Ended);
        assert!(store.set_live_state(live.id, LiveState::Live).await.unwrap().is_none());
        assert!(
            store
                .update_live_course(live.id, LiveCourseChanges::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn deleting_a_teacher_cascades_and_reports_files() {
        let store = MemoryStore::new();
        let t = store.create_user(teacher("ada@example.com")).await.unwrap();
        store.create_course(course(t.id, "algo")).await.unwrap();
        store
            .create_session(&Session::new(t.id, Role::Teacher, chrono::Duration::days(1)))
            .await
            .unwrap();

        let urls = store.delete_user(t.id).await.unwrap().unwrap();
        assert_eq!(urls, vec!["/uploads/algo.pdf".to_string()]);
        assert!(store.list_courses(&CourseFilter::owned_by(t.id)).await.unwrap().is_empty());
        assert!(store.delete_user(t.id).await.unwrap().is_none());
    }

    fn enroll(store: &MemoryStore, student_id: i64, course_id: Option<i64>, live_course_id: Option<i64>) {
        let mut tables = store.lock().unwrap();
        let id = tables.next_id();
        tables.enrollments.push(Enrollment {
            id,
            student_id,
            course_id,
            live_course_id,
            enrolled_at: Utc::now(),
            completed_at: None,
        });
    }

    #[tokio::test]
    async fn deleting_a_teacher_drops_enrollments_on_their_content() {
        let store = MemoryStore::new();
        let t = store.create_user(teacher("ada@example.com")).await.unwrap();
        let other = store.create_user(teacher("grace@example.com")).await.unwrap();
        let student = store
            .create_user(NewUser::registered(
                "eleve@example.com",
                "hash".into(),
                "Léa".into(),
                "Martin".into(),
                Role::Student,
            ))
            .await
            .unwrap();

        let own = store.create_course(course(t.id, "algo")).await.unwrap();
        let kept = store.create_course(course(other.id, "optique")).await.unwrap();
        let live = store
            .create_live_course(NewLiveCourse {
                title: "Révisions".into(),
                description: None,
                subject: Subject::Physique,
                level: Level::Lycee,
                teacher_id: t.id,
                room_id: "room_2".into(),
                join_url: "https://meet.example/room_2".into(),
                scheduled_at: Utc::now(),
                duration: 60,
                max_participants: 100,
            })
            .await
            .unwrap();

        enroll(&store, student.id, Some(own.id), None);
        enroll(&store, student.id, None, Some(live.id));
        enroll(&store, student.id, Some(kept.id), None);
        assert_eq!(store.student_stats(student.id, Utc::now()).await.unwrap().enrolled_courses, 3);

        store.delete_user(t.id).await.unwrap().unwrap();

        let left: Vec<Option<i64>> = store
            .lock()
            .unwrap()
            .enrollments
            .iter()
            .map(|e| e.course_id)
            .collect();
        assert_eq!(left, vec![Some(kept.id)]);
    }

    #[tokio::test]
    async fn limit_truncates_newest_first() {
        let store = MemoryStore::new();
        let t = store.create_user(teacher("ada@example.com")).await.unwrap();
        for title in ["a", "b", "c"] {
            store.create_course(course(t.id, title)).await.unwrap();
        }
        let filter = CourseFilter {
            limit: Some(2),
            ..Default::default()
        };
        let titles: Vec<String> = store
            .list_courses(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["c", "b"]);
    }
}
