// src/models/stats.rs

use serde::Serialize;

/// Student dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    /// Published courses in the catalogue.
    pub total_courses: i64,
    /// Non-ended sessions scheduled from now on.
    pub upcoming_lives: i64,
    /// Not tracked yet, always 0.
    pub study_hours: i64,
    pub enrolled_courses: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherStats {
    pub total_courses: i64,
    pub total_lives: i64,
    /// Sum of `viewCount` over the teacher's courses.
    pub total_views: i64,
    /// Not tracked yet, always 0.
    pub total_students: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    /// Approved teachers only.
    pub total_teachers: i64,
    pub pending_teachers: i64,
    pub total_courses: i64,
    pub total_lives: i64,
}
