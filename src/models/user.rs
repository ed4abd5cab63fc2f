// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Account role. Stored as the Postgres enum `user_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// French label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Role::Student => "étudiant",
            Role::Teacher => "professeur",
            Role::Admin => "administrateur",
        }
    }

    /// Teacher status a freshly created account of this role starts with.
    /// Only teachers carry one.
    pub fn initial_teacher_status(self) -> Option<TeacherStatus> {
        match self {
            Role::Teacher => Some(TeacherStatus::Pending),
            Role::Student | Role::Admin => None,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Approval state of a teacher account. Stored as the Postgres enum `teacher_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "teacher_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeacherStatus {
    Pending,
    Approved,
    Rejected,
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique, stored lowercased.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,

    pub role: Role,

    /// Set if and only if `role` is `Teacher`.
    pub teacher_status: Option<TeacherStatus>,

    pub specialization: Option<String>,
    pub bio: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Insert payload for the users table. Built only through the constructors below
/// so the role/teacher-status pairing always holds.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub teacher_status: Option<TeacherStatus>,
}

impl NewUser {
    /// A self-registered account. Callers must have rejected `Role::Admin` already.
    pub fn registered(
        email: &str,
        password_hash: String,
        first_name: String,
        last_name: String,
        role: Role,
    ) -> Self {
        Self {
            email: normalize_email(email),
            password_hash,
            first_name,
            last_name,
            role,
            teacher_status: role.initial_teacher_status(),
        }
    }

    /// The bootstrap administrator.
    pub fn admin(email: &str, password_hash: String) -> Self {
        Self {
            email: normalize_email(email),
            password_hash,
            first_name: "Admin".to_string(),
            last_name: "Principal".to_string(),
            role: Role::Admin,
            teacher_status: None,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Approved teacher with content counts, as listed on the public teachers page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    #[serde(flatten)]
    pub user: User,
    pub course_count: i64,
    pub live_count: i64,
}

/// Fields a student fills in when applying to teach.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeacherApplication {
    #[validate(length(min = 2, max = 120, message = "La spécialisation est requise"))]
    #[serde(default)]
    pub specialization: String,

    #[validate(length(
        min = 10,
        max = 2000,
        message = "La bio doit contenir au moins 10 caractères"
    ))]
    #[serde(default)]
    pub bio: String,
}

/// DTO for profile edits. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[validate(length(min = 2, max = 80, message = "Le prénom doit contenir au moins 2 caractères"))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 80, message = "Le nom doit contenir au moins 2 caractères"))]
    pub last_name: Option<String>,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub profile_image_url: Option<String>,

    #[validate(length(min = 2, max = 120))]
    pub specialization: Option<String>,

    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.profile_image_url.is_none()
            && self.specialization.is_none()
            && self.bio.is_none()
    }
}

/// Validates that a string is a correctly formatted absolute URL.
fn validate_url_string(raw: &str) -> Result<(), validator::ValidationError> {
    match url::Url::parse(raw) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_url")
            .with_message("URL d'image invalide".into())),
    }
}

/// DTO for registration. Missing fields deserialize to empty strings so the
/// "all fields required" check produces a 400 instead of a body rejection.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Tous les champs sont requis"),
        email(message = "Email invalide")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(
        min = 6,
        max = 128,
        message = "Le mot de passe doit contenir au moins 6 caractères"
    ))]
    pub password: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 80, message = "Tous les champs sont requis"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 80, message = "Tous les champs sont requis"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Tous les champs sont requis"))]
    pub role: String,
}

/// DTO for login. `role` is the optional role hint chosen on the login form.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 254, message = "Email et mot de passe requis"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Email et mot de passe requis"))]
    pub password: String,

    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_teachers_start_with_a_status() {
        assert_eq!(Role::Teacher.initial_teacher_status(), Some(TeacherStatus::Pending));
        assert_eq!(Role::Student.initial_teacher_status(), None);
        assert_eq!(Role::Admin.initial_teacher_status(), None);
    }

    #[test]
    fn registered_users_get_normalized_email_and_matching_status() {
        let user = NewUser::registered(
            "  Alice@Example.COM ",
            "hash".into(),
            "Alice".into(),
            "Martin".into(),
            Role::Teacher,
        );
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.teacher_status, Some(TeacherStatus::Pending));

        let admin = NewUser::admin("root@example.com", "hash".into());
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.teacher_status.is_none());
    }

    #[test]
    fn roles_parse_from_their_wire_names() {
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn register_request_requires_every_field() {
        let req: RegisterRequest =
            serde_json::from_value(serde_json::json!({ "email": "a@b.fr" })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn profile_image_must_be_http_url() {
        let bad = ProfileChanges {
            profile_image_url: Some("javascript:alert(1)".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let good = ProfileChanges {
            profile_image_url: Some("https://cdn.example.com/me.png".into()),
            ..Default::default()
        };
        assert!(good.validate().is_ok());
    }
}
