// src/models/session.rs

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::Role;

/// Represents the 'sessions' table: a server-side login session keyed by the
/// opaque id carried in the `sid` cookie.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub user_role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64, user_role: Role, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            user_role,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_sessions_have_unique_ids_and_expire_after_ttl() {
        let a = Session::new(1, Role::Student, Duration::days(7));
        let b = Session::new(1, Role::Student, Duration::days(7));
        assert_ne!(a.id, b.id);
        assert!(!a.is_expired(Utc::now()));
        assert!(a.is_expired(Utc::now() + Duration::days(8)));
    }
}
