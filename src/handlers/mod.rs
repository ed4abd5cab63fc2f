// src/handlers/mod.rs

use std::collections::HashMap;

use crate::{error::AppError, models::user::User, store::Store};

pub mod admin;
pub mod auth;
pub mod course;
pub mod files;
pub mod live_course;
pub mod stats;
pub mod teachers;

/// Loads the owning teachers of a batch of content in one store call.
pub(crate) async fn teachers_by_id(
    store: &dyn Store,
    teacher_ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, User>, AppError> {
    let mut ids: Vec<i64> = teacher_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    Ok(store
        .find_users(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}
