// src/seed.rs

use crate::{
    config::Config,
    error::AppError,
    models::user::{NewUser, normalize_email},
    store::Store,
    utils::hash::hash_password,
};

/// Creates the bootstrap administrator from `ADMIN_EMAIL` / `ADMIN_PASSWORD`
/// unless an account with that email already exists. This is the only way an
/// admin account comes into being.
pub async fn ensure_admin(store: &dyn Store, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        tracing::info!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin seed.");
        return Ok(());
    };

    if store.find_user_by_email(&normalize_email(email)).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let hashed_password = hash_password(password)?;
    store.create_user(NewUser::admin(email, hashed_password)).await?;
    tracing::info!("Admin user created successfully.");

    Ok(())
}
