// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Duration;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        session::Session,
        user::{
            LoginRequest, NewUser, ProfileChanges, RegisterRequest, Role, TeacherApplication,
            User, normalize_email,
        },
    },
    store::Store,
    utils::{
        hash::{hash_password, verify_password},
        html::clean_optional,
        session::{
            SessionUser, clear_session_cookie, cookie_header, session_cookie,
            session_id_from_headers,
        },
    },
};

/// Opens a server-side session for `user` and returns the cookie header setting it.
async fn start_session(
    store: &dyn Store,
    config: &Config,
    user: &User,
) -> Result<[(header::HeaderName, axum::http::HeaderValue); 1], AppError> {
    let session = Session::new(user.id, user.role, Duration::days(config.session_ttl_days));
    store.create_session(&session).await?;

    let cookie = session_cookie(&session.id, config.session_ttl_days, config.production);
    Ok([(header::SET_COOKIE, cookie_header(&cookie)?)])
}

/// Registers a student or a teacher and logs them in.
///
/// Teachers start out pending until an admin approves them.
/// Admin accounts cannot be self-registered.
pub async fn register(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let role = match Role::parse(payload.role.trim()) {
        Some(Role::Admin) => {
            return Err(AppError::BadRequest(
                "L'inscription en tant qu'administrateur n'est pas autorisée".to_string(),
            ));
        }
        Some(role) => role,
        None => return Err(AppError::BadRequest("Rôle invalide".to_string())),
    };

    let email = normalize_email(&payload.email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Cet email est déjà utilisé".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let user = store
        .create_user(NewUser::registered(
            &email,
            hashed_password,
            payload.first_name.trim().to_string(),
            payload.last_name.trim().to_string(),
            role,
        ))
        .await?;

    tracing::info!("Registered user {} as {}", user.id, role.as_str());

    let cookie = start_session(store.as_ref(), &config, &user).await?;
    Ok((StatusCode::CREATED, cookie, Json(user)))
}

/// Authenticates with email and password.
///
/// Unknown email and wrong password share one message. When the form sends a role
/// hint that does not match the account, the error names the actual role.
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let invalid = || AppError::AuthError("Email ou mot de passe incorrect".to_string());

    let user = store
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    if let Some(hint) = payload.role.as_deref().filter(|r| !r.is_empty()) {
        if hint != user.role.as_str() {
            return Err(AppError::Forbidden(format!(
                "Ce compte est un compte {}. Veuillez sélectionner le bon rôle.",
                user.role.label()
            )));
        }
    }

    let cookie = start_session(store.as_ref(), &config, &user).await?;
    Ok((cookie, Json(user)))
}

/// Destroys the current session, if any, and clears the cookie. Always succeeds.
pub async fn logout(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(session_id) = session_id_from_headers(&headers) {
        store.delete_session(&session_id).await?;
    }

    let clear = cookie_header(&clear_session_cookie(config.production))?;
    Ok((
        [(header::SET_COOKIE, clear)],
        Json(json!({ "message": "Déconnexion réussie" })),
    ))
}

/// Returns the logged-in user.
pub async fn current_user(Extension(session): Extension<SessionUser>) -> impl IntoResponse {
    Json(session.user)
}

/// Profile edit for the logged-in user. Text fields are sanitized.
pub async fn update_profile(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    payload: Result<Json<ProfileChanges>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let changes = ProfileChanges {
        first_name: payload.first_name.map(|s| s.trim().to_string()),
        last_name: payload.last_name.map(|s| s.trim().to_string()),
        profile_image_url: payload.profile_image_url,
        specialization: clean_optional(payload.specialization),
        bio: clean_optional(payload.bio),
    };

    let user = store
        .update_profile(session.id(), changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé".to_string()))?;

    Ok(Json(user))
}

/// A student applies to teach. The account becomes a pending teacher.
pub async fn become_teacher(
    State(store): State<Arc<dyn Store>>,
    Extension(session): Extension<SessionUser>,
    payload: Result<Json<TeacherApplication>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    match session.role() {
        Role::Teacher => return Err(AppError::BadRequest("Vous êtes déjà professeur".to_string())),
        Role::Admin => {
            return Err(AppError::BadRequest(
                "Un administrateur ne peut pas devenir professeur".to_string(),
            ));
        }
        Role::Student => {}
    }

    let Json(payload) = payload?;
    payload.validate()?;

    let application = TeacherApplication {
        specialization: clean_optional(Some(payload.specialization)).unwrap_or_default(),
        bio: clean_optional(Some(payload.bio)).unwrap_or_default(),
    };
    application.validate()?;

    let user = store
        .promote_to_teacher(session.id(), application)
        .await?
        .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé".to_string()))?;

    tracing::info!("User {} applied to become a teacher", user.id);
    Ok(Json(user))
}
