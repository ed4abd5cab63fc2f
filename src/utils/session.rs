// src/utils/session.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::user::{Role, TeacherStatus, User},
    state::AppState,
    store::Store,
};

/// Name of the cookie carrying the opaque session id.
pub const SESSION_COOKIE: &str = "sid";

/// The authenticated caller, resolved once per request by `require_auth`
/// and handed to handlers through request extensions.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub session_id: String,
    pub user: User,
}

impl SessionUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(session_id: &str, ttl_days: i64, secure: bool) -> String {
    let max_age = ttl_days * 24 * 60 * 60;
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, session_id, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

pub fn cookie_header(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Extracts the session id from the `Cookie` headers, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolves the session referenced by the request cookies into its user.
///
/// Expired sessions and sessions whose user no longer exists are deleted on the way.
pub async fn load_session_user(
    store: &dyn Store,
    headers: &HeaderMap,
) -> Result<SessionUser, AppError> {
    let session_id = session_id_from_headers(headers)
        .ok_or_else(|| AppError::AuthError("Non authentifié".to_string()))?;

    let session = store
        .find_session(&session_id)
        .await?
        .ok_or_else(|| AppError::AuthError("Non authentifié".to_string()))?;

    if session.is_expired(Utc::now()) {
        store.delete_session(&session.id).await?;
        return Err(AppError::AuthError("Session expirée".to_string()));
    }

    match store.find_user(session.user_id).await? {
        Some(user) => Ok(SessionUser {
            session_id: session.id,
            user,
        }),
        None => {
            tracing::warn!("Session {} points to missing user {}", session.id, session.user_id);
            store.delete_session(&session.id).await?;
            Err(AppError::AuthError("Utilisateur non trouvé".to_string()))
        }
    }
}

/// Teachers must be approved; admins always pass.
pub fn ensure_teacher(user: &User) -> Result<(), AppError> {
    match (user.role, user.teacher_status) {
        (Role::Admin, _) => Ok(()),
        (Role::Teacher, Some(TeacherStatus::Approved)) => Ok(()),
        (Role::Teacher, Some(TeacherStatus::Rejected)) => Err(AppError::Forbidden(
            "Votre demande de professeur a été refusée".to_string(),
        )),
        (Role::Teacher, _) => Err(AppError::Forbidden(
            "Votre compte professeur est en attente de validation".to_string(),
        )),
        (Role::Student, _) => Err(AppError::Forbidden(
            "Accès réservé aux professeurs".to_string(),
        )),
    }
}

pub fn ensure_admin(user: &User) -> Result<(), AppError> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Accès réservé aux administrateurs".to_string(),
        ))
    }
}

/// Content may be changed by its owner or by an admin.
pub fn ensure_can_manage(owner_id: i64, user: &User) -> Result<(), AppError> {
    if user.id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Vous n'êtes pas autorisé à modifier ce contenu".to_string(),
        ))
    }
}

/// Axum Middleware: Authentication.
///
/// Loads the session from the `sid` cookie and injects `SessionUser` into the
/// request extensions. Stale cookies are cleared on the 401 response.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match load_session_user(state.store.as_ref(), req.headers()).await {
        Ok(session_user) => {
            req.extensions_mut().insert(session_user);
            Ok(next.run(req).await)
        }
        Err(err @ AppError::AuthError(_)) if session_id_from_headers(req.headers()).is_some() => {
            let clear = cookie_header(&clear_session_cookie(state.config.production))?;
            Ok(([(header::SET_COOKIE, clear)], err).into_response())
        }
        Err(err) => Err(err),
    }
}

fn session_user(req: &Request<Body>) -> Result<&SessionUser, AppError> {
    req.extensions()
        .get::<SessionUser>()
        .ok_or_else(|| AppError::AuthError("Non authentifié".to_string()))
}

/// Axum Middleware: approved teacher or admin.
///
/// Must be used AFTER `require_auth`.
pub async fn require_teacher(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    ensure_teacher(&session_user(&req)?.user)?;
    Ok(next.run(req).await)
}

/// Axum Middleware: admin only.
///
/// Must be used AFTER `require_auth`.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    ensure_admin(&session_user(&req)?.user)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role, status: Option<TeacherStatus>) -> User {
        let now = Utc::now();
        User {
            id,
            email: format!("u{id}@example.com"),
            password: String::new(),
            first_name: None,
            last_name: None,
            profile_image_url: None,
            role,
            teacher_status: status,
            specialization: None,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", 7, false);
        assert_eq!(cookie, "sid=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800");
        assert!(session_cookie("abc", 7, true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).starts_with("sid=; "));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn session_id_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; sid=xyz; lang=fr"));
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("xyz"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("sid="));
        assert_eq!(session_id_from_headers(&empty), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn teacher_gate() {
        assert!(ensure_teacher(&user(1, Role::Admin, None)).is_ok());
        assert!(ensure_teacher(&user(1, Role::Teacher, Some(TeacherStatus::Approved))).is_ok());
        assert!(matches!(
            ensure_teacher(&user(1, Role::Teacher, Some(TeacherStatus::Pending))),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_teacher(&user(1, Role::Teacher, Some(TeacherStatus::Rejected))),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_teacher(&user(1, Role::Student, None)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_gate_is_exact() {
        assert!(ensure_admin(&user(1, Role::Admin, None)).is_ok());
        assert!(ensure_admin(&user(1, Role::Teacher, Some(TeacherStatus::Approved))).is_err());
        assert!(ensure_admin(&user(1, Role::Student, None)).is_err());
    }

    #[test]
    fn owner_or_admin_may_manage() {
        let owner = user(5, Role::Teacher, Some(TeacherStatus::Approved));
        let other = user(6, Role::Teacher, Some(TeacherStatus::Approved));
        let admin = user(7, Role::Admin, None);
        assert!(ensure_can_manage(5, &owner).is_ok());
        assert!(ensure_can_manage(5, &admin).is_ok());
        assert!(matches!(ensure_can_manage(5, &other), Err(AppError::Forbidden(_))));
    }
}
