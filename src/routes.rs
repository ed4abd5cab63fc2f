// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, course, files, live_course, stats, teachers},
    state::AppState,
    utils::session::{require_admin, require_auth, require_teacher},
};

/// Room left for the text fields that travel with the PDF in a course upload.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Assembles the main application router.
///
/// * Public routes: catalogue, live listings, teacher directory, register/login/logout.
/// * Session routes, then approved-teacher routes, then admin routes, each behind
///   the matching middleware stack.
/// * `/uploads` serves stored PDFs inline.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let public_routes = Router::new()
        .route("/health", get(files::health))
        .route("/courses", get(course::list_courses))
        .route("/courses/{id}", get(course::get_course))
        .route("/live-courses", get(live_course::list_live_courses))
        .route("/live-courses/{id}", get(live_course::get_live_course))
        .route("/teachers", get(teachers::list_teachers));

    let session_routes = Router::new()
        .route(
            "/auth/user",
            get(auth::current_user).put(auth::update_profile),
        )
        .route("/become-teacher", post(auth::become_teacher))
        .route("/stats/student", get(stats::student_stats))
        .route("/download/{filename}", get(files::download))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // Auth first, then the approved-teacher check (admins pass too).
    let teacher_routes = Router::new()
        .route(
            "/courses",
            post(course::create_course).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/courses/{id}",
            put(course::update_course).delete(course::delete_course),
        )
        .route("/live-courses", post(live_course::create_live_course))
        .route(
            "/live-courses/{id}",
            put(live_course::update_live_course).delete(live_course::delete_live_course),
        )
        .route("/live-courses/{id}/start", post(live_course::start_live_course))
        .route("/live-courses/{id}/end", post(live_course::end_live_course))
        .route("/teacher/courses", get(course::my_courses))
        .route("/teacher/live-courses", get(live_course::my_live_courses))
        .route("/stats/teacher", get(stats::teacher_stats))
        .route_layer(middleware::from_fn(require_teacher))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/courses", get(admin::list_courses))
        .route("/live-courses", get(admin::list_live_courses))
        .route("/pending-teachers", get(admin::pending_teachers))
        .route("/teachers/{id}/approve", post(admin::approve_teacher))
        .route("/teachers/{id}/reject", post(admin::reject_teacher))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_stats_routes = Router::new()
        .route("/stats/admin", get(stats::admin_stats))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(public_routes)
        .merge(session_routes)
        .merge(teacher_routes)
        .merge(admin_stats_routes);

    let uploads = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/pdf"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("inline"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .service(ServeDir::new(state.files.dir()));

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
