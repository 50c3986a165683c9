//! API route definitions
//!
//! Routes are grouped by who may call them. Each role group carries its own
//! `require_roles` gate, and every non-public group sits behind
//! `auth_middleware`.

use crate::auth::{auth_middleware, require_roles};
use crate::handlers::{
    auth, blogs, classes, health, meeting_sessions, static_assets, testimonies, users,
};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use lentera_core::UserRole;
use std::sync::Arc;

const ADMIN: &[UserRole] = &[UserRole::Admin];
const STAFF: &[UserRole] = &[UserRole::Admin, UserRole::Mentor];
const STUDENT: &[UserRole] = &[UserRole::User];
const MENTOR: &[UserRole] = &[UserRole::Mentor];

/// Health endpoints served outside the API prefix
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
}

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/admin/login", post(auth::admin_login_handler))
        .route("/auth/refresh", put(auth::refresh_handler))
        .route("/auth/verify-account", post(auth::verify_account_handler))
        .route("/auth/verify-token", post(auth::verify_token_handler))
        .route(
            "/auth/password-reset",
            post(auth::request_password_reset_handler).put(auth::reset_password_handler),
        )
        .route("/users/activate", post(users::activate_account))
        .route("/users/verify-email", post(users::verify_email))
        .route("/blogs", get(blogs::list_blogs))
        .route("/blogs/:id", get(blogs::get_blog))
        .route("/testimonies", get(testimonies::list_testimonies))
        .route("/testimonies/:id", get(testimonies::get_testimony))
        .route("/static-assets", get(static_assets::list_static_assets))
        .route("/static-assets/:id", get(static_assets::get_static_asset));

    // Any logged-in user
    let authenticated_routes = Router::new()
        .route("/auth/logout", delete(auth::logout_handler))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .route("/users/me/password", put(users::change_password))
        .route("/users/me/classes", get(users::my_classes))
        .route("/classes", get(classes::list_classes))
        .route("/classes/dropdown", get(classes::class_dropdown))
        .route("/classes/:id", get(classes::get_class))
        .route("/meeting-sessions/me", get(meeting_sessions::my_sessions))
        .route("/meeting-sessions/:id", get(meeting_sessions::get_session));

    let admin_routes = Router::new()
        .route("/users", post(users::create_student).get(users::list_users))
        .route("/users/mentors", post(users::create_mentor))
        .route("/users/stats", get(users::user_stats))
        .route("/users/students/dropdown", get(users::student_dropdown))
        .route("/users/mentors/dropdown", get(users::mentor_dropdown))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/activate", patch(users::force_activate))
        .route("/users/:id/plan", get(users::get_plan).put(users::update_plan))
        .route("/classes", post(classes::create_class))
        .route(
            "/classes/:id",
            put(classes::update_class).delete(classes::delete_class),
        )
        .route("/classes/:id/restore", patch(classes::restore_class))
        .route("/blogs/:id/restore", patch(blogs::restore_blog))
        .route("/testimonies", post(testimonies::create_testimony))
        .route(
            "/testimonies/:id",
            put(testimonies::update_testimony).delete(testimonies::delete_testimony),
        )
        .route("/testimonies/:id/restore", patch(testimonies::restore_testimony))
        .route("/static-assets", post(static_assets::create_static_asset))
        .route(
            "/static-assets/:id",
            put(static_assets::update_static_asset).delete(static_assets::delete_static_asset),
        )
        .route(
            "/static-assets/:id/restore",
            patch(static_assets::restore_static_asset),
        )
        .route_layer(middleware::from_fn(require_roles(ADMIN)));

    // Admins and mentors
    let staff_routes = Router::new()
        .route(
            "/meeting-sessions",
            post(meeting_sessions::create_session).get(meeting_sessions::list_sessions),
        )
        .route(
            "/meeting-sessions/bulk",
            post(meeting_sessions::bulk_create_sessions)
                .put(meeting_sessions::bulk_update_sessions),
        )
        .route(
            "/meeting-sessions/:id",
            put(meeting_sessions::update_session).delete(meeting_sessions::delete_session),
        )
        .route(
            "/meeting-sessions/:id/status",
            patch(meeting_sessions::update_status),
        )
        .route("/blogs", post(blogs::create_blog))
        .route("/blogs/:id", put(blogs::update_blog).delete(blogs::delete_blog))
        .route_layer(middleware::from_fn(require_roles(STAFF)));

    let student_routes = Router::new()
        .route(
            "/meeting-sessions/:id/student-attend",
            post(meeting_sessions::student_attend),
        )
        .route_layer(middleware::from_fn(require_roles(STUDENT)));

    let mentor_routes = Router::new()
        .route(
            "/meeting-sessions/:id/mentor-attend",
            post(meeting_sessions::mentor_attend),
        )
        .route_layer(middleware::from_fn(require_roles(MENTOR)));

    let protected_routes = Router::new()
        .merge(authenticated_routes)
        .merge(admin_routes)
        .merge(staff_routes)
        .merge(student_routes)
        .merge(mentor_routes)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
