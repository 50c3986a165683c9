//! OpenAPI document served at `/api-docs/openapi.json`

use crate::auth::service::{
    AccountStatus, ActivateAccountRequest, AuthResponse, ChangePasswordRequest, EmailRequest,
    LoginRequest, RefreshRequest, ResetPasswordRequest, TokenRequest,
};
use crate::auth::TokenPurpose;
use crate::error::{ApiError, ResponseStatus};
use crate::handlers::{
    auth, blogs, classes, health, meeting_sessions, static_assets, testimonies, users,
};
use lentera_core::{
    Blog, Class, ClassOption, Enrollment, MeetingSession, MeetingStatus, MentorOption, StaticAsset,
    StudentOption, StudentPlan, Testimony, User, UserRole, UserStats, UserSummary,
};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lentera Cendekia API",
        description = "Tutoring platform backend: accounts, classes, meeting sessions and site content"
    ),
    paths(
        health::health_check,
        health::readiness_check,
        health::metrics,
        auth::login_handler,
        auth::admin_login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        auth::verify_account_handler,
        auth::verify_token_handler,
        auth::request_password_reset_handler,
        auth::reset_password_handler,
        users::create_student,
        users::create_mentor,
        users::activate_account,
        users::verify_email,
        users::list_users,
        users::user_stats,
        users::student_dropdown,
        users::mentor_dropdown,
        users::get_me,
        users::update_me,
        users::change_password,
        users::my_classes,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::force_activate,
        users::get_plan,
        users::update_plan,
        classes::create_class,
        classes::list_classes,
        classes::class_dropdown,
        classes::get_class,
        classes::update_class,
        classes::delete_class,
        classes::restore_class,
        meeting_sessions::create_session,
        meeting_sessions::bulk_create_sessions,
        meeting_sessions::bulk_update_sessions,
        meeting_sessions::list_sessions,
        meeting_sessions::my_sessions,
        meeting_sessions::get_session,
        meeting_sessions::update_session,
        meeting_sessions::delete_session,
        meeting_sessions::update_status,
        meeting_sessions::student_attend,
        meeting_sessions::mentor_attend,
        blogs::create_blog,
        blogs::list_blogs,
        blogs::get_blog,
        blogs::update_blog,
        blogs::delete_blog,
        blogs::restore_blog,
        testimonies::create_testimony,
        testimonies::list_testimonies,
        testimonies::get_testimony,
        testimonies::update_testimony,
        testimonies::delete_testimony,
        testimonies::restore_testimony,
        static_assets::create_static_asset,
        static_assets::list_static_assets,
        static_assets::get_static_asset,
        static_assets::update_static_asset,
        static_assets::delete_static_asset,
        static_assets::restore_static_asset,
    ),
    components(schemas(
        ApiError,
        ResponseStatus,
        health::HealthResponse,
        health::ReadinessResponse,
        health::ReadinessChecks,
        health::MetricsResponse,
        LoginRequest,
        RefreshRequest,
        ActivateAccountRequest,
        TokenRequest,
        EmailRequest,
        ResetPasswordRequest,
        ChangePasswordRequest,
        AuthResponse,
        AccountStatus,
        TokenPurpose,
        auth::TokenStatus,
        users::CreateStudentRequest,
        users::CreateMentorRequest,
        users::UpdateProfileRequest,
        users::UpdateUserRequest,
        users::UpdatePlanRequest,
        users::CreatedStudent,
        users::CreatedMentor,
        classes::ClassRequest,
        meeting_sessions::MeetingSessionRequest,
        meeting_sessions::BulkCreateRequest,
        meeting_sessions::MeetingSessionPatch,
        meeting_sessions::BulkUpdateRequest,
        meeting_sessions::StatusRequest,
        blogs::CreateBlogRequest,
        blogs::UpdateBlogRequest,
        static_assets::UpdateStaticAssetRequest,
        User,
        UserRole,
        UserSummary,
        UserStats,
        StudentOption,
        MentorOption,
        StudentPlan,
        Class,
        ClassOption,
        Enrollment,
        MeetingSession,
        MeetingStatus,
        Blog,
        Testimony,
        StaticAsset,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness, readiness and counters"),
        (name = "auth", description = "Login, tokens and password reset"),
        (name = "users", description = "Accounts, profiles and student plans"),
        (name = "classes", description = "Classes"),
        (name = "meeting-sessions", description = "Scheduling and attendance"),
        (name = "blogs", description = "Blog posts"),
        (name = "testimonies", description = "Testimonies"),
        (name = "static-assets", description = "Site images"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_protected_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/v1/meeting-sessions/{id}/student-attend"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
