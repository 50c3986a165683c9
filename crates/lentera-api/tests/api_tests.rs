//! API Integration Tests
//!
//! Note: Tests marked with #[ignore] require a real database connection.
//! To run them, point DATABASE_URL at a migrated database and run:
//! cargo test -- --ignored

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration as DateDuration, Local, NaiveTime};
use lentera_api::auth::{TokenKind, TokenPayload};
use lentera_api::mail::LogMailer;
use lentera_api::state::AppState;
use lentera_api::{create_router, create_router_for_testing, test_state, test_state_with_mailer};
use lentera_core::db::SessionRepository;
use lentera_core::password::hash_password;
use lentera_core::{
    AttendanceRecord, LenteraError, MeetingSessionDraft, MeetingStatus, NewMentor, NewStudent,
    TestimonyDraft, User, UserRole,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

/// Log a user in without touching the database: a live session plus a
/// signed token pair
async fn login_as(state: &Arc<AppState>, user_id: i32, role: UserRole) -> (String, String) {
    let payload = TokenPayload { user_id, role };
    let access = state.jwt.issue(payload, TokenKind::Access).unwrap();
    let refresh = state.jwt.issue(payload, TokenKind::Refresh).unwrap();
    state
        .sessions
        .upsert_session(user_id, &refresh.token)
        .await
        .unwrap();
    (access.token, refresh.token)
}

fn app_with_state() -> (Router, Arc<AppState>) {
    let state = test_state();
    (create_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_root_welcome() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&body).contains("Lentera Cendekia"));
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_reports_each_dependency() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Depends on whether a local database happens to be reachable
    let status = response.status();
    assert!(status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert!(json["ready"].is_boolean());
    assert_eq!(json["checks"]["cache"], true);
    assert_eq!(json["checks"]["storage"], true);
    assert!(json["checks"]["database"].is_boolean());
}

#[tokio::test]
async fn test_metrics_counts_requests() {
    let (app, _state) = app_with_state();

    let _ = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["total_requests"].as_u64().unwrap() >= 2);
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/v1/auth/login"].is_object());
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/api/v1/users/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = create_router_for_testing();

    let mut request = create_json_request("GET", "/api/v1/users/me", None);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Token abc".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_as_access_token() {
    let (app, state) = app_with_state();
    let (_access, refresh) = login_as(&state, 7, UserRole::Admin).await;

    let request = with_bearer(create_json_request("GET", "/api/v1/users", None), &refresh);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session_for_access_token() {
    let (app, state) = app_with_state();
    let (access, _refresh) = login_as(&state, 11, UserRole::User).await;

    let logout = with_bearer(create_json_request("DELETE", "/api/v1/auth/logout", None), &access);
    let response = app.clone().oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.sessions.get_session(11).await.unwrap().is_none());

    // The still-unexpired access token no longer has a session behind it
    let again = with_bearer(create_json_request("DELETE", "/api/v1/auth/logout", None), &access);
    let response = app.oneshot(again).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_superseded_refresh_token_rejected() {
    let (app, state) = app_with_state();
    // Two logins within the same second; the second replaces the session
    let (_, first_refresh) = login_as(&state, 5, UserRole::Mentor).await;
    let (_, second_refresh) = login_as(&state, 5, UserRole::Mentor).await;
    assert_ne!(first_refresh, second_refresh);
    assert!(!state
        .sessions
        .session_exists(5, &first_refresh)
        .await
        .unwrap());
    assert!(state
        .sessions
        .session_exists(5, &second_refresh)
        .await
        .unwrap());

    let response = app
        .oneshot(create_json_request(
            "PUT",
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": first_refresh })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Role Gate Tests
// =============================================================================

#[tokio::test]
async fn test_mentor_cannot_reach_admin_routes() {
    let (app, state) = app_with_state();
    let (access, _) = login_as(&state, 3, UserRole::Mentor).await;

    let request = with_bearer(create_json_request("GET", "/api/v1/users/stats", None), &access);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_student_cannot_schedule_sessions() {
    let (app, state) = app_with_state();
    let (access, _) = login_as(&state, 4, UserRole::User).await;

    let request = with_bearer(
        create_json_request("POST", "/api/v1/meeting-sessions", Some(json!({}))),
        &access,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_cannot_record_mentor_attendance() {
    let (app, state) = app_with_state();
    let (access, _) = login_as(&state, 1, UserRole::Admin).await;

    let request = with_bearer(
        create_json_request("POST", "/api/v1/meeting-sessions/1/mentor-attend", None),
        &access,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[tokio::test]
async fn test_login_validation_errors() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "email": "not-an-email", "password": "" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert!(json["errors"]["email"].is_string());
    assert!(json["errors"]["password"].is_string());
}

#[tokio::test]
async fn test_unparsable_body_rejected() {
    let app = create_router_for_testing();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_create_reports_item_errors() {
    let (app, state) = app_with_state();
    let (access, _) = login_as(&state, 3, UserRole::Mentor).await;

    let request = with_bearer(
        create_json_request(
            "POST",
            "/api/v1/meeting-sessions/bulk",
            Some(json!({
                "sessions": [{
                    "student_id": 2,
                    "mentor_id": 3,
                    "session_date": "2030-01-15",
                    "session_time": "14:30:00",
                    "session_duration": 0,
                    "session_type": "online",
                    "session_topic": "Algebra"
                }]
            })),
        ),
        &access,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["errors"]["sessions[0].session_duration"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/api/v1/nothing-here", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Database-backed Tests
// =============================================================================

#[tokio::test]
#[ignore = "requires database"]
async fn test_public_blog_list() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/api/v1/blogs", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert!(json["data"].is_array());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_with_unknown_email() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "email": "nobody@example.com", "password": "whatever123" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_missing_meeting_session_is_404() {
    let (app, state) = app_with_state();
    let (access, _) = login_as(&state, 1, UserRole::Admin).await;

    let request = with_bearer(
        create_json_request("GET", "/api/v1/meeting-sessions/999999", None),
        &access,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Router and state over a migrated database, with every sent email kept
async fn migrated_app() -> (Router, Arc<AppState>, Arc<LogMailer>) {
    let mailer = Arc::new(LogMailer::new());
    let state = test_state_with_mailer(mailer.clone());
    lentera_core::db::migrate(&state.db).await.unwrap();
    (create_router(state.clone()), state, mailer)
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}

async fn create_admin(state: &Arc<AppState>, password: &str) -> User {
    let hash = hash_password(password).unwrap();
    state
        .users()
        .create_admin("Test Admin", &unique_email("admin"), &hash)
        .await
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

fn lists_id(json: &Value, id: &Value) -> bool {
    json["data"]
        .as_array()
        .map(|items| items.iter().any(|item| item["id"] == *id))
        .unwrap_or(false)
}

/// Token from the newest `/<path>?token=` link mailed to `to`
async fn mailed_token(mailer: &LogMailer, to: &str, path: &str) -> String {
    let marker = format!("/{path}?token=");
    for _ in 0..100 {
        let found = mailer.sent().iter().rev().filter(|e| e.to == to).find_map(|e| {
            let start = e.text_body.find(&marker)? + marker.len();
            Some(
                e.text_body[start..]
                    .chars()
                    .take_while(|c| c.is_ascii_hexdigit())
                    .collect::<String>(),
            )
        });
        if let Some(token) = found {
            return token;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no {path} email delivered to {to}");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_then_refresh_issues_new_pair() {
    let (app, state, _) = migrated_app().await;
    let admin = create_admin(&state, "admin-password").await;

    let (status, json) = login(&app, &admin.email, "admin-password").await;
    assert_eq!(status, StatusCode::OK);
    let first_access = json["data"]["access_token"].as_str().unwrap().to_string();
    let first_refresh = json["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        create_json_request(
            "PUT",
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": first_refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_access = json["data"]["access_token"].as_str().unwrap();
    let second_refresh = json["data"]["refresh_token"].as_str().unwrap();
    assert_ne!(second_access, first_access);
    assert_ne!(second_refresh, first_refresh);

    // The exchanged refresh token is spent
    let (status, _) = send(
        &app,
        create_json_request(
            "PUT",
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": first_refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_second_login_supersedes_first_refresh_token() {
    let (app, state, _) = migrated_app().await;
    let admin = create_admin(&state, "admin-password").await;

    let (_, first) = login(&app, &admin.email, "admin-password").await;
    let (_, second) = login(&app, &admin.email, "admin-password").await;
    let first_refresh = first["data"]["refresh_token"].as_str().unwrap();
    let second_refresh = second["data"]["refresh_token"].as_str().unwrap();
    assert_ne!(first_refresh, second_refresh);

    let (status, _) = send(
        &app,
        create_json_request(
            "PUT",
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": first_refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        create_json_request(
            "PUT",
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": second_refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_mentor_lists_meeting_sessions() {
    let (app, state, _) = migrated_app().await;
    let (access, _) = login_as(&state, 3, UserRole::Mentor).await;

    let (status, json) = send(
        &app,
        with_bearer(create_json_request("GET", "/api/v1/meeting-sessions", None), &access),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].is_array());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_soft_deleted_class_hidden_until_restored() {
    let (app, state, _) = migrated_app().await;
    let admin = create_admin(&state, "admin-password").await;
    let (access, _) = login_as(&state, admin.id, UserRole::Admin).await;
    let authed = |method: &str, uri: &str, body: Option<Value>| {
        with_bearer(create_json_request(method, uri, body), &access)
    };

    let classname = format!("Kelas {}", uuid::Uuid::new_v4().simple());
    let (status, json) = send(
        &app,
        authed("POST", "/api/v1/classes", Some(json!({ "classname": classname }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["data"]["id"].clone();
    let uri = format!("/api/v1/classes/{}", id.as_str().unwrap());

    let (status, _) = send(&app, authed("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, authed("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = send(&app, authed("GET", "/api/v1/classes", None)).await;
    assert!(!lists_id(&list, &id));

    let (status, _) = send(&app, authed("PATCH", &format!("{uri}/restore"), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = send(&app, authed("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["classname"], classname.as_str());
    let (_, list) = send(&app, authed("GET", "/api/v1/classes", None)).await;
    assert!(lists_id(&list, &id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_soft_deleted_blog_hidden_until_restored() {
    let (app, state, _) = migrated_app().await;
    let admin = create_admin(&state, "admin-password").await;
    let (access, _) = login_as(&state, admin.id, UserRole::Admin).await;

    let (status, json) = send(
        &app,
        with_bearer(
            create_json_request(
                "POST",
                "/api/v1/blogs",
                Some(json!({ "title": "Tips belajar", "content": "Belajar sedikit setiap hari." })),
            ),
            &access,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["data"]["id"].clone();
    let uri = format!("/api/v1/blogs/{id}");

    let (status, _) = send(&app, with_bearer(create_json_request("DELETE", &uri, None), &access)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, create_json_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = send(&app, create_json_request("GET", "/api/v1/blogs", None)).await;
    assert!(!lists_id(&list, &id));

    let (status, _) = send(
        &app,
        with_bearer(create_json_request("PATCH", &format!("{uri}/restore"), None), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, create_json_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = send(&app, create_json_request("GET", "/api/v1/blogs", None)).await;
    assert!(lists_id(&list, &id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_soft_deleted_testimony_hidden_until_restored() {
    let (app, state, _) = migrated_app().await;
    let admin = create_admin(&state, "admin-password").await;
    let (access, _) = login_as(&state, admin.id, UserRole::Admin).await;

    let testimony = state
        .testimonies()
        .create(
            &TestimonyDraft {
                testimoner_name: "Dewi".to_string(),
                testimoner_current_position: "Mahasiswa".to_string(),
                testimoner_previous_position: "Siswa SMA".to_string(),
                testimony_text: "Mentornya sabar dan jelas.".to_string(),
            },
            None,
        )
        .await
        .unwrap();
    let id = json!(testimony.id);
    let uri = format!("/api/v1/testimonies/{}", testimony.id);

    let (status, _) = send(&app, with_bearer(create_json_request("DELETE", &uri, None), &access)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, create_json_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = send(&app, create_json_request("GET", "/api/v1/testimonies", None)).await;
    assert!(!lists_id(&list, &id));

    let (status, _) = send(
        &app,
        with_bearer(create_json_request("PATCH", &format!("{uri}/restore"), None), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, create_json_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = send(&app, create_json_request("GET", "/api/v1/testimonies", None)).await;
    assert!(lists_id(&list, &id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_attendance_recorded_once_and_only_while_scheduled() {
    let (_app, state, _) = migrated_app().await;
    let class = state
        .classes()
        .create(&format!("Kelas {}", uuid::Uuid::new_v4().simple()))
        .await
        .unwrap();
    let student = state
        .users()
        .create_student(&NewStudent {
            name: "Sari".to_string(),
            email: unique_email("student"),
            class_id: class.id,
            total_sessions: 8,
        })
        .await
        .unwrap();
    let mentor = state
        .users()
        .create_mentor(&NewMentor {
            name: "Bima".to_string(),
            email: unique_email("mentor"),
            class_ids: vec![class.id],
        })
        .await
        .unwrap();

    let sessions = state.meeting_sessions();
    let session = sessions
        .create(&MeetingSessionDraft {
            student_id: student.id,
            mentor_id: mentor.id,
            session_date: Local::now().date_naive() + DateDuration::days(7),
            session_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            session_duration: 90,
            session_type: "online".to_string(),
            session_topic: "Algebra".to_string(),
            session_description: None,
        })
        .await
        .unwrap();
    assert_eq!(session.session_status, MeetingStatus::Scheduled);

    let record = AttendanceRecord::Student {
        session_proof: "meeting_sessions/PROOF_1.png".to_string(),
        attendance_proof: "meeting_sessions/ATTENDANCE_1.png".to_string(),
    };
    let attended = sessions
        .record_attendance(session.id, student.id, &record)
        .await
        .unwrap();
    assert!(attended.is_student_attended);

    let again = sessions.record_attendance(session.id, student.id, &record).await;
    assert!(matches!(again, Err(LenteraError::Conflict(_))));

    sessions
        .set_status(session.id, MeetingStatus::Cancelled)
        .await
        .unwrap();
    let mentor_record = AttendanceRecord::Mentor {
        attendance_proof: "meeting_sessions/MENTOR_1.png".to_string(),
        feedback: None,
    };
    let late = sessions
        .record_attendance(session.id, mentor.id, &mentor_record)
        .await;
    assert!(matches!(late, Err(LenteraError::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_student_onboarding_and_password_reset() {
    let (app, state, mailer) = migrated_app().await;
    let admin = create_admin(&state, "admin-password").await;
    let (_, json) = login(&app, &admin.email, "admin-password").await;
    let admin_access = json["data"]["access_token"].as_str().unwrap().to_string();
    let class = state
        .classes()
        .create(&format!("Kelas {}", uuid::Uuid::new_v4().simple()))
        .await
        .unwrap();

    // Admin creates an inactive, unverified student
    let email = unique_email("student");
    let (status, json) = send(
        &app,
        with_bearer(
            create_json_request(
                "POST",
                "/api/v1/users",
                Some(json!({
                    "name": "Sari",
                    "email": email,
                    "class_id": class.id,
                    "total_sessions": 8
                })),
            ),
            &admin_access,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["user"]["is_active"], false);

    let reset_request = || {
        create_json_request(
            "POST",
            "/api/v1/auth/password-reset",
            Some(json!({ "email": email })),
        )
    };

    // Unverified accounts cannot reset
    let (status, _) = send(&app, reset_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let activation = mailed_token(&mailer, &email, "activate").await;
    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/users/activate",
            Some(json!({
                "token": activation,
                "password": "first-password",
                "password_confirmation": "first-password"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let student = state.users().find_by_email(&email).await.unwrap().unwrap();
    assert!(student.is_active);
    assert!(student.is_verified());

    let (status, _) = send(&app, reset_request()).await;
    assert_eq!(status, StatusCode::OK);
    let reset = mailed_token(&mailer, &email, "reset-password").await;

    let confirm = || {
        create_json_request(
            "PUT",
            "/api/v1/auth/password-reset",
            Some(json!({
                "token": reset,
                "password": "second-password",
                "password_confirmation": "second-password"
            })),
        )
    };
    let (status, _) = send(&app, confirm()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, confirm()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = login(&app, &email, "second-password").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&app, &email, "first-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
