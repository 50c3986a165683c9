//! Meeting session handlers
//!
//! Admins and mentors schedule sessions, singly or in bulk. Each
//! participant records attendance once, with photo proof, while the session
//! is still scheduled and has not started.

use crate::auth::AuthenticatedUser;
use crate::error::{created, done, ok, AppError};
use crate::state::AppState;
use crate::storage::{self, MultipartForm, UploadPolicy};
use crate::validation::ValidJson;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Extension,
};
use chrono::{Local, NaiveDate, NaiveTime};
use lentera_core::{
    AttendanceRecord, MeetingSession, MeetingSessionChanges, MeetingSessionDraft, MeetingStatus,
    Participant, UserRole,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

/// A session to create or fully replace
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct MeetingSessionRequest {
    /// User ID of the student
    pub student_id: i32,
    pub mentor_id: i32,
    pub session_date: NaiveDate,
    #[schema(value_type = String, example = "14:30:00")]
    pub session_time: NaiveTime,
    /// Minutes
    #[validate(range(min = 1, max = 480, message = "Duration must be 1-480 minutes"))]
    pub session_duration: i32,
    #[validate(length(min = 1, max = 50, message = "Session type must be 1-50 characters"))]
    pub session_type: String,
    #[validate(length(min = 1, max = 255, message = "Topic must be 1-255 characters"))]
    pub session_topic: String,
    pub session_description: Option<String>,
}

impl From<MeetingSessionRequest> for MeetingSessionDraft {
    fn from(r: MeetingSessionRequest) -> Self {
        MeetingSessionDraft {
            student_id: r.student_id,
            mentor_id: r.mentor_id,
            session_date: r.session_date,
            session_time: r.session_time,
            session_duration: r.session_duration,
            session_type: r.session_type.trim().to_string(),
            session_topic: r.session_topic.trim().to_string(),
            session_description: r.session_description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BulkCreateRequest {
    #[validate(length(min = 1, max = 100, message = "Between 1 and 100 sessions"), nested)]
    pub sessions: Vec<MeetingSessionRequest>,
}

/// Partial edit of one session inside a bulk update
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct MeetingSessionPatch {
    pub id: i32,
    pub session_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub session_time: Option<NaiveTime>,
    #[validate(range(min = 1, max = 480, message = "Duration must be 1-480 minutes"))]
    pub session_duration: Option<i32>,
    #[validate(length(min = 1, max = 50, message = "Session type must be 1-50 characters"))]
    pub session_type: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Topic must be 1-255 characters"))]
    pub session_topic: Option<String>,
    pub session_description: Option<String>,
}

impl MeetingSessionPatch {
    fn into_changes(self) -> (i32, MeetingSessionChanges) {
        (
            self.id,
            MeetingSessionChanges {
                session_date: self.session_date,
                session_time: self.session_time,
                session_duration: self.session_duration,
                session_type: self.session_type.map(|t| t.trim().to_string()),
                session_topic: self.session_topic.map(|t| t.trim().to_string()),
                session_description: self.session_description,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, max = 100, message = "Between 1 and 100 sessions"), nested)]
    pub sessions: Vec<MeetingSessionPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StatusRequest {
    pub status: MeetingStatus,
}

/// Both participants must exist with the right roles
async fn check_participants(state: &AppState, student_id: i32, mentor_id: i32) -> Result<(), AppError> {
    let users = state.users();
    let mut errors = HashMap::new();

    match users.find_by_id(student_id).await? {
        Some(user) if user.role == UserRole::User => {}
        Some(_) => {
            errors.insert("student_id".to_string(), "User is not a student".to_string());
        }
        None => {
            errors.insert("student_id".to_string(), "Student not found".to_string());
        }
    }
    match users.find_by_id(mentor_id).await? {
        Some(user) if user.role == UserRole::Mentor => {}
        Some(_) => {
            errors.insert("mentor_id".to_string(), "User is not a mentor".to_string());
        }
        None => {
            errors.insert("mentor_id".to_string(), "Mentor not found".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Students see their own sessions, mentors and admins see any
fn ensure_visible(user: &AuthenticatedUser, session: &MeetingSession) -> Result<(), AppError> {
    let participant = session.student.id == user.user_id || session.mentor.id == user.user_id;
    if participant || user.has_any_role(&[UserRole::Admin, UserRole::Mentor]) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not assigned to this meeting session".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/meeting-sessions",
    tag = "meeting-sessions",
    request_body = MeetingSessionRequest,
    responses(
        (status = 201, description = "Session scheduled", body = MeetingSession),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<MeetingSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_participants(&state, request.student_id, request.mentor_id).await?;
    let session = state
        .meeting_sessions()
        .create(&MeetingSessionDraft::from(request))
        .await?;

    Ok(created("Meeting session created successfully", session))
}

/// Create many sessions in one transaction
#[utoipa::path(
    post,
    path = "/api/v1/meeting-sessions/bulk",
    tag = "meeting-sessions",
    request_body = BulkCreateRequest,
    responses(
        (status = 201, description = "Sessions scheduled", body = Vec<MeetingSession>),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_create_sessions(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<BulkCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    for session in &request.sessions {
        check_participants(&state, session.student_id, session.mentor_id).await?;
    }

    let drafts: Vec<MeetingSessionDraft> = request
        .sessions
        .into_iter()
        .map(MeetingSessionDraft::from)
        .collect();
    let sessions = state.meeting_sessions().create_many(&drafts).await?;

    info!(count = sessions.len(), "Bulk created meeting sessions");
    Ok(created("Meeting sessions created successfully", sessions))
}

/// Edit many sessions in one transaction; an unknown ID rolls back all
#[utoipa::path(
    put,
    path = "/api/v1/meeting-sessions/bulk",
    tag = "meeting-sessions",
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, description = "Sessions updated", body = Vec<MeetingSession>),
        (status = 404, description = "A session does not exist", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_update_sessions(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<BulkUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updates: Vec<(i32, MeetingSessionChanges)> = request
        .sessions
        .into_iter()
        .map(MeetingSessionPatch::into_changes)
        .collect();
    let sessions = state.meeting_sessions().update_many(&updates).await?;

    Ok(ok("Meeting sessions updated successfully", sessions))
}

#[utoipa::path(
    get,
    path = "/api/v1/meeting-sessions",
    tag = "meeting-sessions",
    responses((status = 200, description = "All sessions", body = Vec<MeetingSession>)),
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.meeting_sessions().list().await?;
    Ok(ok("Successfully retrieved meeting sessions", sessions))
}

/// Sessions where the caller is the student or the mentor
#[utoipa::path(
    get,
    path = "/api/v1/meeting-sessions/me",
    tag = "meeting-sessions",
    responses((status = 200, description = "Own sessions", body = Vec<MeetingSession>)),
    security(("bearer_auth" = []))
)]
pub async fn my_sessions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state
        .meeting_sessions()
        .list_for(user.user_id, user.role)
        .await?;
    Ok(ok("Successfully retrieved meeting sessions", sessions))
}

#[utoipa::path(
    get,
    path = "/api/v1/meeting-sessions/{id}",
    tag = "meeting-sessions",
    params(("id" = i32, Path, description = "Meeting session ID")),
    responses(
        (status = 200, description = "Session", body = MeetingSession),
        (status = 403, description = "Not a participant", body = crate::error::ApiError),
        (status = 404, description = "Session not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.meeting_sessions().get(id).await?;
    ensure_visible(&user, &session)?;

    Ok(ok("Successfully retrieved meeting session", session))
}

#[utoipa::path(
    put,
    path = "/api/v1/meeting-sessions/{id}",
    tag = "meeting-sessions",
    params(("id" = i32, Path, description = "Meeting session ID")),
    request_body = MeetingSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = MeetingSession),
        (status = 404, description = "Session not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<MeetingSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_participants(&state, request.student_id, request.mentor_id).await?;
    let session = state
        .meeting_sessions()
        .update(id, &MeetingSessionDraft::from(request))
        .await?;

    Ok(ok("Meeting session updated successfully", session))
}

#[utoipa::path(
    delete,
    path = "/api/v1/meeting-sessions/{id}",
    tag = "meeting-sessions",
    params(("id" = i32, Path, description = "Meeting session ID")),
    responses(
        (status = 200, description = "Session deleted"),
        (status = 404, description = "Session not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.meeting_sessions().soft_delete(id).await?;
    Ok(done("Meeting session deleted successfully"))
}

/// Move a session along its lifecycle
///
/// `completed` and `cancelled` are final; nothing moves back to `pending`.
#[utoipa::path(
    patch,
    path = "/api/v1/meeting-sessions/{id}/status",
    tag = "meeting-sessions",
    params(("id" = i32, Path, description = "Meeting session ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = MeetingSession),
        (status = 404, description = "Session not found", body = crate::error::ApiError),
        (status = 409, description = "Transition not allowed", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<StatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .meeting_sessions()
        .set_status(id, request.status)
        .await?;

    Ok(ok("Meeting session status updated successfully", session))
}

/// Verify eligibility, upload the proofs and record them
///
/// Proofs already uploaded are removed again if the record does not land.
async fn attend(
    state: &AppState,
    user: AuthenticatedUser,
    id: i32,
    participant: Participant,
    mut form: MultipartForm,
) -> Result<MeetingSession, AppError> {
    let sessions = state.meeting_sessions();
    let session = sessions.get(id).await?;
    session.check_attendance(participant, user.user_id, Local::now().naive_local())?;

    let attendance_file = form.require_file("session_attendance_proof")?;
    let policy = UploadPolicy::MEETING_SESSION;

    let record = match participant {
        Participant::Student => {
            let session_file = form.require_file("session_proof")?;
            policy.check(&session_file)?;
            policy.check(&attendance_file)?;

            let session_proof = storage::upload(state.storage.as_ref(), policy, session_file).await?;
            let attendance_proof =
                match storage::upload(state.storage.as_ref(), policy, attendance_file).await {
                    Ok(key) => key,
                    Err(e) => {
                        storage::remove_quietly(state.storage.as_ref(), &session_proof).await;
                        return Err(e.into());
                    }
                };
            AttendanceRecord::Student {
                session_proof,
                attendance_proof,
            }
        }
        Participant::Mentor => {
            let feedback = form.text("session_feedback").map(str::to_string);
            let attendance_proof =
                storage::upload(state.storage.as_ref(), policy, attendance_file).await?;
            AttendanceRecord::Mentor {
                attendance_proof,
                feedback,
            }
        }
    };

    match sessions.record_attendance(id, user.user_id, &record).await {
        Ok(updated) => {
            info!(session_id = id, user_id = user.user_id, ?participant, "Attendance recorded");
            Ok(updated)
        }
        Err(e) => {
            for key in uploaded_keys(&record) {
                storage::remove_quietly(state.storage.as_ref(), key).await;
            }
            Err(e.into())
        }
    }
}

fn uploaded_keys(record: &AttendanceRecord) -> Vec<&str> {
    match record {
        AttendanceRecord::Student {
            session_proof,
            attendance_proof,
        } => vec![session_proof.as_str(), attendance_proof.as_str()],
        AttendanceRecord::Mentor {
            attendance_proof, ..
        } => vec![attendance_proof.as_str()],
    }
}

/// Student attendance
///
/// Multipart fields `session_proof` and `session_attendance_proof`, images
/// up to 500KB each.
#[utoipa::path(
    post,
    path = "/api/v1/meeting-sessions/{id}/student-attend",
    tag = "meeting-sessions",
    params(("id" = i32, Path, description = "Meeting session ID")),
    request_body(content = String, content_type = "multipart/form-data", description = "session_proof, session_attendance_proof"),
    responses(
        (status = 200, description = "Attendance recorded", body = MeetingSession),
        (status = 403, description = "Not the session's student", body = crate::error::ApiError),
        (status = 409, description = "Not scheduled, already started or already recorded", body = crate::error::ApiError),
        (status = 413, description = "Image too large", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn student_attend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = MultipartForm::collect(multipart).await?;
    let session = attend(&state, user, id, Participant::Student, form).await?;

    Ok(ok("Session attendance proof uploaded successfully", session))
}

/// Mentor attendance
///
/// Multipart field `session_attendance_proof` (image up to 500KB) and an
/// optional `session_feedback` text.
#[utoipa::path(
    post,
    path = "/api/v1/meeting-sessions/{id}/mentor-attend",
    tag = "meeting-sessions",
    params(("id" = i32, Path, description = "Meeting session ID")),
    request_body(content = String, content_type = "multipart/form-data", description = "session_attendance_proof, session_feedback"),
    responses(
        (status = 200, description = "Attendance recorded", body = MeetingSession),
        (status = 403, description = "Not the session's mentor", body = crate::error::ApiError),
        (status = 409, description = "Not scheduled, already started or already recorded", body = crate::error::ApiError),
        (status = 413, description = "Image too large", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn mentor_attend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = MultipartForm::collect(multipart).await?;
    let session = attend(&state, user, id, Participant::Mentor, form).await?;

    Ok(ok("Mentor attendance proof uploaded successfully", session))
}
