//! Domain entities shared by the API and the CLI

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::LenteraError;

// ============================================================================
// Users
// ============================================================================

/// Platform role
///
/// `User` is the student role; the wire value stays `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Mentor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Mentor => "mentor",
            UserRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = LenteraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "student" => Ok(UserRole::User),
            "mentor" => Ok(UserRole::Mentor),
            "admin" => Ok(UserRole::Admin),
            other => Err(LenteraError::ValidationError(format!("Unknown role: {other}"))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A platform account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// Argon2 hash; `None` until the account is activated
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Minimal user projection embedded in joined reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Explicit partial update for a user
///
/// Only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.is_active.is_none()
    }

    /// Drop fields whose value already matches the stored user
    pub fn pruned_against(self, current: &User) -> Self {
        Self {
            name: self.name.filter(|name| name != &current.name),
            email: self
                .email
                .filter(|email| !email.eq_ignore_ascii_case(&current.email)),
            is_active: self.is_active.filter(|active| *active != current.is_active),
        }
    }

    pub fn changes_email(&self) -> bool {
        self.email.is_some()
    }
}

/// Result of applying a [`UserChanges`]
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub user: User,
    /// The email column changed; the address must be verified again
    pub email_changed: bool,
}

/// Account counts for the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserStats {
    pub students: i64,
    pub mentors: i64,
    pub admins: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Student entry for selection lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentOption {
    pub id: i32,
    pub name: String,
    pub class_id: Option<Uuid>,
    pub classname: Option<String>,
}

/// Mentor entry for selection lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MentorOption {
    pub id: i32,
    pub name: String,
}

// ============================================================================
// Classes and enrollment
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Class {
    pub id: Uuid,
    pub classname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassOption {
    pub id: Uuid,
    pub classname: String,
}

/// A class a user is enrolled in, as student or mentor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub class_id: Uuid,
    pub classname: String,
    pub role: UserRole,
    pub enrolled_at: DateTime<Utc>,
}

/// Contracted session quota of a student
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentPlan {
    pub id: i32,
    pub user_id: i32,
    pub total_sessions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Everything needed to create a student account
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub class_id: Uuid,
    pub total_sessions: i32,
}

/// Everything needed to create a mentor account
#[derive(Debug, Clone)]
pub struct NewMentor {
    pub name: String,
    pub email: String,
    pub class_ids: Vec<Uuid>,
}

// ============================================================================
// Meeting sessions
// ============================================================================

/// Lifecycle of a meeting session
///
/// `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Pending => "pending",
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStatus::Completed | MeetingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: MeetingStatus) -> bool {
        !self.is_terminal() && next != MeetingStatus::Pending
    }
}

impl std::str::FromStr for MeetingStatus {
    type Err = LenteraError;

    /// Accepts both the stored names and the verbs used in status URLs
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MeetingStatus::Pending),
            "scheduled" | "schedule" | "confirmed" => Ok(MeetingStatus::Scheduled),
            "completed" | "complete" => Ok(MeetingStatus::Completed),
            "cancelled" | "canceled" | "cancel" => Ok(MeetingStatus::Cancelled),
            other => Err(LenteraError::ValidationError(format!(
                "Unknown session status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheduled engagement between a student and a mentor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeetingSession {
    pub id: i32,
    pub student: UserSummary,
    pub mentor: UserSummary,
    pub session_date: NaiveDate,
    #[schema(value_type = String, example = "14:30:00")]
    pub session_time: NaiveTime,
    /// Duration in minutes
    pub session_duration: i32,
    pub session_type: String,
    pub session_topic: String,
    pub session_description: Option<String>,
    pub session_proof: Option<String>,
    pub session_feedback: Option<String>,
    pub student_attendance_proof: Option<String>,
    pub mentor_attendance_proof: Option<String>,
    pub is_student_attended: bool,
    pub is_mentor_attended: bool,
    pub session_status: MeetingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields of a new or fully replaced meeting session
#[derive(Debug, Clone)]
pub struct MeetingSessionDraft {
    pub student_id: i32,
    pub mentor_id: i32,
    pub session_date: NaiveDate,
    pub session_time: NaiveTime,
    pub session_duration: i32,
    pub session_type: String,
    pub session_topic: String,
    pub session_description: Option<String>,
}

/// Partial update used by bulk edits
#[derive(Debug, Clone, Default)]
pub struct MeetingSessionChanges {
    pub session_date: Option<NaiveDate>,
    pub session_time: Option<NaiveTime>,
    pub session_duration: Option<i32>,
    pub session_type: Option<String>,
    pub session_topic: Option<String>,
    pub session_description: Option<String>,
}

/// Who is recording attendance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Student,
    Mentor,
}

/// Reasons an attendance submission is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceError {
    #[error("Meeting session is not scheduled")]
    NotScheduled,

    #[error("Meeting session time has already passed")]
    AlreadyPassed,

    #[error("You are not assigned to this meeting session")]
    NotParticipant,

    #[error("Attendance has already been recorded")]
    AlreadyRecorded,
}

impl MeetingSession {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.session_date.and_time(self.session_time)
    }

    /// Check whether `user_id` may record attendance as `participant` at `now`
    pub fn check_attendance(
        &self,
        participant: Participant,
        user_id: i32,
        now: NaiveDateTime,
    ) -> Result<(), AttendanceError> {
        let (assigned, proof) = match participant {
            Participant::Student => (self.student.id, &self.student_attendance_proof),
            Participant::Mentor => (self.mentor.id, &self.mentor_attendance_proof),
        };

        if assigned != user_id {
            return Err(AttendanceError::NotParticipant);
        }
        if self.session_status != MeetingStatus::Scheduled {
            return Err(AttendanceError::NotScheduled);
        }
        if self.starts_at() < now {
            return Err(AttendanceError::AlreadyPassed);
        }
        if proof.is_some() {
            return Err(AttendanceError::AlreadyRecorded);
        }
        Ok(())
    }
}

/// Files and text submitted with an attendance record
#[derive(Debug, Clone)]
pub enum AttendanceRecord {
    Student {
        session_proof: String,
        attendance_proof: String,
    },
    Mentor {
        attendance_proof: String,
        feedback: Option<String>,
    },
}

impl AttendanceRecord {
    pub fn participant(&self) -> Participant {
        match self {
            AttendanceRecord::Student { .. } => Participant::Student,
            AttendanceRecord::Mentor { .. } => Participant::Mentor,
        }
    }
}

// ============================================================================
// Content
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Blog {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Testimony {
    pub id: i32,
    pub testimoner_name: String,
    pub testimoner_current_position: String,
    pub testimoner_previous_position: String,
    pub testimoner_photo: Option<String>,
    pub testimony_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct TestimonyDraft {
    pub testimoner_name: String,
    pub testimoner_current_position: String,
    pub testimoner_previous_position: String,
    pub testimony_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StaticAsset {
    pub id: i32,
    pub asset_name: String,
    /// e.g. `image`
    pub asset_type: String,
    pub asset_url: String,
    pub asset_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user() -> User {
        User {
            id: 7,
            name: "Siti".to_string(),
            email: "siti@example.com".to_string(),
            role: UserRole::User,
            password_hash: None,
            email_verified_at: None,
            is_active: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn session(status: MeetingStatus, date: NaiveDate) -> MeetingSession {
        MeetingSession {
            id: 1,
            student: UserSummary {
                id: 10,
                name: "Student".to_string(),
                email: "student@example.com".to_string(),
            },
            mentor: UserSummary {
                id: 20,
                name: "Mentor".to_string(),
                email: "mentor@example.com".to_string(),
            },
            session_date: date,
            session_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            session_duration: 60,
            session_type: "online".to_string(),
            session_topic: "Algebra".to_string(),
            session_description: None,
            session_proof: None,
            session_feedback: None,
            student_attendance_proof: None,
            mentor_attendance_proof: None,
            is_student_attended: false,
            is_mentor_attended: false,
            session_status: status,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn morning(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("Student".parse::<UserRole>().unwrap(), UserRole::User);
        assert_eq!(UserRole::User.to_string(), "user");
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_status_aliases() {
        assert_eq!("cancel".parse::<MeetingStatus>().unwrap(), MeetingStatus::Cancelled);
        assert_eq!("complete".parse::<MeetingStatus>().unwrap(), MeetingStatus::Completed);
        assert_eq!("schedule".parse::<MeetingStatus>().unwrap(), MeetingStatus::Scheduled);
        assert!("postponed".parse::<MeetingStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses_do_not_move() {
        assert!(MeetingStatus::Pending.can_transition_to(MeetingStatus::Scheduled));
        assert!(MeetingStatus::Scheduled.can_transition_to(MeetingStatus::Completed));
        assert!(!MeetingStatus::Scheduled.can_transition_to(MeetingStatus::Pending));
        assert!(!MeetingStatus::Completed.can_transition_to(MeetingStatus::Cancelled));
        assert!(!MeetingStatus::Cancelled.can_transition_to(MeetingStatus::Scheduled));
    }

    #[test]
    fn test_changes_pruned_against_current() {
        let current = user();
        let changes = UserChanges {
            name: Some("Siti".to_string()),
            email: Some("SITI@example.com".to_string()),
            is_active: Some(true),
        }
        .pruned_against(&current);

        assert_eq!(changes.name, None);
        assert_eq!(changes.email, None);
        assert_eq!(changes.is_active, Some(true));
        assert!(!changes.changes_email());
    }

    #[test]
    fn test_email_change_detected() {
        let changes = UserChanges {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        }
        .pruned_against(&user());
        assert!(changes.changes_email());
    }

    #[test]
    fn test_attendance_allowed_for_assigned_student() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        let s = session(MeetingStatus::Scheduled, date);
        assert_eq!(s.check_attendance(Participant::Student, 10, morning(date)), Ok(()));
        assert_eq!(s.check_attendance(Participant::Mentor, 20, morning(date)), Ok(()));
    }

    #[test]
    fn test_attendance_rejections() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        let now = morning(date);

        let s = session(MeetingStatus::Scheduled, date);
        assert_eq!(
            s.check_attendance(Participant::Student, 20, now),
            Err(AttendanceError::NotParticipant)
        );

        let cancelled = session(MeetingStatus::Cancelled, date);
        assert_eq!(
            cancelled.check_attendance(Participant::Student, 10, now),
            Err(AttendanceError::NotScheduled)
        );

        let late = date.and_hms_opt(11, 0, 0).unwrap();
        assert_eq!(
            s.check_attendance(Participant::Student, 10, late),
            Err(AttendanceError::AlreadyPassed)
        );

        let mut attended = session(MeetingStatus::Scheduled, date);
        attended.student_attendance_proof = Some("meeting_sessions/a.png".to_string());
        assert_eq!(
            attended.check_attendance(Participant::Student, 10, now),
            Err(AttendanceError::AlreadyRecorded)
        );
        // the mentor's own column is still open
        assert_eq!(attended.check_attendance(Participant::Mentor, 20, now), Ok(()));
    }

    proptest! {
        #[test]
        fn prop_pruning_never_adds_fields(
            name in proptest::option::of("[a-z]{1,8}"),
            email in proptest::option::of("[a-z]{1,8}@example\\.com"),
            active in proptest::option::of(any::<bool>()),
        ) {
            let changes = UserChanges { name: name.clone(), email: email.clone(), is_active: active };
            let pruned = changes.pruned_against(&user());
            prop_assert!(name.is_some() || pruned.name.is_none());
            prop_assert!(email.is_some() || pruned.email.is_none());
            prop_assert!(active.is_some() || pruned.is_active.is_none());
        }
    }
}
