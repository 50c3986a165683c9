//! Meeting sessions
//!
//! Every read joins the student and mentor accounts. Deletion is soft.
//! Bulk writes run in one transaction so a failing row rolls back the batch.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{begin, commit, ensure_affected};
use crate::models::{
    AttendanceRecord, MeetingSession, MeetingSessionChanges, MeetingSessionDraft, MeetingStatus,
    UserRole, UserSummary,
};
use crate::{LenteraError, Result};

const SELECT_SESSION: &str = r#"
    SELECT
        ms.id, ms.session_date, ms.session_time, ms.session_duration, ms.session_type,
        ms.session_topic, ms.session_description, ms.session_proof, ms.session_feedback,
        ms.student_attendance_proof, ms.mentor_attendance_proof,
        ms.is_student_attended, ms.is_mentor_attended, ms.session_status,
        ms.created_at, ms.updated_at,
        s.id AS student_id, s.name AS student_name, s.email AS student_email,
        m.id AS mentor_id, m.name AS mentor_name, m.email AS mentor_email
    FROM meeting_sessions ms
    JOIN users s ON s.id = ms.user_id
    JOIN users m ON m.id = ms.mentor_id
    WHERE ms.deleted_at IS NULL
"#;

#[derive(Clone)]
pub struct MeetingSessionStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct MeetingSessionRow {
    id: i32,
    session_date: NaiveDate,
    session_time: NaiveTime,
    session_duration: i32,
    session_type: String,
    session_topic: String,
    session_description: Option<String>,
    session_proof: Option<String>,
    session_feedback: Option<String>,
    student_attendance_proof: Option<String>,
    mentor_attendance_proof: Option<String>,
    is_student_attended: bool,
    is_mentor_attended: bool,
    session_status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    student_id: i32,
    student_name: String,
    student_email: String,
    mentor_id: i32,
    mentor_name: String,
    mentor_email: String,
}

impl TryFrom<MeetingSessionRow> for MeetingSession {
    type Error = LenteraError;

    fn try_from(row: MeetingSessionRow) -> Result<Self> {
        let session_status = row.session_status.parse().map_err(|_| {
            LenteraError::DatabaseError(format!(
                "Meeting session {} has unknown status '{}'",
                row.id, row.session_status
            ))
        })?;

        Ok(MeetingSession {
            id: row.id,
            student: UserSummary {
                id: row.student_id,
                name: row.student_name,
                email: row.student_email,
            },
            mentor: UserSummary {
                id: row.mentor_id,
                name: row.mentor_name,
                email: row.mentor_email,
            },
            session_date: row.session_date,
            session_time: row.session_time,
            session_duration: row.session_duration,
            session_type: row.session_type,
            session_topic: row.session_topic,
            session_description: row.session_description,
            session_proof: row.session_proof,
            session_feedback: row.session_feedback,
            student_attendance_proof: row.student_attendance_proof,
            mentor_attendance_proof: row.mentor_attendance_proof,
            is_student_attended: row.is_student_attended,
            is_mentor_attended: row.is_mentor_attended,
            session_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_sessions(rows: Vec<MeetingSessionRow>) -> Result<Vec<MeetingSession>> {
    rows.into_iter().map(MeetingSession::try_from).collect()
}

impl MeetingSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one session; new sessions start as `scheduled`
    pub async fn create(&self, draft: &MeetingSessionDraft) -> Result<MeetingSession> {
        let mut tx = begin(&self.pool).await?;
        let id = insert_draft(&mut tx, draft).await?;
        commit(tx).await?;
        self.get(id).await
    }

    pub async fn create_many(&self, drafts: &[MeetingSessionDraft]) -> Result<Vec<MeetingSession>> {
        let mut tx = begin(&self.pool).await?;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ids.push(insert_draft(&mut tx, draft).await?);
        }
        commit(tx).await?;

        self.find_many(&ids).await
    }

    /// Full replace of the schedule fields
    pub async fn update(&self, id: i32, draft: &MeetingSessionDraft) -> Result<MeetingSession> {
        let result = sqlx::query(
            r#"
            UPDATE meeting_sessions SET
                user_id = $2, mentor_id = $3, session_date = $4, session_time = $5,
                session_duration = $6, session_type = $7, session_topic = $8,
                session_description = $9, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(draft.student_id)
        .bind(draft.mentor_id)
        .bind(draft.session_date)
        .bind(draft.session_time)
        .bind(draft.session_duration)
        .bind(&draft.session_type)
        .bind(&draft.session_topic)
        .bind(&draft.session_description)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update meeting session", e))?;

        ensure_affected(result, "Meeting session", id)?;
        self.get(id).await
    }

    /// Partial updates applied atomically; an unknown id aborts the batch
    pub async fn update_many(
        &self,
        updates: &[(i32, MeetingSessionChanges)],
    ) -> Result<Vec<MeetingSession>> {
        let mut tx = begin(&self.pool).await?;
        for (id, changes) in updates {
            let result = sqlx::query(
                r#"
                UPDATE meeting_sessions SET
                    session_date = COALESCE($2, session_date),
                    session_time = COALESCE($3, session_time),
                    session_duration = COALESCE($4, session_duration),
                    session_type = COALESCE($5, session_type),
                    session_topic = COALESCE($6, session_topic),
                    session_description = COALESCE($7, session_description),
                    updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
            )
            .bind(id)
            .bind(changes.session_date)
            .bind(changes.session_time)
            .bind(changes.session_duration)
            .bind(&changes.session_type)
            .bind(&changes.session_topic)
            .bind(&changes.session_description)
            .execute(&mut *tx)
            .await
            .map_err(|e| LenteraError::from_sqlx("Failed to update meeting session", e))?;

            ensure_affected(result, "Meeting session", id)?;
        }
        commit(tx).await?;

        let ids: Vec<i32> = updates.iter().map(|(id, _)| *id).collect();
        self.find_many(&ids).await
    }

    /// Move to `next`, refusing transitions out of terminal states
    pub async fn set_status(&self, id: i32, next: MeetingStatus) -> Result<MeetingSession> {
        let current = self.get(id).await?;
        if !current.session_status.can_transition_to(next) {
            return Err(LenteraError::Conflict(format!(
                "Cannot change session status from {} to {}",
                current.session_status, next
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE meeting_sessions SET session_status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND session_status = $3
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(current.session_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to update status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(LenteraError::Conflict(
                "Session status changed concurrently".to_string(),
            ));
        }
        self.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<MeetingSession>> {
        let rows: Vec<MeetingSessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} ORDER BY ms.session_date DESC, ms.session_time DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list meeting sessions: {e}")))?;

        into_sessions(rows)
    }

    /// Sessions where the user is the student (role `user`) or the mentor
    pub async fn list_for(&self, user_id: i32, role: UserRole) -> Result<Vec<MeetingSession>> {
        let column = match role {
            UserRole::Mentor => "ms.mentor_id",
            _ => "ms.user_id",
        };
        let rows: Vec<MeetingSessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} AND {column} = $1 ORDER BY ms.session_date, ms.session_time"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list meeting sessions: {e}")))?;

        into_sessions(rows)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<MeetingSession>> {
        let row: Option<MeetingSessionRow> =
            sqlx::query_as(&format!("{SELECT_SESSION} AND ms.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    LenteraError::DatabaseError(format!("Failed to get meeting session: {e}"))
                })?;

        row.map(MeetingSession::try_from).transpose()
    }

    pub async fn get(&self, id: i32) -> Result<MeetingSession> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| LenteraError::NotFound(format!("Meeting session {id}")))
    }

    pub async fn soft_delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE meeting_sessions SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete meeting session: {e}")))?;

        ensure_affected(result, "Meeting session", id)
    }

    /// Write attendance proof for one participant
    ///
    /// The write only lands while the session is `scheduled` and the proof
    /// column is still empty; otherwise it is a conflict.
    pub async fn record_attendance(
        &self,
        id: i32,
        user_id: i32,
        record: &AttendanceRecord,
    ) -> Result<MeetingSession> {
        let result = match record {
            AttendanceRecord::Student {
                session_proof,
                attendance_proof,
            } => {
                sqlx::query(
                    r#"
                    UPDATE meeting_sessions SET
                        session_proof = $3,
                        student_attendance_proof = $4,
                        is_student_attended = TRUE,
                        updated_at = NOW()
                    WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
                      AND session_status = 'scheduled'
                      AND student_attendance_proof IS NULL
                    "#,
                )
                .bind(id)
                .bind(user_id)
                .bind(session_proof)
                .bind(attendance_proof)
                .execute(&self.pool)
                .await
            }
            AttendanceRecord::Mentor {
                attendance_proof,
                feedback,
            } => {
                sqlx::query(
                    r#"
                    UPDATE meeting_sessions SET
                        mentor_attendance_proof = $3,
                        session_feedback = COALESCE($4, session_feedback),
                        is_mentor_attended = TRUE,
                        updated_at = NOW()
                    WHERE id = $1 AND mentor_id = $2 AND deleted_at IS NULL
                      AND session_status = 'scheduled'
                      AND mentor_attendance_proof IS NULL
                    "#,
                )
                .bind(id)
                .bind(user_id)
                .bind(attendance_proof)
                .bind(feedback)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to record attendance: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(LenteraError::Conflict(
                "Attendance has already been recorded".to_string(),
            ));
        }
        self.get(id).await
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<MeetingSession>> {
        let rows: Vec<MeetingSessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} AND ms.id = ANY($1) ORDER BY ms.session_date, ms.session_time"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to get meeting sessions: {e}")))?;

        into_sessions(rows)
    }
}

async fn insert_draft(
    tx: &mut Transaction<'static, Postgres>,
    draft: &MeetingSessionDraft,
) -> Result<i32> {
    sqlx::query_scalar(
        r#"
        INSERT INTO meeting_sessions (
            user_id, mentor_id, session_date, session_time, session_duration,
            session_type, session_topic, session_description, session_status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'scheduled')
        RETURNING id
        "#,
    )
    .bind(draft.student_id)
    .bind(draft.mentor_id)
    .bind(draft.session_date)
    .bind(draft.session_time)
    .bind(draft.session_duration)
    .bind(&draft.session_type)
    .bind(&draft.session_topic)
    .bind(&draft.session_description)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| LenteraError::from_sqlx("Failed to create meeting session", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> MeetingSessionRow {
        MeetingSessionRow {
            id: 12,
            session_date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            session_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            session_duration: 90,
            session_type: "online".to_string(),
            session_topic: "Algebra".to_string(),
            session_description: None,
            session_proof: None,
            session_feedback: None,
            student_attendance_proof: None,
            mentor_attendance_proof: None,
            is_student_attended: false,
            is_mentor_attended: false,
            session_status: status.to_string(),
            created_at: Utc::now(),
            updated_at: None,
            student_id: 2,
            student_name: "Sari".to_string(),
            student_email: "sari@example.com".to_string(),
            mentor_id: 3,
            mentor_name: "Bima".to_string(),
            mentor_email: "bima@example.com".to_string(),
        }
    }

    #[test]
    fn test_row_maps_stored_status() {
        let session = MeetingSession::try_from(row("completed")).unwrap();
        assert_eq!(session.session_status, MeetingStatus::Completed);
        assert_eq!(session.student.id, 2);
        assert_eq!(session.mentor.name, "Bima");
    }

    #[test]
    fn test_unknown_stored_status_is_an_error() {
        let err = MeetingSession::try_from(row("archived")).unwrap_err();
        assert!(matches!(err, LenteraError::DatabaseError(ref msg) if msg.contains("archived")));
    }
}
