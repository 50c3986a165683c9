//! Student and mentor enrollment, student plans

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{Enrollment, StudentPlan, UserRole};
use crate::{LenteraError, Result};

#[derive(Clone)]
pub struct EnrollmentStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct EnrollmentRow {
    class_id: Uuid,
    classname: String,
    role: String,
    enrolled_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PlanRow {
    id: i32,
    user_id: i32,
    total_sessions: i32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<PlanRow> for StudentPlan {
    fn from(row: PlanRow) -> Self {
        StudentPlan {
            id: row.id,
            user_id: row.user_id,
            total_sessions: row.total_sessions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl EnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live classes the user studies or mentors in
    pub async fn classes_of(&self, user_id: i32) -> Result<Vec<Enrollment>> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(
            r#"
            SELECT c.id AS class_id, c.classname, 'user' AS role, s.created_at AS enrolled_at
            FROM students s
            JOIN classes c ON c.id = s.class_id AND c.deleted_at IS NULL
            WHERE s.user_id = $1 AND s.deleted_at IS NULL
            UNION ALL
            SELECT c.id, c.classname, 'mentor', m.created_at
            FROM mentors m
            JOIN classes c ON c.id = m.class_id AND c.deleted_at IS NULL
            WHERE m.user_id = $1 AND m.deleted_at IS NULL
            ORDER BY enrolled_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list enrollments: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| Enrollment {
                class_id: r.class_id,
                classname: r.classname,
                role: r.role.parse().unwrap_or(UserRole::User),
                enrolled_at: r.enrolled_at,
            })
            .collect())
    }

    pub async fn find_plan(&self, user_id: i32) -> Result<Option<StudentPlan>> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_sessions, created_at, updated_at
            FROM student_plans
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to get student plan: {e}")))?;

        Ok(row.map(StudentPlan::from))
    }

    /// Change the quota of the live plan
    pub async fn update_plan(&self, user_id: i32, total_sessions: i32) -> Result<StudentPlan> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            UPDATE student_plans SET total_sessions = $2, updated_at = NOW()
            WHERE user_id = $1 AND deleted_at IS NULL
            RETURNING id, user_id, total_sessions, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(total_sessions)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update student plan", e))?;

        row.map(StudentPlan::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Student plan for user {user_id}")))
    }
}
