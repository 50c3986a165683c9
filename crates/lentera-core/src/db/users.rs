//! User accounts

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{begin, commit, ensure_affected};
use crate::models::{
    MentorOption, NewMentor, NewStudent, StudentOption, User, UserChanges, UserRole, UserStats,
    UserUpdate,
};
use crate::{LenteraError, Result};

const USER_COLUMNS: &str =
    "id, name, email, password, role, email_verified_at, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    password: Option<String>,
    role: String,
    email_verified_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            // least privilege for anything the CHECK constraint let through
            role: row.role.parse().unwrap_or(UserRole::User),
            password_hash: row.password,
            email_verified_at: row.email_verified_at,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StudentOptionRow {
    id: i32,
    name: String,
    class_id: Option<Uuid>,
    classname: Option<String>,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LenteraError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    pub async fn get(&self, id: i32) -> Result<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| LenteraError::NotFound(format!("User {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    /// All non-admin accounts, newest first
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role <> 'admin' ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list users: {e}")))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn stats(&self) -> Result<UserStats> {
        let (students, mentors, admins, active, inactive): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*) FILTER (WHERE role = 'user'),
                    COUNT(*) FILTER (WHERE role = 'mentor'),
                    COUNT(*) FILTER (WHERE role = 'admin'),
                    COUNT(*) FILTER (WHERE is_active),
                    COUNT(*) FILTER (WHERE NOT is_active)
                FROM users
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LenteraError::DatabaseError(format!("Failed to count users: {e}")))?;

        Ok(UserStats {
            students,
            mentors,
            admins,
            active,
            inactive,
        })
    }

    pub async fn student_options(&self) -> Result<Vec<StudentOption>> {
        let rows: Vec<StudentOptionRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.name, c.id AS class_id, c.classname
            FROM users u
            LEFT JOIN students s ON s.user_id = u.id AND s.deleted_at IS NULL
            LEFT JOIN classes c ON c.id = s.class_id AND c.deleted_at IS NULL
            WHERE u.role = 'user' AND u.is_active
            ORDER BY u.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list students: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| StudentOption {
                id: r.id,
                name: r.name,
                class_id: r.class_id,
                classname: r.classname,
            })
            .collect())
    }

    pub async fn mentor_options(&self) -> Result<Vec<MentorOption>> {
        let rows: Vec<(i32, String)> = sqlx::query_as(
            "SELECT id, name FROM users WHERE role = 'mentor' AND is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list mentors: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| MentorOption { id, name })
            .collect())
    }

    /// Create an inactive student together with its class enrollment and plan
    pub async fn create_student(&self, student: &NewStudent) -> Result<User> {
        let mut tx = begin(&self.pool).await?;

        ensure_class_exists(&mut tx, student.class_id).await?;
        let user = insert_user(&mut tx, &student.name, &student.email, UserRole::User).await?;

        sqlx::query("INSERT INTO students (user_id, class_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(student.class_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| LenteraError::from_sqlx("Failed to enroll student", e))?;

        sqlx::query("INSERT INTO student_plans (user_id, total_sessions) VALUES ($1, $2)")
            .bind(user.id)
            .bind(student.total_sessions)
            .execute(&mut *tx)
            .await
            .map_err(|e| LenteraError::from_sqlx("Failed to create student plan", e))?;

        commit(tx).await?;
        Ok(user)
    }

    /// Create an inactive mentor assigned to every listed class
    pub async fn create_mentor(&self, mentor: &NewMentor) -> Result<User> {
        let mut tx = begin(&self.pool).await?;

        for class_id in &mentor.class_ids {
            ensure_class_exists(&mut tx, *class_id).await?;
        }
        let user = insert_user(&mut tx, &mentor.name, &mentor.email, UserRole::Mentor).await?;

        for class_id in &mentor.class_ids {
            sqlx::query("INSERT INTO mentors (user_id, class_id) VALUES ($1, $2)")
                .bind(user.id)
                .bind(class_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| LenteraError::from_sqlx("Failed to assign mentor", e))?;
        }

        commit(tx).await?;
        Ok(user)
    }

    /// Create a verified, active administrator
    pub async fn create_admin(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (name, email, password, role, email_verified_at, is_active)
            VALUES ($1, $2, $3, 'admin', NOW(), TRUE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email.trim())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to create admin", e))?;

        Ok(row.into())
    }

    /// Apply a changeset and report whether the email moved
    ///
    /// An email change clears `email_verified_at`.
    pub async fn apply_changes(&self, id: i32, changes: UserChanges) -> Result<UserUpdate> {
        let mut tx = begin(&self.pool).await?;

        let current: UserRow = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to fetch user: {e}")))?
        .ok_or_else(|| LenteraError::NotFound(format!("User {id}")))?;
        let current = User::from(current);

        let changes = changes.pruned_against(&current);
        if changes.is_empty() {
            tx.rollback().await.ok();
            return Ok(UserUpdate {
                user: current,
                email_changed: false,
            });
        }
        let email_changed = changes.changes_email();

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                is_active = COALESCE($4, is_active),
                email_verified_at = CASE WHEN $5 THEN NULL ELSE email_verified_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref().map(str::trim))
        .bind(changes.is_active)
        .bind(email_changed)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update user", e))?;

        commit(tx).await?;
        Ok(UserUpdate {
            user: row.into(),
            email_changed,
        })
    }

    pub async fn update_password(&self, id: i32, password_hash: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    LenteraError::DatabaseError(format!("Failed to update password: {e}"))
                })?;

        ensure_affected(result, "User", id)
    }

    /// First activation: set the password, verify the email, enable login
    pub async fn activate(&self, id: i32, password_hash: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                password = $2,
                email_verified_at = NOW(),
                is_active = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to activate user: {e}")))?;

        row.map(User::from)
            .ok_or_else(|| LenteraError::NotFound(format!("User {id}")))
    }

    /// Mark the current email as verified
    pub async fn mark_email_verified(&self, id: i32) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET email_verified_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to verify email: {e}")))?;

        row.map(User::from)
            .ok_or_else(|| LenteraError::NotFound(format!("User {id}")))
    }

    /// Admin override: enable the account and treat its email as verified
    pub async fn force_activate(&self, id: i32) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                is_active = TRUE,
                email_verified_at = COALESCE(email_verified_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to activate user: {e}")))?;

        row.map(User::from)
            .ok_or_else(|| LenteraError::NotFound(format!("User {id}")))
    }

    /// Hard delete; dependent rows go with the cascade
    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete user: {e}")))?;

        ensure_affected(result, "User", id)
    }
}

async fn insert_user(
    tx: &mut Transaction<'static, Postgres>,
    name: &str,
    email: &str,
    role: UserRole,
) -> Result<User> {
    let row: UserRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO users (name, email, role, is_active)
        VALUES ($1, $2, $3, FALSE)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(name)
    .bind(email.trim())
    .bind(role.as_str())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| LenteraError::from_sqlx("Failed to create user", e))?;

    Ok(row.into())
}

async fn ensure_class_exists(tx: &mut Transaction<'static, Postgres>, class_id: Uuid) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM classes WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(class_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| LenteraError::DatabaseError(format!("Failed to check class: {e}")))?;

    if !exists {
        return Err(LenteraError::NotFound(format!("Class {class_id}")));
    }
    Ok(())
}
