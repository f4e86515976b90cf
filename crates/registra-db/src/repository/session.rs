//! # Session Repository
//!
//! Database operations for cash-register sessions.
//!
//! The `idx_sessions_active_location` partial unique index makes the
//! single-open-session invariant hold even against writers that bypass
//! the engine's location lock; a violation surfaces as a conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use registra_core::{Money, Session, SessionStatus};
use registra_engine::{RepoResult, SessionRepository};

use crate::error::DbError;

/// Repository for session database operations.
#[derive(Debug, Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSessionRepository { pool }
    }
}

fn row_to_session(row: &SqliteRow) -> Result<Session, DbError> {
    let status_text: String = row.try_get("status").map_err(DbError::from)?;
    let status: SessionStatus = status_text
        .parse()
        .map_err(|e| DbError::corrupt("sessions", e))?;

    Ok(Session {
        id: row.try_get("id").map_err(DbError::from)?,
        tenant_id: row.try_get("tenant_id").map_err(DbError::from)?,
        location_id: row.try_get("location_id").map_err(DbError::from)?,
        session_number: row.try_get("session_number").map_err(DbError::from)?,
        status,
        opening_balance: Money::from_minor(row.try_get("opening_balance").map_err(DbError::from)?),
        closing_balance: row
            .try_get::<Option<i64>, _>("closing_balance")
            .map_err(DbError::from)?
            .map(Money::from_minor),
        expected_balance: row
            .try_get::<Option<i64>, _>("expected_balance")
            .map_err(DbError::from)?
            .map(Money::from_minor),
        variance: row
            .try_get::<Option<i64>, _>("variance")
            .map_err(DbError::from)?
            .map(Money::from_minor),
        variance_note: row.try_get("variance_note").map_err(DbError::from)?,
        opened_by: row.try_get("opened_by").map_err(DbError::from)?,
        opened_at: row
            .try_get::<DateTime<Utc>, _>("opened_at")
            .map_err(DbError::from)?,
        closed_by: row.try_get("closed_by").map_err(DbError::from)?,
        closed_at: row
            .try_get::<Option<DateTime<Utc>>, _>("closed_at")
            .map_err(DbError::from)?,
        approved_by: row.try_get("approved_by").map_err(DbError::from)?,
        approved_at: row
            .try_get::<Option<DateTime<Utc>>, _>("approved_at")
            .map_err(DbError::from)?,
    })
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.as_ref().map(row_to_session).transpose()?)
    }

    async fn find_active_by_location(
        &self,
        tenant_id: &str,
        location_id: &str,
    ) -> RepoResult<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM sessions
            WHERE tenant_id = ?1 AND location_id = ?2 AND status != 'closed'
            "#,
        )
        .bind(tenant_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(row.as_ref().map(row_to_session).transpose()?)
    }

    async fn next_sequence(&self, tenant_id: &str, year: i32) -> RepoResult<u32> {
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO session_counters (tenant_id, year, last_sequence)
            VALUES (?1, ?2, 1)
            ON CONFLICT (tenant_id, year)
            DO UPDATE SET last_sequence = last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(tenant_id)
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(sequence as u32)
    }

    async fn insert(&self, session: &Session) -> RepoResult<()> {
        debug!(id = %session.id, session_number = %session.session_number, "Inserting session");

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, tenant_id, location_id, session_number, status,
                opening_balance, closing_balance, expected_balance, variance, variance_note,
                opened_by, opened_at, closed_by, closed_at, approved_by, approved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&session.id)
        .bind(&session.tenant_id)
        .bind(&session.location_id)
        .bind(&session.session_number)
        .bind(session.status.to_string())
        .bind(session.opening_balance.minor())
        .bind(session.closing_balance.map(|m| m.minor()))
        .bind(session.expected_balance.map(|m| m.minor()))
        .bind(session.variance.map(|m| m.minor()))
        .bind(&session.variance_note)
        .bind(&session.opened_by)
        .bind(session.opened_at)
        .bind(&session.closed_by)
        .bind(session.closed_at)
        .bind(&session.approved_by)
        .bind(session.approved_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn update(&self, session: &Session) -> RepoResult<()> {
        debug!(id = %session.id, status = %session.status, "Updating session");

        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = ?2,
                closing_balance = ?3,
                expected_balance = ?4,
                variance = ?5,
                variance_note = ?6,
                closed_by = ?7,
                closed_at = ?8,
                approved_by = ?9,
                approved_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&session.id)
        .bind(session.status.to_string())
        .bind(session.closing_balance.map(|m| m.minor()))
        .bind(session.expected_balance.map(|m| m.minor()))
        .bind(session.variance.map(|m| m.minor()))
        .bind(&session.variance_note)
        .bind(&session.closed_by)
        .bind(session.closed_at)
        .bind(&session.approved_by)
        .bind(session.approved_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session", &session.id).into());
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
