//! # Session Manager
//!
//! Cash-register session lifecycle.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  open_session ──▶ Open ◀──▶ Suspended (suspend / resume)            │
//! │                     │                                               │
//! │                     ▼ close_session(counted, note?)                 │
//! │       variance == 0 ? Closed : PendingApproval                      │
//! │                                   │                                 │
//! │          approve_variance ──▶ Closed                                │
//! │          reject_variance  ──▶ Open (close fields cleared, recount)  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All transitions for one location run under that location's lock from
//! the [`LockRegistry`], so check-then-write sequences (is the location
//! free? is the status Open?) cannot interleave. The SQLite adapter's
//! partial unique index backstops the single-open-session invariant.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use registra_core::{
    session as rules, CoreError, Money, Session, SessionStatus, validation,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::{self, AuditEntry, AuditLog};
use crate::error::{EngineError, EngineResult, RepoError};
use crate::locks::LockRegistry;
use crate::repository::{PaymentRepository, SessionRepository};

/// Orchestrates the session state machine.
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    payments: Arc<dyn PaymentRepository>,
    audit: Arc<dyn AuditLog>,
    locks: Arc<LockRegistry>,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        payments: Arc<dyn PaymentRepository>,
        audit: Arc<dyn AuditLog>,
        locks: Arc<LockRegistry>,
    ) -> Self {
        SessionManager {
            sessions,
            payments,
            audit,
            locks,
        }
    }

    /// Opens a session at a location.
    ///
    /// Fails with `LocationOccupied` while any non-closed session
    /// exists there. Under concurrent opens exactly one caller wins;
    /// the rest see the winner's session number in their error.
    pub async fn open_session(
        &self,
        tenant_id: &str,
        location_id: &str,
        opening_balance: Money,
        actor: &str,
    ) -> EngineResult<Session> {
        validation::validate_opening_balance(opening_balance)?;

        let _guard = self.locks.acquire(location_id).await;

        if let Some(existing) = self
            .sessions
            .find_active_by_location(tenant_id, location_id)
            .await?
        {
            return Err(CoreError::LocationOccupied {
                location_id: location_id.to_string(),
                session_number: existing.session_number,
            }
            .into());
        }

        let now = Utc::now();
        let sequence = self.sessions.next_sequence(tenant_id, now.year()).await?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            location_id: location_id.to_string(),
            session_number: rules::format_session_number(now.year(), sequence),
            status: SessionStatus::Open,
            opening_balance,
            closing_balance: None,
            expected_balance: None,
            variance: None,
            variance_note: None,
            opened_by: actor.to_string(),
            opened_at: now,
            closed_by: None,
            closed_at: None,
            approved_by: None,
            approved_at: None,
        };
        self.sessions.insert(&session).await?;

        info!(
            session_number = %session.session_number,
            location_id = %location_id,
            opening_balance = opening_balance.minor(),
            "Session opened"
        );
        self.record_transition(&session, "session.open", actor, None)
            .await;
        Ok(session)
    }

    /// Pauses an open session (register left unattended).
    pub async fn suspend_session(&self, session_id: &str, actor: &str) -> EngineResult<Session> {
        self.transition(session_id, actor, "session.suspend", |session| {
            rules::ensure_can_suspend(session)?;
            session.status = SessionStatus::Suspended;
            Ok(())
        })
        .await
    }

    /// Resumes a suspended session.
    pub async fn resume_session(&self, session_id: &str, actor: &str) -> EngineResult<Session> {
        self.transition(session_id, actor, "session.resume", |session| {
            rules::ensure_can_resume(session)?;
            session.status = SessionStatus::Open;
            Ok(())
        })
        .await
    }

    /// Closes a session against a counted drawer.
    ///
    /// `expected = opening balance + cash tendered this session`;
    /// `variance = counted − expected`. A nonzero variance requires a
    /// note and parks the session in PendingApproval; an exact count
    /// closes directly.
    pub async fn close_session(
        &self,
        session_id: &str,
        closing_balance: Money,
        variance_note: Option<String>,
        actor: &str,
    ) -> EngineResult<Session> {
        let mut session = self.fetch(session_id).await?;
        let _guard = self.locks.acquire(&session.location_id).await;
        // Re-read under the lock; a racing transition may have landed.
        session = self.fetch(session_id).await?;

        let cash_total = self.payments.sum_cash_by_session(session_id).await?;
        let outcome =
            rules::compute_close(&session, cash_total, closing_balance, variance_note.as_deref())?;

        let before = session.status;
        let now = Utc::now();
        session.status = outcome.next_status;
        session.closing_balance = Some(closing_balance);
        session.expected_balance = Some(outcome.expected_balance);
        session.variance = Some(outcome.variance);
        session.variance_note = variance_note;
        session.closed_by = Some(actor.to_string());
        session.closed_at = Some(now);
        self.sessions.update(&session).await?;

        info!(
            session_number = %session.session_number,
            expected = outcome.expected_balance.minor(),
            counted = closing_balance.minor(),
            variance = outcome.variance.minor(),
            status = %session.status,
            "Session closed"
        );
        self.record_transition(
            &session,
            "session.close",
            actor,
            Some(json!({
                "before": before.to_string(),
                "after": session.status.to_string(),
                "expected": outcome.expected_balance.minor(),
                "counted": closing_balance.minor(),
                "variance": outcome.variance.minor(),
            })),
        )
        .await;
        Ok(session)
    }

    /// Manager sign-off on a pending variance; the session closes.
    pub async fn approve_variance(&self, session_id: &str, actor: &str) -> EngineResult<Session> {
        self.transition(session_id, actor, "session.approve_variance", |session| {
            rules::ensure_can_review(session, "approve variance")?;
            session.status = SessionStatus::Closed;
            session.approved_by = Some(actor.to_string());
            session.approved_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    /// Manager rejects the close; the session reopens for a recount.
    ///
    /// All close-time fields are cleared so the next close starts from
    /// a clean slate.
    pub async fn reject_variance(&self, session_id: &str, actor: &str) -> EngineResult<Session> {
        self.transition(session_id, actor, "session.reject_variance", |session| {
            rules::ensure_can_review(session, "reject variance")?;
            session.status = SessionStatus::Open;
            session.closing_balance = None;
            session.expected_balance = None;
            session.variance = None;
            session.variance_note = None;
            session.closed_by = None;
            session.closed_at = None;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> EngineResult<Session> {
        self.fetch(session_id).await
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn fetch(&self, session_id: &str) -> EngineResult<Session> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| RepoError::not_found("Session", session_id).into())
    }

    /// Runs a guarded mutation under the session's location lock.
    async fn transition<F>(
        &self,
        session_id: &str,
        actor: &str,
        action: &str,
        mutate: F,
    ) -> EngineResult<Session>
    where
        F: FnOnce(&mut Session) -> Result<(), CoreError>,
    {
        let mut session = self.fetch(session_id).await?;
        let _guard = self.locks.acquire(&session.location_id).await;
        session = self.fetch(session_id).await?;

        let before = session.status;
        mutate(&mut session).map_err(EngineError::from)?;
        self.sessions.update(&session).await?;

        info!(
            session_number = %session.session_number,
            before = %before,
            after = %session.status,
            action = %action,
            "Session transition"
        );
        self.record_transition(
            &session,
            action,
            actor,
            Some(json!({
                "before": before.to_string(),
                "after": session.status.to_string(),
            })),
        )
        .await;
        Ok(session)
    }

    async fn record_transition(
        &self,
        session: &Session,
        action: &str,
        actor: &str,
        metadata: Option<serde_json::Value>,
    ) {
        let entry = AuditEntry::new(
            action,
            "session",
            session.id.clone(),
            actor,
            session.tenant_id.clone(),
            metadata.unwrap_or_else(|| {
                json!({ "session_number": session.session_number })
            }),
        );
        audit::record(self.audit.as_ref(), entry).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditLog;
    use crate::memory::{MemoryPaymentRepository, MemorySessionRepository};
    use registra_core::{Payment, PaymentMethod};

    fn manager() -> (SessionManager, Arc<MemoryPaymentRepository>) {
        let payments = Arc::new(MemoryPaymentRepository::new());
        let manager = SessionManager::new(
            Arc::new(MemorySessionRepository::new()),
            Arc::clone(&payments) as Arc<dyn PaymentRepository>,
            Arc::new(TracingAuditLog),
            Arc::new(LockRegistry::new()),
        );
        (manager, payments)
    }

    #[tokio::test]
    async fn test_open_assigns_session_number() {
        let (manager, _) = manager();
        let session = manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Open);
        let year = Utc::now().year();
        assert_eq!(session.session_number, format!("KASSZA-{year}-0001"));
    }

    #[tokio::test]
    async fn test_second_open_at_same_location_fails() {
        let (manager, _) = manager();
        let first = manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-1")
            .await
            .unwrap();

        let err = manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-2")
            .await
            .unwrap_err();
        match err {
            EngineError::Core(CoreError::LocationOccupied { session_number, .. }) => {
                assert_eq!(session_number, first.session_number);
            }
            other => panic!("unexpected error: {other}"),
        }

        // A different location is unaffected.
        manager
            .open_session("tenant-1", "loc-2", Money::zero(), "user-2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_opens_exactly_one_success() {
        let (manager, _) = manager();
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager
                    .open_session("tenant-1", "loc-1", Money::zero(), &format!("user-{i}"))
                    .await
            }));
        }

        let mut successes = 0;
        let mut occupied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(EngineError::Core(CoreError::LocationOccupied { .. })) => occupied += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(occupied, 7);
    }

    #[tokio::test]
    async fn test_suspend_resume_cycle() {
        let (manager, _) = manager();
        let session = manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-1")
            .await
            .unwrap();

        let suspended = manager.suspend_session(&session.id, "user-1").await.unwrap();
        assert_eq!(suspended.status, SessionStatus::Suspended);

        // Close requires Open; a suspended register is resumed first.
        assert!(manager
            .close_session(&session.id, Money::zero(), None, "user-1")
            .await
            .is_err());

        let resumed = manager.resume_session(&session.id, "user-1").await.unwrap();
        assert_eq!(resumed.status, SessionStatus::Open);
    }

    #[tokio::test]
    async fn test_close_exact_count_goes_straight_to_closed() {
        let (manager, payments) = manager();
        let session = manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();
        payments
            .insert(&Payment::new(
                "txn-1",
                &session.id,
                PaymentMethod::Cash,
                Money::from_minor(12700),
                Utc::now(),
            ))
            .await
            .unwrap();

        let closed = manager
            .close_session(&session.id, Money::from_minor(62700), None, "user-1")
            .await
            .unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.expected_balance.unwrap().minor(), 62700);
        assert_eq!(closed.variance.unwrap().minor(), 0);

        // The location is free again.
        manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_with_variance_requires_note_then_parks() {
        let (manager, _) = manager();
        let session = manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();

        let err = manager
            .close_session(&session.id, Money::from_minor(52000), None, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::VarianceNoteRequired { variance: 2000, .. })
        ));

        let parked = manager
            .close_session(
                &session.id,
                Money::from_minor(52000),
                Some("till overage".to_string()),
                "user-1",
            )
            .await
            .unwrap();
        assert_eq!(parked.status, SessionStatus::PendingApproval);
        assert_eq!(parked.variance.unwrap().minor(), 2000);
        assert_eq!(parked.variance_note.as_deref(), Some("till overage"));
    }

    #[tokio::test]
    async fn test_approve_variance_closes() {
        let (manager, _) = manager();
        let session = manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();
        manager
            .close_session(
                &session.id,
                Money::from_minor(49000),
                Some("shortage, recount done".to_string()),
                "user-1",
            )
            .await
            .unwrap();

        let approved = manager.approve_variance(&session.id, "manager-1").await.unwrap();
        assert_eq!(approved.status, SessionStatus::Closed);
        assert_eq!(approved.approved_by.as_deref(), Some("manager-1"));
        assert!(approved.approved_at.is_some());
    }

    #[tokio::test]
    async fn test_reject_reopens_and_clears_close_fields() {
        let (manager, _) = manager();
        let session = manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();
        manager
            .close_session(
                &session.id,
                Money::from_minor(52000),
                Some("till overage".to_string()),
                "user-1",
            )
            .await
            .unwrap();

        let reopened = manager.reject_variance(&session.id, "manager-1").await.unwrap();
        assert_eq!(reopened.status, SessionStatus::Open);
        assert!(reopened.closing_balance.is_none());
        assert!(reopened.expected_balance.is_none());
        assert!(reopened.variance.is_none());
        assert!(reopened.variance_note.is_none());
        assert!(reopened.closed_by.is_none());

        // No pending close remains, so approve now fails.
        let err = manager.approve_variance(&session.id, "manager-1").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidSessionState { .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_opening_balance_rejected() {
        let (manager, _) = manager();
        assert!(manager
            .open_session("tenant-1", "loc-1", Money::from_minor(-1), "user-1")
            .await
            .is_err());
    }
}
