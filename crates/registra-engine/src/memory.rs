//! # In-Memory Repositories
//!
//! Repository doubles backed by `tokio::sync::RwLock` maps. Used by
//! the engine's own tests and handy for embedding the engine without a
//! database (demos, property tests).
//!
//! Behavior mirrors the SQLite adapter: "active" means status not
//! Closed, sums are computed over live payment rows, unknown ids on
//! update are NotFound.

use std::collections::HashMap;

use async_trait::async_trait;
use registra_core::{Money, Payment, PaymentMethod, Session, SessionStatus, Transaction, TransactionLine};
use tokio::sync::RwLock;

use crate::error::{RepoError, RepoResult};
use crate::repository::{PaymentRepository, SessionRepository, TransactionRepository};

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
    sequences: RwLock<HashMap<(String, i32), u32>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn find_active_by_location(
        &self,
        tenant_id: &str,
        location_id: &str,
    ) -> RepoResult<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| {
                s.tenant_id == tenant_id
                    && s.location_id == location_id
                    && s.status != SessionStatus::Closed
            })
            .cloned())
    }

    async fn next_sequence(&self, tenant_id: &str, year: i32) -> RepoResult<u32> {
        let mut sequences = self.sequences.write().await;
        let seq = sequences.entry((tenant_id.to_string(), year)).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn insert(&self, session: &Session) -> RepoResult<()> {
        let mut sessions = self.sessions.write().await;
        // Backstop of the single-open-session invariant, like the
        // partial unique index in the SQLite adapter.
        if session.status != SessionStatus::Closed
            && sessions.values().any(|s| {
                s.tenant_id == session.tenant_id
                    && s.location_id == session.location_id
                    && s.status != SessionStatus::Closed
            })
        {
            return Err(RepoError::Conflict {
                field: "sessions.location_id".to_string(),
                value: session.location_id.clone(),
            });
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> RepoResult<()> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(RepoError::not_found("Session", &session.id));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryTransactionRepository {
    transactions: RwLock<HashMap<String, Transaction>>,
    lines: RwLock<HashMap<String, Vec<TransactionLine>>>,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Transaction>> {
        Ok(self.transactions.read().await.get(id).cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> RepoResult<Vec<Transaction>> {
        let mut found: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn insert(
        &self,
        transaction: &Transaction,
        lines: &[TransactionLine],
    ) -> RepoResult<()> {
        self.transactions
            .write()
            .await
            .insert(transaction.id.clone(), transaction.clone());
        self.lines
            .write()
            .await
            .insert(transaction.id.clone(), lines.to_vec());
        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> RepoResult<()> {
        let mut transactions = self.transactions.write().await;
        if !transactions.contains_key(&transaction.id) {
            return Err(RepoError::not_found("Transaction", &transaction.id));
        }
        transactions.insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn find_lines(&self, transaction_id: &str) -> RepoResult<Vec<TransactionLine>> {
        Ok(self
            .lines
            .read()
            .await
            .get(transaction_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_line_deducted(&self, line_id: &str) -> RepoResult<()> {
        let mut lines = self.lines.write().await;
        for group in lines.values_mut() {
            if let Some(line) = group.iter_mut().find(|l| l.id == line_id) {
                line.inventory_deducted = true;
                return Ok(());
            }
        }
        Err(RepoError::not_found("TransactionLine", line_id))
    }
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryPaymentRepository {
    payments: RwLock<Vec<Payment>>,
}

impl MemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for MemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> RepoResult<()> {
        self.payments.write().await.push(payment.clone());
        Ok(())
    }

    async fn find_by_transaction(&self, transaction_id: &str) -> RepoResult<Vec<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn find_by_session(&self, session_id: &str) -> RepoResult<Vec<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn sum_by_transaction(&self, transaction_id: &str) -> RepoResult<Money> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.transaction_id == transaction_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn sum_cash_by_session(&self, session_id: &str) -> RepoResult<Money> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.session_id == session_id && p.method == PaymentMethod::Cash)
            .map(|p| p.amount)
            .sum())
    }

    async fn delete_by_transaction(&self, transaction_id: &str) -> RepoResult<()> {
        self.payments
            .write()
            .await
            .retain(|p| p.transaction_id != transaction_id);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(id: &str, location: &str, status: SessionStatus) -> Session {
        Session {
            id: id.to_string(),
            tenant_id: "tenant-1".to_string(),
            location_id: location.to_string(),
            session_number: format!("KASSZA-2026-{id}"),
            status,
            opening_balance: Money::zero(),
            closing_balance: None,
            expected_balance: None,
            variance: None,
            variance_note: None,
            opened_by: "user-1".to_string(),
            opened_at: Utc::now(),
            closed_by: None,
            closed_at: None,
            approved_by: None,
            approved_at: None,
        }
    }

    #[tokio::test]
    async fn test_second_active_session_conflicts() {
        let repo = MemorySessionRepository::new();
        repo.insert(&session("a", "loc-1", SessionStatus::Open))
            .await
            .unwrap();

        let err = repo
            .insert(&session("b", "loc-1", SessionStatus::Open))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict { .. }));

        // A closed session does not occupy the location.
        repo.insert(&session("c", "loc-2", SessionStatus::Closed))
            .await
            .unwrap();
        repo.insert(&session("d", "loc-2", SessionStatus::Open))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sequences_are_per_tenant_and_year() {
        let repo = MemorySessionRepository::new();
        assert_eq!(repo.next_sequence("t1", 2026).await.unwrap(), 1);
        assert_eq!(repo.next_sequence("t1", 2026).await.unwrap(), 2);
        assert_eq!(repo.next_sequence("t1", 2027).await.unwrap(), 1);
        assert_eq!(repo.next_sequence("t2", 2026).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cash_sum_ignores_other_methods() {
        let repo = MemoryPaymentRepository::new();
        let now = Utc::now();
        repo.insert(&Payment::new("txn-1", "sess-1", PaymentMethod::Cash, Money::from_minor(100), now))
            .await
            .unwrap();
        repo.insert(&Payment::new("txn-2", "sess-1", PaymentMethod::Card, Money::from_minor(999), now))
            .await
            .unwrap();
        repo.insert(&Payment::new("txn-3", "sess-2", PaymentMethod::Cash, Money::from_minor(50), now))
            .await
            .unwrap();

        assert_eq!(repo.sum_cash_by_session("sess-1").await.unwrap().minor(), 100);
    }
}
