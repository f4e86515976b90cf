//! # Repository Contracts
//!
//! Async persistence traits the engine runs against. registra-db
//! implements them on SQLite; [`crate::memory`] provides in-memory
//! doubles for engine tests.
//!
//! Contracts return domain types from registra-core; adapters own the
//! row mapping. "Active" means any session whose status is not Closed.

use async_trait::async_trait;
use registra_core::{Money, Payment, Session, Transaction, TransactionLine};

use crate::error::RepoResult;

// =============================================================================
// Sessions
// =============================================================================

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Session>>;

    /// The session currently occupying a location, if any.
    ///
    /// At most one exists per location; the adapter enforces this with
    /// a unique index as a backstop to the engine's locking.
    async fn find_active_by_location(
        &self,
        tenant_id: &str,
        location_id: &str,
    ) -> RepoResult<Option<Session>>;

    /// Next session sequence number for a tenant and year (1-based).
    async fn next_sequence(&self, tenant_id: &str, year: i32) -> RepoResult<u32>;

    async fn insert(&self, session: &Session) -> RepoResult<()>;

    /// Full-row update keyed by id.
    async fn update(&self, session: &Session) -> RepoResult<()>;
}

// =============================================================================
// Transactions
// =============================================================================

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Transaction>>;

    async fn find_by_session(&self, session_id: &str) -> RepoResult<Vec<Transaction>>;

    /// Inserts a transaction together with its line snapshots.
    async fn insert(
        &self,
        transaction: &Transaction,
        lines: &[TransactionLine],
    ) -> RepoResult<()>;

    async fn update(&self, transaction: &Transaction) -> RepoResult<()>;

    async fn find_lines(&self, transaction_id: &str) -> RepoResult<Vec<TransactionLine>>;

    /// Sets the line's `inventory_deducted` flag.
    async fn mark_line_deducted(&self, line_id: &str) -> RepoResult<()>;
}

// =============================================================================
// Payments
// =============================================================================

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert(&self, payment: &Payment) -> RepoResult<()>;

    async fn find_by_transaction(&self, transaction_id: &str) -> RepoResult<Vec<Payment>>;

    async fn find_by_session(&self, session_id: &str) -> RepoResult<Vec<Payment>>;

    /// Total settled against one transaction.
    async fn sum_by_transaction(&self, transaction_id: &str) -> RepoResult<Money>;

    /// Total cash tendered in one session (drawer math input).
    async fn sum_cash_by_session(&self, session_id: &str) -> RepoResult<Money>;

    /// Removes all payment rows of a transaction (refund path).
    async fn delete_by_transaction(&self, transaction_id: &str) -> RepoResult<()>;
}
