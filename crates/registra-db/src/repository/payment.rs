//! # Payment Repository
//!
//! Database operations for payment rows. Method-specific metadata
//! columns stay NULL where they do not apply; the drawer sums feed the
//! close-time expected balance and the Z-report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use registra_core::{Money, Payment, PaymentMethod};
use registra_engine::{PaymentRepository, RepoResult};

use crate::error::DbError;

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqlitePaymentRepository { pool }
    }
}

fn row_to_payment(row: &SqliteRow) -> Result<Payment, DbError> {
    let method: PaymentMethod = row
        .try_get::<String, _>("method")
        .map_err(DbError::from)?
        .parse()
        .map_err(|e| DbError::corrupt("payments", e))?;

    Ok(Payment {
        id: row.try_get("id").map_err(DbError::from)?,
        transaction_id: row.try_get("transaction_id").map_err(DbError::from)?,
        session_id: row.try_get("session_id").map_err(DbError::from)?,
        method,
        amount: Money::from_minor(row.try_get("amount").map_err(DbError::from)?),
        tendered: row
            .try_get::<Option<i64>, _>("tendered")
            .map_err(DbError::from)?
            .map(Money::from_minor),
        change_given: row
            .try_get::<Option<i64>, _>("change_given")
            .map_err(DbError::from)?
            .map(Money::from_minor),
        gateway_txn_id: row.try_get("gateway_txn_id").map_err(DbError::from)?,
        card_last_four: row.try_get("card_last_four").map_err(DbError::from)?,
        card_brand: row.try_get("card_brand").map_err(DbError::from)?,
        reference: row.try_get("reference").map_err(DbError::from)?,
        voucher_code: row.try_get("voucher_code").map_err(DbError::from)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(DbError::from)?,
    })
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn insert(&self, payment: &Payment) -> RepoResult<()> {
        debug!(
            id = %payment.id,
            transaction_id = %payment.transaction_id,
            method = %payment.method,
            amount = payment.amount.minor(),
            "Inserting payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, transaction_id, session_id, method, amount,
                tendered, change_given,
                gateway_txn_id, card_last_four, card_brand,
                reference, voucher_code, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.transaction_id)
        .bind(&payment.session_id)
        .bind(payment.method.to_string())
        .bind(payment.amount.minor())
        .bind(payment.tendered.map(|m| m.minor()))
        .bind(payment.change_given.map(|m| m.minor()))
        .bind(&payment.gateway_txn_id)
        .bind(&payment.card_last_four)
        .bind(&payment.card_brand)
        .bind(&payment.reference)
        .bind(&payment.voucher_code)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    async fn find_by_transaction(&self, transaction_id: &str) -> RepoResult<Vec<Payment>> {
        let rows = sqlx::query(
            "SELECT * FROM payments WHERE transaction_id = ?1 ORDER BY created_at, id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.iter().map(row_to_payment).collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_by_session(&self, session_id: &str) -> RepoResult<Vec<Payment>> {
        let rows = sqlx::query(
            "SELECT * FROM payments WHERE session_id = ?1 ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.iter().map(row_to_payment).collect::<Result<Vec<_>, _>>()?)
    }

    async fn sum_by_transaction(&self, transaction_id: &str) -> RepoResult<Money> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE transaction_id = ?1",
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(Money::from_minor(total))
    }

    async fn sum_cash_by_session(&self, session_id: &str) -> RepoResult<Money> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE session_id = ?1 AND method = 'cash'",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(Money::from_minor(total))
    }

    async fn delete_by_transaction(&self, transaction_id: &str) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE transaction_id = ?1")
            .bind(transaction_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;
        debug!(
            transaction_id = %transaction_id,
            deleted = result.rows_affected(),
            "Deleted payments"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use registra_core::{PaymentStatus, SessionStatus, Transaction, TransactionStatus};
    use registra_engine::{SessionRepository, TransactionRepository};

    async fn seed_transaction(db: &Database, session_id: &str, id: &str) {
        let now = Utc::now();
        let txn = Transaction {
            id: id.to_string(),
            tenant_id: "tenant-1".to_string(),
            session_id: session_id.to_string(),
            receipt_number: format!("RCPT-{id}"),
            status: TransactionStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            subtotal: Money::from_minor(10000),
            tax_total: Money::from_minor(2700),
            discount_total: Money::zero(),
            total: Money::from_minor(12700),
            created_at: now,
            updated_at: now,
            completed_at: None,
            voided_at: None,
        };
        db.transactions().insert(&txn, &[]).await.unwrap();
    }

    async fn db_with_session() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = registra_core::Session {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: "tenant-1".to_string(),
            location_id: "loc-1".to_string(),
            session_number: "KASSZA-2026-0001".to_string(),
            status: SessionStatus::Open,
            opening_balance: Money::from_minor(50000),
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
        };
        db.sessions().insert(&session).await.unwrap();
        (db, session.id)
    }

    fn cash_payment(transaction_id: &str, session_id: &str, amount: i64) -> Payment {
        let mut p = Payment::new(
            transaction_id,
            session_id,
            PaymentMethod::Cash,
            Money::from_minor(amount),
            Utc::now(),
        );
        p.tendered = Some(Money::from_minor(amount));
        p.change_given = Some(Money::zero());
        p
    }

    #[tokio::test]
    async fn test_insert_and_metadata_round_trip() {
        let (db, session_id) = db_with_session().await;
        seed_transaction(&db, &session_id, "txn-1").await;
        let repo = db.payments();

        let mut card = Payment::new(
            "txn-1",
            &session_id,
            PaymentMethod::Card,
            Money::from_minor(25400),
            Utc::now(),
        );
        card.gateway_txn_id = Some("gw-123".to_string());
        card.card_last_four = Some("4242".to_string());
        card.card_brand = Some("visa".to_string());
        repo.insert(&card).await.unwrap();

        let found = repo.find_by_transaction("txn-1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, PaymentMethod::Card);
        assert_eq!(found[0].gateway_txn_id.as_deref(), Some("gw-123"));
        // Cash-only fields stay empty on a card row.
        assert!(found[0].tendered.is_none());
        assert!(found[0].change_given.is_none());
    }

    #[tokio::test]
    async fn test_sums() {
        let (db, session_id) = db_with_session().await;
        seed_transaction(&db, &session_id, "txn-1").await;
        seed_transaction(&db, &session_id, "txn-2").await;
        let repo = db.payments();

        repo.insert(&cash_payment("txn-1", &session_id, 10000)).await.unwrap();
        repo.insert(&cash_payment("txn-1", &session_id, 2700)).await.unwrap();
        let mut card = Payment::new(
            "txn-2",
            &session_id,
            PaymentMethod::Card,
            Money::from_minor(5000),
            Utc::now(),
        );
        card.gateway_txn_id = Some("gw-9".to_string());
        repo.insert(&card).await.unwrap();

        assert_eq!(repo.sum_by_transaction("txn-1").await.unwrap().minor(), 12700);
        assert_eq!(repo.sum_by_transaction("txn-2").await.unwrap().minor(), 5000);
        assert_eq!(repo.sum_by_transaction("ghost").await.unwrap().minor(), 0);
        // Cash sum excludes the card row.
        assert_eq!(
            repo.sum_cash_by_session(&session_id).await.unwrap().minor(),
            12700
        );
    }

    #[tokio::test]
    async fn test_delete_by_transaction() {
        let (db, session_id) = db_with_session().await;
        seed_transaction(&db, &session_id, "txn-1").await;
        seed_transaction(&db, &session_id, "txn-2").await;
        let repo = db.payments();

        repo.insert(&cash_payment("txn-1", &session_id, 10000)).await.unwrap();
        repo.insert(&cash_payment("txn-2", &session_id, 500)).await.unwrap();

        repo.delete_by_transaction("txn-1").await.unwrap();
        assert!(repo.find_by_transaction("txn-1").await.unwrap().is_empty());
        assert_eq!(repo.find_by_transaction("txn-2").await.unwrap().len(), 1);
    }
}
