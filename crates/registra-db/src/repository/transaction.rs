//! # Transaction Repository
//!
//! Database operations for committed transactions and their line
//! snapshots. Transaction and lines are inserted atomically; the line
//! rows freeze product code, name and prices as they were sold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use registra_core::{
    Money, PaymentStatus, Transaction, TransactionLine, TransactionStatus, VatRate,
};
use registra_engine::{RepoResult, TransactionRepository};

use crate::error::DbError;

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct SqliteTransactionRepository {
    pool: SqlitePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteTransactionRepository { pool }
    }
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction, DbError> {
    let status: TransactionStatus = row
        .try_get::<String, _>("status")
        .map_err(DbError::from)?
        .parse()
        .map_err(|e| DbError::corrupt("transactions", e))?;
    let payment_status: PaymentStatus = row
        .try_get::<String, _>("payment_status")
        .map_err(DbError::from)?
        .parse()
        .map_err(|e| DbError::corrupt("transactions", e))?;

    Ok(Transaction {
        id: row.try_get("id").map_err(DbError::from)?,
        tenant_id: row.try_get("tenant_id").map_err(DbError::from)?,
        session_id: row.try_get("session_id").map_err(DbError::from)?,
        receipt_number: row.try_get("receipt_number").map_err(DbError::from)?,
        status,
        payment_status,
        subtotal: Money::from_minor(row.try_get("subtotal").map_err(DbError::from)?),
        tax_total: Money::from_minor(row.try_get("tax_total").map_err(DbError::from)?),
        discount_total: Money::from_minor(row.try_get("discount_total").map_err(DbError::from)?),
        total: Money::from_minor(row.try_get("total").map_err(DbError::from)?),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(DbError::from)?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(DbError::from)?,
        completed_at: row
            .try_get::<Option<DateTime<Utc>>, _>("completed_at")
            .map_err(DbError::from)?,
        voided_at: row
            .try_get::<Option<DateTime<Utc>>, _>("voided_at")
            .map_err(DbError::from)?,
    })
}

fn row_to_line(row: &SqliteRow) -> Result<TransactionLine, DbError> {
    let quantity: Decimal = row
        .try_get::<String, _>("quantity")
        .map_err(DbError::from)?
        .parse()
        .map_err(|e| DbError::corrupt("transaction_lines", e))?;
    let vat_rate = VatRate::from_percent(
        row.try_get::<i64, _>("vat_rate").map_err(DbError::from)? as u32,
    )
    .map_err(|e| DbError::corrupt("transaction_lines", e))?;

    Ok(TransactionLine {
        id: row.try_get("id").map_err(DbError::from)?,
        transaction_id: row.try_get("transaction_id").map_err(DbError::from)?,
        product_id: row.try_get("product_id").map_err(DbError::from)?,
        product_code: row.try_get("product_code").map_err(DbError::from)?,
        product_name: row.try_get("product_name").map_err(DbError::from)?,
        warehouse_id: row.try_get("warehouse_id").map_err(DbError::from)?,
        quantity,
        unit_price: Money::from_minor(row.try_get("unit_price").map_err(DbError::from)?),
        vat_rate,
        discount_percent: row.try_get::<i64, _>("discount_percent").map_err(DbError::from)? as u8,
        line_subtotal: Money::from_minor(row.try_get("line_subtotal").map_err(DbError::from)?),
        line_tax: Money::from_minor(row.try_get("line_tax").map_err(DbError::from)?),
        line_total: Money::from_minor(row.try_get("line_total").map_err(DbError::from)?),
        inventory_deducted: row.try_get("inventory_deducted").map_err(DbError::from)?,
    })
}

#[async_trait]
impl TransactionRepository for SqliteTransactionRepository {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Transaction>> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.as_ref().map(row_to_transaction).transpose()?)
    }

    async fn find_by_session(&self, session_id: &str) -> RepoResult<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE session_id = ?1 ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows
            .iter()
            .map(row_to_transaction)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn insert(
        &self,
        transaction: &Transaction,
        lines: &[TransactionLine],
    ) -> RepoResult<()> {
        debug!(
            id = %transaction.id,
            receipt_number = %transaction.receipt_number,
            lines = lines.len(),
            "Inserting transaction"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, tenant_id, session_id, receipt_number, status, payment_status,
                subtotal, tax_total, discount_total, total,
                created_at, updated_at, completed_at, voided_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.tenant_id)
        .bind(&transaction.session_id)
        .bind(&transaction.receipt_number)
        .bind(transaction.status.to_string())
        .bind(transaction.payment_status.to_string())
        .bind(transaction.subtotal.minor())
        .bind(transaction.tax_total.minor())
        .bind(transaction.discount_total.minor())
        .bind(transaction.total.minor())
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .bind(transaction.completed_at)
        .bind(transaction.voided_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO transaction_lines (
                    id, transaction_id, product_id, product_code, product_name, warehouse_id,
                    quantity, unit_price, vat_rate, discount_percent,
                    line_subtotal, line_tax, line_total, inventory_deducted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )
            .bind(&line.id)
            .bind(&line.transaction_id)
            .bind(&line.product_id)
            .bind(&line.product_code)
            .bind(&line.product_name)
            .bind(&line.warehouse_id)
            .bind(line.quantity.to_string())
            .bind(line.unit_price.minor())
            .bind(line.vat_rate.percent() as i64)
            .bind(line.discount_percent as i64)
            .bind(line.line_subtotal.minor())
            .bind(line.line_tax.minor())
            .bind(line.line_total.minor())
            .bind(line.inventory_deducted)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> RepoResult<()> {
        debug!(id = %transaction.id, status = %transaction.status, "Updating transaction");

        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                status = ?2,
                payment_status = ?3,
                updated_at = ?4,
                completed_at = ?5,
                voided_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&transaction.id)
        .bind(transaction.status.to_string())
        .bind(transaction.payment_status.to_string())
        .bind(transaction.updated_at)
        .bind(transaction.completed_at)
        .bind(transaction.voided_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", &transaction.id).into());
        }
        Ok(())
    }

    async fn find_lines(&self, transaction_id: &str) -> RepoResult<Vec<TransactionLine>> {
        let rows = sqlx::query(
            "SELECT * FROM transaction_lines WHERE transaction_id = ?1 ORDER BY id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.iter().map(row_to_line).collect::<Result<Vec<_>, _>>()?)
    }

    async fn mark_line_deducted(&self, line_id: &str) -> RepoResult<()> {
        let result = sqlx::query("UPDATE transaction_lines SET inventory_deducted = 1 WHERE id = ?1")
            .bind(line_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TransactionLine", line_id).into());
        }
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
    use registra_core::{Cart, NewLineItem, SessionStatus};
    use registra_engine::SessionRepository;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_session(db: &Database) -> registra_core::Session {
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
        session
    }

    fn committed_cart(session_id: &str) -> (Transaction, Vec<TransactionLine>) {
        let mut cart = Cart::new();
        cart.add_item(NewLineItem {
            product_id: "prod-a".to_string(),
            product_code: "SKU-A".to_string(),
            product_name: "Coffee".to_string(),
            quantity: "2.5".parse().unwrap(),
            unit_price: Money::from_minor(1000),
            vat_rate: VatRate::Standard27,
            discount_percent: 10,
        })
        .unwrap();
        cart.commit("tenant-1", session_id, "RCPT-0001", "wh-main", Utc::now())
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_round_trip_with_lines() {
        let db = db().await;
        let session = seed_session(&db).await;
        let (txn, lines) = committed_cart(&session.id);

        let repo = db.transactions();
        repo.insert(&txn, &lines).await.unwrap();

        let found = repo.find_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(found.receipt_number, "RCPT-0001");
        assert_eq!(found.total, txn.total);
        assert_eq!(found.status, TransactionStatus::PendingPayment);

        let found_lines = repo.find_lines(&txn.id).await.unwrap();
        assert_eq!(found_lines.len(), 1);
        // Decimal quantity survives the TEXT column.
        assert_eq!(found_lines[0].quantity, "2.5".parse::<Decimal>().unwrap());
        assert_eq!(found_lines[0].vat_rate, VatRate::Standard27);
        assert_eq!(found_lines[0].discount_percent, 10);
        assert!(!found_lines[0].inventory_deducted);
    }

    #[tokio::test]
    async fn test_duplicate_receipt_number_conflicts() {
        let db = db().await;
        let session = seed_session(&db).await;
        let repo = db.transactions();

        let (txn_a, lines_a) = committed_cart(&session.id);
        repo.insert(&txn_a, &lines_a).await.unwrap();

        let (txn_b, lines_b) = committed_cart(&session.id);
        let err = repo.insert(&txn_b, &lines_b).await.unwrap_err();
        assert!(matches!(err, registra_engine::RepoError::Conflict { .. }));
        // The failed insert left no orphaned lines behind.
        assert!(repo.find_lines(&txn_b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_line_deducted() {
        let db = db().await;
        let session = seed_session(&db).await;
        let repo = db.transactions();
        let (txn, lines) = committed_cart(&session.id);
        repo.insert(&txn, &lines).await.unwrap();

        repo.mark_line_deducted(&lines[0].id).await.unwrap();
        let found = repo.find_lines(&txn.id).await.unwrap();
        assert!(found[0].inventory_deducted);

        assert!(repo.mark_line_deducted("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_update_status_fields() {
        let db = db().await;
        let session = seed_session(&db).await;
        let repo = db.transactions();
        let (mut txn, lines) = committed_cart(&session.id);
        repo.insert(&txn, &lines).await.unwrap();

        txn.status = TransactionStatus::Completed;
        txn.payment_status = PaymentStatus::Paid;
        txn.completed_at = Some(Utc::now());
        repo.update(&txn).await.unwrap();

        let found = repo.find_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(found.status, TransactionStatus::Completed);
        assert!(found.completed_at.is_some());
    }
}
