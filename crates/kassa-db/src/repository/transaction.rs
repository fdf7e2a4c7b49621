//! # Transaction Repository
//!
//! Cash movements under a shift. Manual rows (income, expense, incasation)
//! come from the cashier; sale rows are written by checkout and rewritten
//! by receipt corrections, always linked through `receipt_id`.

use chrono::Utc;
use kassa_core::shift::ShiftManager;
use kassa_core::{NewTransaction, Transaction};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::info;

use super::begin_write;
use super::shift::find_shift;
use crate::error::{DbError, DbResult};

/// Repository for shift transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// All transactions of a shift, oldest first.
    pub async fn list(&self, shift_id: &str) -> DbResult<Vec<Transaction>> {
        list_for_shift(&self.pool, shift_id).await
    }

    /// Records a manual income / expense / incasation.
    ///
    /// The shift is re-read inside the transaction; a shift closed in the
    /// meantime rejects the row.
    pub async fn record(
        &self,
        manager: &ShiftManager,
        shift_id: &str,
        input: NewTransaction,
    ) -> DbResult<Transaction> {
        let mut tx = begin_write(&self.pool).await?;

        let shift = find_shift(&mut *tx, shift_id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", shift_id))?;
        let transaction = manager.record_transaction(&shift, input, Utc::now())?;
        insert(&mut tx, &transaction).await?;

        tx.commit().await?;

        info!(
            shift_id = %shift_id,
            kind = transaction.kind.as_str(),
            amount = transaction.amount.minor_units(),
            "Manual transaction recorded"
        );
        Ok(transaction)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn list_for_shift<'e>(
    executor: impl SqliteExecutor<'e>,
    shift_id: &str,
) -> DbResult<Vec<Transaction>> {
    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE shift_id = ? ORDER BY created_at, rowid",
    )
    .bind(shift_id)
    .fetch_all(executor)
    .await?;
    Ok(transactions)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (id, shift_id, kind, category, amount, comment, receipt_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.shift_id)
    .bind(transaction.kind)
    .bind(&transaction.category)
    .bind(transaction.amount)
    .bind(&transaction.comment)
    .bind(&transaction.receipt_id)
    .bind(transaction.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Drops the sale rows of a receipt before they are rewritten.
pub(crate) async fn delete_for_receipt(conn: &mut SqliteConnection, receipt_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM transactions WHERE receipt_id = ?")
        .bind(receipt_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{database, open_shift};
    use kassa_core::shift::CloseShiftRequest;
    use kassa_core::{CoreError, Money, TransactionKind};

    fn expense(major: i64) -> NewTransaction {
        NewTransaction {
            kind: TransactionKind::Expense,
            category: String::new(),
            amount: Money::from_major(major),
            comment: "napkins".into(),
        }
    }

    #[tokio::test]
    async fn test_record_signs_and_lists() {
        let db = database().await;
        let manager = ShiftManager::default();
        let shift = open_shift(&db, 1000).await;

        let recorded = db.transactions().record(&manager, &shift.id, expense(50)).await.unwrap();
        assert_eq!(recorded.amount, Money::from_major(-50));

        let listed = db.transactions().list(&shift.id).await.unwrap();
        assert_eq!(listed, vec![recorded]);

        let report = db.shifts().x_report(&shift.id).await.unwrap();
        assert_eq!(report.total_expenses, Money::from_major(50));
        assert_eq!(report.current_balance, Money::from_major(950));
    }

    #[tokio::test]
    async fn test_record_on_closed_shift_is_rejected() {
        let db = database().await;
        let manager = ShiftManager::default();
        let shift = open_shift(&db, 0).await;
        db.shifts()
            .close(&manager, &shift.id, CloseShiftRequest::default(), 10)
            .await
            .unwrap();

        let err = db.transactions().record(&manager, &shift.id, expense(10)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShiftNotOpen { .. })));
        assert!(db.transactions().list(&shift.id).await.unwrap().is_empty());
    }
}
