//! # Receipt Repository
//!
//! Checkout and audited receipt corrections.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── SELECT check                          (NotFound if stale id)     │
//! │   ├── SELECT open shift of the register     (ShiftNotOpen otherwise)   │
//! │   ├── counters.receipt += 1                 (gapless on rollback)      │
//! │   ├── kassa_core::checkout::checkout()      (pure: may reject)         │
//! │   ├── UPDATE checks ... WHERE status='open' (0 rows → Conflict)        │
//! │   ├── INSERT receipts                       (check_id UNIQUE)          │
//! │   └── INSERT transactions (sale_cash / sale_card)                      │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A second concurrent checkout of the same check fails at the guarded
//! update; it can never post a second receipt.

use chrono::Utc;
use kassa_core::checkout::{checkout, sale_transactions, CheckoutOutcome, CheckoutRequest};
use kassa_core::receipt::{correct_receipt, ReceiptCorrection};
use kassa_core::{CoreError, Receipt, ShiftStatus, TaxRate};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{info, warn};

use super::check::{find_check, save_guarded};
use super::shift::{find_open_shift, find_shift};
use super::{begin_write, next_counter, transaction, RECEIPT_COUNTER};
use crate::error::{DbError, DbResult};

/// Repository for receipts.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    pub async fn find(&self, id: &str) -> DbResult<Option<Receipt>> {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(receipt)
    }

    pub async fn get(&self, id: &str) -> DbResult<Receipt> {
        self.find(id).await?.ok_or_else(|| DbError::not_found("Receipt", id))
    }

    /// Receipts of a shift in issue order.
    pub async fn list(&self, shift_id: &str) -> DbResult<Vec<Receipt>> {
        list_for_shift(&self.pool, shift_id).await
    }

    /// Settles a check under the register's open shift.
    pub async fn checkout(&self, register_id: &str, req: &CheckoutRequest) -> DbResult<CheckoutOutcome> {
        let mut tx = begin_write(&self.pool).await?;

        let check = find_check(&mut *tx, &req.check_id)
            .await?
            .ok_or_else(|| DbError::not_found("Check", &req.check_id))?;
        let shift = find_open_shift(&mut *tx, register_id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotOpen {
                shift_id: check.shift_id.clone(),
            })?;

        let receipt_number = next_counter(&mut tx, RECEIPT_COUNTER).await?;
        let outcome = checkout(check, &shift, req, receipt_number, Utc::now())?;

        save_guarded(&mut tx, &outcome.check).await?;
        match insert(&mut tx, &outcome.receipt).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("receipts.check_id") => {
                return Err(DbError::Conflict(format!("check {} is already paid", req.check_id)));
            }
            Err(err) => return Err(err),
        }
        for row in &outcome.transactions {
            transaction::insert(&mut tx, row).await?;
        }

        tx.commit().await?;

        info!(
            check_id = %outcome.check.id,
            receipt_number,
            shift_id = %shift.id,
            method = outcome.receipt.payment_method.as_str(),
            total = outcome.receipt.total.minor_units(),
            "Receipt issued"
        );
        Ok(outcome)
    }

    /// Applies an administrative correction.
    ///
    /// Money-affecting corrections rewrite the receipt's sale transactions
    /// so the shift's X-report follows the corrected amounts.
    pub async fn correct(
        &self,
        tax_rate: TaxRate,
        id: &str,
        correction: ReceiptCorrection,
        actor: Option<String>,
    ) -> DbResult<Receipt> {
        let mut tx = begin_write(&self.pool).await?;

        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", id))?;

        let action = correction.action();
        let affects_money = correction.affects_money();
        let receipt = correct_receipt(receipt, correction, actor, tax_rate, Utc::now())?;

        update(&mut tx, &receipt).await?;

        if affects_money {
            transaction::delete_for_receipt(&mut tx, &receipt.id).await?;
            let details = receipt.payment_details.unwrap_or_default();
            for row in sale_transactions(&receipt, &details, receipt.created_at) {
                transaction::insert(&mut tx, &row).await?;
            }

            let shift = find_shift(&mut *tx, &receipt.shift_id).await?;
            if shift.is_some_and(|s| s.status == ShiftStatus::Closed) {
                warn!(
                    receipt_id = %receipt.id,
                    shift_id = %receipt.shift_id,
                    "Corrected a receipt of a closed shift; stored Z-report keeps the original totals"
                );
            }
        }

        tx.commit().await?;

        info!(
            receipt_id = %receipt.id,
            receipt_number = receipt.receipt_number,
            action = ?action,
            total = receipt.total.minor_units(),
            "Receipt corrected"
        );
        Ok(receipt)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn list_for_shift<'e>(executor: impl SqliteExecutor<'e>, shift_id: &str) -> DbResult<Vec<Receipt>> {
    let receipts = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE shift_id = ? ORDER BY receipt_number")
        .bind(shift_id)
        .fetch_all(executor)
        .await?;
    Ok(receipts)
}

async fn insert(conn: &mut SqliteConnection, receipt: &Receipt) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO receipts (
            id, receipt_number, check_id, shift_id, table_id, table_name,
            waiter_id, waiter_name, guests_count, items, subtotal, discount, tax, total,
            applied_promotion_id, payment_method, payment_details, amount_given, change_due,
            comment, customer_id, customer_name, created_at, updated_at, history
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&receipt.id)
    .bind(receipt.receipt_number)
    .bind(&receipt.check_id)
    .bind(&receipt.shift_id)
    .bind(&receipt.table_id)
    .bind(&receipt.table_name)
    .bind(&receipt.waiter_id)
    .bind(&receipt.waiter_name)
    .bind(receipt.guests_count)
    .bind(Json(&receipt.items))
    .bind(receipt.subtotal)
    .bind(receipt.discount)
    .bind(receipt.tax)
    .bind(receipt.total)
    .bind(&receipt.applied_promotion_id)
    .bind(receipt.payment_method)
    .bind(Json(&receipt.payment_details))
    .bind(receipt.amount_given)
    .bind(receipt.change)
    .bind(&receipt.comment)
    .bind(&receipt.customer_id)
    .bind(&receipt.customer_name)
    .bind(receipt.created_at)
    .bind(receipt.updated_at)
    .bind(Json(&receipt.history))
    .execute(conn)
    .await?;
    Ok(())
}

async fn update(conn: &mut SqliteConnection, receipt: &Receipt) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE receipts SET
            guests_count = ?,
            items = ?,
            subtotal = ?,
            discount = ?,
            tax = ?,
            total = ?,
            applied_promotion_id = ?,
            payment_method = ?,
            payment_details = ?,
            amount_given = ?,
            change_due = ?,
            comment = ?,
            updated_at = ?,
            history = ?
        WHERE id = ?
        "#,
    )
    .bind(receipt.guests_count)
    .bind(Json(&receipt.items))
    .bind(receipt.subtotal)
    .bind(receipt.discount)
    .bind(receipt.tax)
    .bind(receipt.total)
    .bind(&receipt.applied_promotion_id)
    .bind(receipt.payment_method)
    .bind(Json(&receipt.payment_details))
    .bind(receipt.amount_given)
    .bind(receipt.change)
    .bind(&receipt.comment)
    .bind(receipt.updated_at)
    .bind(Json(&receipt.history))
    .bind(&receipt.id)
    .execute(conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
