//! # Check Repository
//!
//! Storage for open tabs.
//!
//! ## One Open Check per Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register A                         Register B                          │
//! │  POST /checks {table t-4}           POST /checks {table t-4}            │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  BEGIN IMMEDIATE                    BEGIN IMMEDIATE                     │
//! │  no open check; INSERT; COMMIT ──┐    waits on busy_timeout             │
//! │                                  │       │                              │
//! │                                  └─────► SELECT open check → Resumed    │
//! │                                                                         │
//! │  Both registers end up on the same check id. The partial unique index  │
//! │  on checks.table_id backs this up: a violation re-reads the winner.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation loads the check, lets [`CheckLedger`] decide, and writes
//! back with `WHERE id = ? AND status = 'open'`. A check paid or voided in
//! between is a conflict, never a silent overwrite.

use chrono::Utc;
use kassa_core::check::{CheckLedger, CheckUpdate, OpenCheckRequest, OpenOutcome};
use kassa_core::{Check, CheckStatus, CoreError, Money, NewCartItem, Promotion};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use super::begin_write;
use super::promotion::find_promotion;
use super::shift::find_shift;
use crate::error::{DbError, DbResult};

/// Repository for check database operations.
#[derive(Debug, Clone)]
pub struct CheckRepository {
    pool: SqlitePool,
}

impl CheckRepository {
    /// Creates a new CheckRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CheckRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find(&self, id: &str) -> DbResult<Option<Check>> {
        find_check(&self.pool, id).await
    }

    /// Gets a check by ID, failing with NotFound.
    pub async fn get(&self, id: &str) -> DbResult<Check> {
        self.find(id).await?.ok_or_else(|| DbError::not_found("Check", id))
    }

    /// Lists checks, optionally by status, oldest first.
    pub async fn list(&self, status: Option<CheckStatus>) -> DbResult<Vec<Check>> {
        let checks = match status {
            Some(status) => {
                sqlx::query_as::<_, Check>("SELECT * FROM checks WHERE status = ? ORDER BY created_at")
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Check>("SELECT * FROM checks ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(checks)
    }

    /// The open check of a table, if any.
    pub async fn open_for_table(&self, table_id: &str) -> DbResult<Option<Check>> {
        find_open_for_table(&self.pool, table_id).await
    }

    // =========================================================================
    // Open / Resume
    // =========================================================================

    /// Opens a check for a table, or returns the one already open there.
    ///
    /// Idempotent: calling it twice for the same table yields the same id.
    pub async fn open_or_resume(&self, ledger: &CheckLedger, req: OpenCheckRequest) -> DbResult<OpenOutcome> {
        let mut tx = begin_write(&self.pool).await?;

        let shift = find_shift(&mut *tx, &req.shift_id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", &req.shift_id))?;
        let existing = find_open_for_table(&mut *tx, &req.table_id).await?;
        let table_id = req.table_id.clone();

        let outcome = ledger.open_check(existing, &shift, req, Utc::now())?;
        let check = match outcome {
            OpenOutcome::Resumed(check) => return Ok(OpenOutcome::Resumed(check)),
            OpenOutcome::Created(check) => check,
        };

        match insert(&mut tx, &check).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("checks.table_id") => {
                // Another register opened it first; hand back theirs
                let winner = find_open_for_table(&mut *tx, &table_id)
                    .await?
                    .ok_or_else(|| DbError::Conflict(format!("table {table_id} changed concurrently")))?;
                debug!(check_id = %winner.id, table_id = %table_id, "Open raced, resuming winner");
                return Ok(OpenOutcome::Resumed(winner));
            }
            Err(err) => return Err(err),
        }

        tx.commit().await?;

        info!(
            check_id = %check.id,
            table_id = %check.table_id,
            shift_id = %check.shift_id,
            "Check opened"
        );
        Ok(OpenOutcome::Created(check))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn add_item(&self, ledger: &CheckLedger, id: &str, item: NewCartItem) -> DbResult<Check> {
        self.mutate(id, None, |check, promo| {
            ledger.add_item(check, item, promo, Utc::now())
        })
        .await
    }

    /// Sets a line's quantity; zero removes it.
    pub async fn update_quantity(
        &self,
        ledger: &CheckLedger,
        id: &str,
        service_id: &str,
        quantity: i64,
    ) -> DbResult<Check> {
        self.mutate(id, None, |check, promo| {
            ledger.update_quantity(check, service_id, quantity, promo, Utc::now())
        })
        .await
    }

    pub async fn remove_item(&self, ledger: &CheckLedger, id: &str, service_id: &str) -> DbResult<Check> {
        self.mutate(id, None, |check, promo| {
            ledger.remove_item(check, service_id, promo, Utc::now())
        })
        .await
    }

    /// Applies a `PUT /checks/:id` body. Client totals are recomputed.
    pub async fn update(&self, ledger: &CheckLedger, id: &str, update: CheckUpdate) -> DbResult<Check> {
        let promotion_id = update.applied_promotion_id.clone();
        self.mutate(id, promotion_id.as_deref(), |check, promo| {
            ledger.apply_update(check, update, promo, Utc::now())
        })
        .await
    }

    pub async fn set_discount_percent(&self, ledger: &CheckLedger, id: &str, percent: u32) -> DbResult<Check> {
        self.mutate(id, None, |check, _| {
            ledger.set_discount_percent(check, percent, Utc::now())
        })
        .await
    }

    pub async fn set_discount_amount(&self, ledger: &CheckLedger, id: &str, amount: Money) -> DbResult<Check> {
        self.mutate(id, None, |check, _| {
            ledger.set_discount_amount(check, amount, Utc::now())
        })
        .await
    }

    /// Applies a promotion; re-applying the same one replaces it.
    pub async fn apply_promotion(&self, ledger: &CheckLedger, id: &str, promotion_id: &str) -> DbResult<Check> {
        self.mutate(id, Some(promotion_id), |check, promo| {
            let promo = promo.ok_or_else(|| CoreError::PromotionNotFound(promotion_id.to_string()))?;
            ledger.apply_promotion(check, promo, Utc::now())
        })
        .await
    }

    pub async fn revoke_promotion(&self, ledger: &CheckLedger, id: &str) -> DbResult<Check> {
        self.mutate(id, None, |check, _| ledger.revoke_promotion(check, Utc::now()))
            .await
    }

    /// Cancels an open check; no receipt is produced and the table frees up.
    pub async fn void(&self, ledger: &CheckLedger, id: &str) -> DbResult<Check> {
        let check = self
            .mutate(id, None, |check, _| ledger.void_check(check, Utc::now()))
            .await?;
        info!(check_id = %id, table_id = %check.table_id, "Check voided");
        Ok(check)
    }

    /// Load → decide → guarded store, in one transaction.
    ///
    /// The promotion handed to `op` is `promotion_id` if given, otherwise
    /// the check's currently applied one.
    async fn mutate<F>(&self, id: &str, promotion_id: Option<&str>, op: F) -> DbResult<Check>
    where
        F: FnOnce(Check, Option<&Promotion>) -> Result<Check, CoreError>,
    {
        let mut tx = begin_write(&self.pool).await?;

        let check = find_check(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Check", id))?;

        let promotion = match promotion_id.or(check.applied_promotion_id.as_deref()) {
            Some(promotion_id) => find_promotion(&mut *tx, promotion_id).await?,
            None => None,
        };

        let check = op(check, promotion.as_ref())?;
        save_guarded(&mut tx, &check).await?;

        tx.commit().await?;

        debug!(
            check_id = %check.id,
            lines = check.items.len(),
            total = check.total.minor_units(),
            "Check updated"
        );
        Ok(check)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn find_check<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<Check>> {
    let check = sqlx::query_as::<_, Check>("SELECT * FROM checks WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(check)
}

async fn find_open_for_table<'e>(executor: impl SqliteExecutor<'e>, table_id: &str) -> DbResult<Option<Check>> {
    let check = sqlx::query_as::<_, Check>("SELECT * FROM checks WHERE table_id = ? AND status = 'open'")
        .bind(table_id)
        .fetch_optional(executor)
        .await?;
    Ok(check)
}

async fn insert(conn: &mut SqliteConnection, check: &Check) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO checks (
            id, shift_id, table_id, table_name, department_id, waiter_id, waiter_name,
            guests_count, items, subtotal, discount, discount_percent, manual_discount,
            applied_promotion_id, tax, total, customer_id, customer_name, comment, status,
            created_at, updated_at, closed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&check.id)
    .bind(&check.shift_id)
    .bind(&check.table_id)
    .bind(&check.table_name)
    .bind(&check.department_id)
    .bind(&check.waiter_id)
    .bind(&check.waiter_name)
    .bind(check.guests_count)
    .bind(Json(&check.items))
    .bind(check.subtotal)
    .bind(check.discount)
    .bind(check.discount_percent)
    .bind(check.manual_discount)
    .bind(&check.applied_promotion_id)
    .bind(check.tax)
    .bind(check.total)
    .bind(&check.customer_id)
    .bind(&check.customer_name)
    .bind(&check.comment)
    .bind(check.status)
    .bind(check.created_at)
    .bind(check.updated_at)
    .bind(check.closed_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Writes every mutable column, but only while the row is still open.
pub(crate) async fn save_guarded(conn: &mut SqliteConnection, check: &Check) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE checks SET
            guests_count = ?,
            items = ?,
            subtotal = ?,
            discount = ?,
            discount_percent = ?,
            manual_discount = ?,
            applied_promotion_id = ?,
            tax = ?,
            total = ?,
            customer_id = ?,
            customer_name = ?,
            comment = ?,
            status = ?,
            updated_at = ?,
            closed_at = ?
        WHERE id = ? AND status = 'open'
        "#,
    )
    .bind(check.guests_count)
    .bind(Json(&check.items))
    .bind(check.subtotal)
    .bind(check.discount)
    .bind(check.discount_percent)
    .bind(check.manual_discount)
    .bind(&check.applied_promotion_id)
    .bind(check.tax)
    .bind(check.total)
    .bind(&check.customer_id)
    .bind(&check.customer_name)
    .bind(&check.comment)
    .bind(check.status)
    .bind(check.updated_at)
    .bind(check.closed_at)
    .bind(&check.id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Conflict(format!("check {} is no longer open", check.id)));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
