//! # Shift Repository
//!
//! Storage for the shift aggregate: open/close, staff roster, denomination
//! counts, and the Z-report frozen at close.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Shift Lifecycle                                   │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── open() → Shift { status: open, shiftNumber: N }                │
//! │         (idx_shifts_one_open rejects a second open shift)              │
//! │                                                                         │
//! │  2. WORK                                                               │
//! │     └── update_active_staff() / amend_denominations()                  │
//! │     └── receipts + transactions appended by other repositories         │
//! │                                                                         │
//! │  3. CLOSE (one transaction)                                            │
//! │     └── X-report → expected balance → Shift { status: closed }         │
//! │     └── Z-report frozen into z_reports                                 │
//! │                                                                         │
//! │  4. (OPTIONAL) AMEND COUNT                                             │
//! │     └── amend_denominations() → cashDifference + stored Z-report       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use kassa_core::denomination::counted_total;
use kassa_core::report::{build_x_report, build_z_report, preview_close, refresh_z_report_count, ClosePreview, XReport, ZReport};
use kassa_core::shift::{CloseShiftRequest, OpenShiftRequest, ShiftManager};
use kassa_core::{CoreError, DenominationCounts, Shift, ShiftStatus};
use sqlx::types::Json;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use super::{begin_write, next_counter, receipt, transaction, SHIFT_COUNTER};
use crate::error::{DbError, DbResult};

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a shift by ID.
    pub async fn find(&self, id: &str) -> DbResult<Option<Shift>> {
        find_shift(&self.pool, id).await
    }

    /// Gets a shift by ID, failing with NotFound.
    pub async fn get(&self, id: &str) -> DbResult<Shift> {
        self.find(id).await?.ok_or_else(|| DbError::not_found("Shift", id))
    }

    /// The open shift of a register, if any.
    pub async fn current(&self, register_id: &str) -> DbResult<Option<Shift>> {
        find_open_shift(&self.pool, register_id).await
    }

    /// Lists shifts, newest first.
    pub async fn list(&self, status: Option<ShiftStatus>, limit: i64) -> DbResult<Vec<Shift>> {
        let shifts = match status {
            Some(status) => {
                sqlx::query_as::<_, Shift>(
                    "SELECT * FROM shifts WHERE status = ? ORDER BY start_time DESC LIMIT ?",
                )
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Shift>("SELECT * FROM shifts ORDER BY start_time DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(shifts)
    }

    /// Live X-report of a shift (open or closed).
    pub async fn x_report(&self, id: &str) -> DbResult<XReport> {
        let shift = self.get(id).await?;
        let receipts = receipt::list_for_shift(&self.pool, id).await?;
        let transactions = transaction::list_for_shift(&self.pool, id).await?;
        Ok(build_x_report(&shift, &receipts, &transactions))
    }

    /// What closing now would produce, without closing.
    pub async fn close_preview(&self, id: &str, top_limit: usize) -> DbResult<ClosePreview> {
        let shift = self.get(id).await?;
        let receipts = receipt::list_for_shift(&self.pool, id).await?;
        let transactions = transaction::list_for_shift(&self.pool, id).await?;
        Ok(preview_close(&shift, &receipts, &transactions, Utc::now(), top_limit))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Opens a shift on the manager's register.
    ///
    /// The shift number is taken from the venue counter in the same
    /// transaction, so a rejected open leaves no gap.
    pub async fn open(&self, manager: &ShiftManager, req: OpenShiftRequest) -> DbResult<Shift> {
        let mut tx = begin_write(&self.pool).await?;

        let existing = find_open_shift(&mut *tx, manager.register_id()).await?;
        let shift_number = next_counter(&mut tx, SHIFT_COUNTER).await?;
        let shift = manager.open_shift(existing.as_ref(), req, shift_number, Utc::now())?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO shifts (
                id, register_id, shift_number, cashier_id, cashier_name,
                start_time, end_time, start_balance, end_balance, status,
                active_staff_ids, denomination_counts, cash_difference
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.register_id)
        .bind(shift.shift_number)
        .bind(&shift.cashier_id)
        .bind(&shift.cashier_name)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.start_balance)
        .bind(shift.end_balance)
        .bind(shift.status)
        .bind(Json(&shift.active_staff_ids))
        .bind(Json(&shift.denomination_counts))
        .bind(shift.cash_difference)
        .execute(&mut *tx)
        .await;

        match inserted.map_err(DbError::from) {
            Ok(_) => {}
            // Lost the race against another register terminal
            Err(err) if err.is_unique_violation_on("shifts.register_id") => {
                let open = find_open_shift(&mut *tx, manager.register_id()).await?;
                return Err(CoreError::ShiftAlreadyOpen {
                    shift_id: open.map(|s| s.id).unwrap_or_default(),
                }
                .into());
            }
            Err(err) => return Err(err),
        }

        tx.commit().await?;
        Ok(shift)
    }

    /// Replaces the active staff roster of an open shift.
    pub async fn update_active_staff(
        &self,
        manager: &ShiftManager,
        id: &str,
        staff_ids: Vec<String>,
    ) -> DbResult<Shift> {
        let mut tx = begin_write(&self.pool).await?;

        let shift = find_shift(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", id))?;
        let shift = manager.update_active_staff(shift, staff_ids)?;

        let result = sqlx::query(
            "UPDATE shifts SET active_staff_ids = ? WHERE id = ? AND status = 'open'",
        )
        .bind(Json(&shift.active_staff_ids))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!("shift {id} is not open")));
        }

        tx.commit().await?;
        debug!(shift_id = %id, staff = shift.active_staff_ids.len(), "Active staff updated");
        Ok(shift)
    }

    /// Closes an open shift and freezes its Z-report.
    ///
    /// ## What This Does
    /// 1. Aggregates receipts + transactions into the expected balance
    /// 2. Closes the shift (end balance defaults to the expected balance)
    /// 3. Guarded update: a shift closed concurrently is a conflict
    /// 4. Stores the Z-report
    pub async fn close(
        &self,
        manager: &ShiftManager,
        id: &str,
        req: CloseShiftRequest,
        top_limit: usize,
    ) -> DbResult<(Shift, ZReport)> {
        let mut tx = begin_write(&self.pool).await?;

        let shift = find_shift(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", id))?;
        let receipts = receipt::list_for_shift(&mut *tx, id).await?;
        let transactions = transaction::list_for_shift(&mut *tx, id).await?;

        let expected = build_x_report(&shift, &receipts, &transactions).current_balance;
        let shift = manager.close_shift(shift, req, expected, Utc::now())?;

        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                status = ?,
                end_time = ?,
                end_balance = ?,
                denomination_counts = ?,
                cash_difference = ?
            WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(shift.status)
        .bind(shift.end_time)
        .bind(shift.end_balance)
        .bind(Json(&shift.denomination_counts))
        .bind(shift.cash_difference)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!("shift {id} was closed concurrently")));
        }

        let report = build_z_report(&shift, &receipts, &transactions, top_limit)?;
        sqlx::query("INSERT INTO z_reports (shift_id, shift_number, end_time, report) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(shift.shift_number)
            .bind(report.end_time)
            .bind(Json(&report))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            shift_id = %id,
            shift_number = shift.shift_number,
            receipts = report.summary.receipts_count,
            expected_balance = expected.minor_units(),
            "Z-report stored"
        );
        Ok((shift, report))
    }

    /// Replaces the denomination count of a shift, open or closed.
    ///
    /// On a closed shift the stored Z-report is refreshed as well.
    pub async fn amend_denominations(
        &self,
        manager: &ShiftManager,
        id: &str,
        counts: &DenominationCounts,
    ) -> DbResult<Shift> {
        let mut tx = begin_write(&self.pool).await?;

        let shift = find_shift(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", id))?;
        let shift = manager.amend_denominations(shift, counts)?;

        sqlx::query("UPDATE shifts SET denomination_counts = ?, cash_difference = ? WHERE id = ?")
            .bind(Json(&shift.denomination_counts))
            .bind(shift.cash_difference)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if shift.status == ShiftStatus::Closed {
            let stored: Option<Json<ZReport>> =
                sqlx::query_scalar("SELECT report FROM z_reports WHERE shift_id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;

            if let Some(Json(report)) = stored {
                let report = refresh_z_report_count(report, &shift.denomination_counts)?;
                sqlx::query("UPDATE z_reports SET report = ? WHERE shift_id = ?")
                    .bind(Json(&report))
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        debug!(
            shift_id = %id,
            counted = counted_total(&shift.denomination_counts)?.minor_units(),
            cash_difference = ?shift.cash_difference.map(|m| m.minor_units()),
            "Denomination count saved"
        );
        Ok(shift)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn find_shift<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<Shift>> {
    let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(shift)
}

pub(crate) async fn find_open_shift<'e>(
    executor: impl SqliteExecutor<'e>,
    register_id: &str,
) -> DbResult<Option<Shift>> {
    let shift = sqlx::query_as::<_, Shift>(
        "SELECT * FROM shifts WHERE register_id = ? AND status = 'open'",
    )
    .bind(register_id)
    .fetch_optional(executor)
    .await?;
    Ok(shift)
}

// =============================================================================
// Unit Tests
// =============================================================================
