//! # Repository Module
//!
//! Storage collaborators of the settlement engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Load ─► Decide ─► Store                              │
//! │                                                                         │
//! │  Handler                                                               │
//! │       │  db.checks().add_item(&ledger, id, item)                       │
//! │       ▼                                                                 │
//! │  CheckRepository                                                       │
//! │  ├── BEGIN                                                             │
//! │  ├── SELECT the aggregate (and anything the rule needs)                │
//! │  ├── kassa-core decides (pure, may reject)                             │
//! │  ├── guarded UPDATE ... WHERE id = ? AND status = 'open'               │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Updated aggregate returned to the caller, which folds it into state   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating call returns the updated aggregate.
//!
//! ## Available Repositories
//!
//! - [`ShiftRepository`](shift::ShiftRepository) - Shift lifecycle, staff, counts
//! - [`CheckRepository`](check::CheckRepository) - Open tabs
//! - [`ReceiptRepository`](receipt::ReceiptRepository) - Checkout and corrections
//! - [`TransactionRepository`](transaction::TransactionRepository) - Manual cash movements
//! - [`PromotionRepository`](promotion::PromotionRepository) - Promotion directory
//! - [`FloorRepository`](floor::FloorRepository) - Departments and tables
//! - [`ReportRepository`](report::ReportRepository) - Z-reports and analytics

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

pub mod check;
pub mod floor;
pub mod promotion;
pub mod receipt;
pub mod report;
pub mod shift;
pub mod transaction;

/// Venue-wide counter names.
pub(crate) const RECEIPT_COUNTER: &str = "receipt";
pub(crate) const SHIFT_COUNTER: &str = "shift";

/// Starts a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads first cannot upgrade to a writer once
/// another connection has committed; SQLite then fails with `database is
/// locked` without waiting. `BEGIN IMMEDIATE` queues on `busy_timeout`
/// instead, so racing registers run one after the other.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Bumps a counter inside the caller's transaction.
///
/// A rolled-back transaction leaves no gap.
pub(crate) async fn next_counter(tx: &mut Transaction<'_, Sqlite>, name: &str) -> DbResult<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("UPDATE counters SET value = value + 1 WHERE name = ? RETURNING value")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

    value.ok_or_else(|| DbError::not_found("Counter", name))
}

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod testing {
    use kassa_core::shift::{OpenShiftRequest, ShiftManager};
    use kassa_core::{Money, Shift};

    use crate::pool::{Database, DbConfig};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// WAL store on disk with a full pool, for racing writers.
    pub async fn file_database(dir: &tempfile::TempDir) -> Database {
        Database::new(DbConfig::new(dir.path().join("kassa.db")).max_connections(6))
            .await
            .unwrap()
    }

    pub async fn open_shift(db: &Database, start_major: i64) -> Shift {
        db.shifts()
            .open(
                &ShiftManager::default(),
                OpenShiftRequest {
                    start_balance: Money::from_major(start_major),
                    cashier_id: "staff-1".into(),
                    cashier_name: "Olena".into(),
                },
            )
            .await
            .unwrap()
    }
}
