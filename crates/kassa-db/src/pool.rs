//! # Database Handle
//!
//! Opens the SQLite store and hands out repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Kassa Storage                                      │
//! │                                                                         │
//! │  DbConfig::new("kassa.db")        DbConfig::in_memory()                 │
//! │       │  WAL, 5 connections           │  1 pinned connection          │
//! │       └──────────────┬────────────────┘                                 │
//! │                      ▼                                                  │
//! │            Database::new(config) ──► migrations                         │
//! │                      │                                                  │
//! │      ┌───────┬───────┼────────┬──────────────┬─────────┬─────────┐      │
//! │      ▼       ▼       ▼        ▼              ▼         ▼         ▼      │
//! │   shifts  checks  receipts transactions  promotions  floor   reports    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite serializes writers. Repositories open write transactions with
//! `BEGIN IMMEDIATE`, so two registers racing to open the same table queue
//! on the lock for up to `busy_timeout`; the second one then reads the
//! first one's check and resumes it.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::check::CheckRepository;
use crate::repository::floor::FloorRepository;
use crate::repository::promotion::PromotionRepository;
use crate::repository::receipt::ReceiptRepository;
use crate::repository::report::ReportRepository;
use crate::repository::shift::ShiftRepository;
use crate::repository::transaction::TransactionRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Storage settings.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("/var/lib/kassa/kassa.db").max_connections(8)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Pool size. Default: 5
    pub max_connections: u32,

    /// How long a writer waits for the SQLite lock. Default: 5 seconds
    pub busy_timeout: Duration,

    /// How long a handler waits for a free connection. Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Apply embedded migrations on connect. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed store; the file is created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Throwaway store for tests.
    ///
    /// Every connection to `:memory:` is a separate empty database, so the
    /// pool holds exactly one connection and never recycles it.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!("sqlite://{}", self.database_path.display())).map(|o| {
                o.journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .create_if_missing(true)
            })
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        // Off by default in SQLite; receipts and transactions reference shifts
        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared storage handle; clones share one pool.
///
/// Repositories are cheap views over the pool, created per call:
///
/// ```rust,ignore
/// let check = state.db.checks().open_or_resume(&state.ledger, req).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and, unless disabled, migrates.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening register database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout);
        pool_options = if config.is_in_memory() {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Duration::from_secs(600))
        };

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }

        info!(max_connections = config.max_connections, "Register database ready");
        Ok(db)
    }

    /// Raw pool for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Shift lifecycle, staff roster, denomination counts.
    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone())
    }

    /// Open tabs: open/resume, item edits, discounts, void.
    pub fn checks(&self) -> CheckRepository {
        CheckRepository::new(self.pool.clone())
    }

    /// Checkout and receipt corrections.
    pub fn receipts(&self) -> ReceiptRepository {
        ReceiptRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    pub fn promotions(&self) -> PromotionRepository {
        PromotionRepository::new(self.pool.clone())
    }

    /// Departments and tables with derived status.
    pub fn floor(&self) -> FloorRepository {
        FloorRepository::new(self.pool.clone())
    }

    /// Stored Z-reports and receipt analytics.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Drains the pool; later calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing register database");
        self.pool.close().await;
    }

    /// Whether a trivial query still succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
