//! # kassa-db: Storage Layer for Kassa
//!
//! SQLite storage for the settlement engine, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa Data Flow                                  │
//! │                                                                         │
//! │  REST handler (POST /api/checkout)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kassa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ShiftRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CheckRepo     │    │ 001_initial_ │  │   │
//! │  │   │ Connection    │    │ ReceiptRepo   │    │ schema.sql   │  │   │
//! │  │   │ Management    │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           ▲                                                     │   │
//! │  │           │            ┌───────────────────────────────────┐   │   │
//! │  │           └────────────│ DenominationAutosave (debounced)  │   │   │
//! │  │                        └───────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees Owned Here
//!
//! - One open shift per register and one open check per table, both as
//!   partial unique indexes
//! - Gapless receipt and shift numbers, bumped inside the posting transaction
//! - Every transition of an open aggregate is a guarded `UPDATE`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kassa.db")).await?;
//! let shift = db.shifts().current("main").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod autosave;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use autosave::{CountStore, DenominationAutosave, AUTOSAVE_IDLE_STOP};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::check::CheckRepository;
pub use repository::floor::FloorRepository;
pub use repository::promotion::PromotionRepository;
pub use repository::receipt::ReceiptRepository;
pub use repository::report::ReportRepository;
pub use repository::shift::ShiftRepository;
pub use repository::transaction::TransactionRepository;
