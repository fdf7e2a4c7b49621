//! # Kassa Register API
//!
//! REST server the register frontend talks to.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Register API Routes                             │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  shifts        │  │  checks        │  │  checkout / receipts       ││
//! │  │                │  │                │  │                            ││
//! │  │ • open / close │  │ • open|resume  │  │ • POST /checkout           ││
//! │  │ • staff        │  │ • items        │  │ • GET/PUT /receipts/{id}   ││
//! │  │ • x-report     │  │ • promotion    │  │                            ││
//! │  │ • counts       │  │ • void         │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐            │
//! │  │  reports       │  │  floor         │  │  promotions    │            │
//! │  │ • z-reports    │  │ • departments  │  │ • list / save  │            │
//! │  │ • analytics    │  │ • tables       │  │                │            │
//! │  └────────────────┘  └────────────────┘  └────────────────┘            │
//! │                                                                         │
//! │         every handler: load ─► kassa-core decides ─► kassa-db stores    │
//! │         and returns the updated aggregate in {success, data}            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::AppConfig`]):
//! - `KASSA_HTTP_PORT` - HTTP port (default: 8080)
//! - `KASSA_DATABASE_PATH` - SQLite file (default: ./kassa.db)
//! - `KASSA_REGISTER_ID` - register scope of the open shift (default: main)
//! - `KASSA_TAX_RATE` - included tax in percent (default: 0)
//! - `KASSA_AUTOSAVE_MS` - denomination autosave window (default: 800)
//! - `KASSA_LOG` - tracing filter (default: info,kassa=debug)

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::AppConfig;
pub use error::{ApiError, ErrorCode};
pub use routes::build_router;
pub use state::AppState;
