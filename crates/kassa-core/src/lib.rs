//! # kassa-core: Settlement Engine of the Kassa Register
//!
//! This crate is the **heart** of Kassa. It contains the shift, check,
//! checkout and reconciliation logic as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kassa Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Register frontend                            │   │
//! │  │   Department ──► Table ──► Check ──► Checkout ──► X / Z report  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST (JSON)                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 kassa-register-api (axum)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kassa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  allocation ◄── promotion ◄── check ◄── checkout                │   │
//! │  │                                            ▲                    │   │
//! │  │  denomination ◄── shift ◄── report ────────┘                    │   │
//! │  │                                                                 │   │
//! │  │  receipt (corrections)      register (navigation state)        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • TIME IS PASSED IN         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kassa-db (SQLite)                            │   │
//! │  │       unique open check per table, guarded transitions          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer minor-unit money
//! - [`types`] - Shift, Check, Receipt, Transaction, Promotion
//! - [`allocation`] - Payment split validation and discount distribution
//! - [`promotion`] - Promotion eligibility and discount computation
//! - [`check`] - Check ledger (open/resume, items, discounts, void)
//! - [`checkout`] - Check → Receipt
//! - [`shift`] - Shift lifecycle and manual transactions
//! - [`report`] - X-report, close preview, Z-report
//! - [`denomination`] - Cash counts and the autosave debounce model
//! - [`receipt`] - Audited receipt corrections
//! - [`register`] - Register navigation state machine
//! - [`error`] / [`validation`] - Error taxonomy and input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use kassa_core::money::Money;
//! use kassa_core::types::TaxRate;
//!
//! let total = Money::from_minor(12000); // 120.00 ₴, VAT included
//! let vat = total.included_tax(TaxRate::from_bps(2000));
//! assert_eq!(vat.minor_units(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod check;
pub mod checkout;
pub mod denomination;
pub mod error;
pub mod money;
pub mod promotion;
pub mod receipt;
pub mod register;
pub mod report;
pub mod shift;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Register id used when a venue runs a single register.
pub const DEFAULT_REGISTER_ID: &str = "main";

/// Maximum lines on a single check.
pub const MAX_CHECK_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

pub const MAX_GUESTS: u32 = 100;

/// Maximum length of free-text comments, in characters.
pub const MAX_COMMENT_LENGTH: usize = 500;
