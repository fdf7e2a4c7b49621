//! # Error Types
//!
//! Domain-specific error types for kassa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kassa-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kassa-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, unique/guard conflicts       │
//! │                                                                         │
//! │  register-api errors (app)                                             │
//! │  └── ApiError         - What the register frontend sees (serialized)   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! Every [`CoreError`] variant belongs to exactly one [`ErrorKind`]:
//! `Validation` (missing/invalid input), `Conflict` (invalid state
//! transition) or `NotFound` (stale or unknown id).

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by the transport layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An open shift already exists for this register.
    ///
    /// ## When This Occurs
    /// - Cashier presses "open shift" on a register whose previous shift
    ///   was never closed
    /// - Two devices race to open the first shift of the day
    #[error("Shift {shift_id} is already open on this register")]
    ShiftAlreadyOpen { shift_id: String },

    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// The shift exists but is closed.
    #[error("Shift {shift_id} is closed, cannot perform operation")]
    ShiftNotOpen { shift_id: String },

    /// The shift is still open (e.g. Z-report requested too early).
    #[error("Shift {shift_id} is still open")]
    ShiftStillOpen { shift_id: String },

    #[error("Check not found: {0}")]
    CheckNotFound(String),

    /// Check is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding items to a paid check
    /// - Voiding a check that was already voided
    /// - A second checkout of the same check
    #[error("Check {check_id} is {status}, cannot perform operation")]
    CheckNotOpen { check_id: String, status: String },

    #[error("Check has no items")]
    EmptyCheck,

    #[error("Line {0} not found on check")]
    LineNotFound(String),

    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    #[error("Promotion not found: {0}")]
    PromotionNotFound(String),

    #[error("Promotion {0} is not active")]
    PromotionInactive(String),

    /// The promotion's conditions do not all hold for the check.
    #[error("Promotion {0} is not applicable to this check")]
    PromotionNotApplicable(String),

    /// Mixed payment does not add up to the total and was not confirmed.
    ///
    /// ## User Workflow
    /// ```text
    /// cash 100 + card 140 for total 250
    ///      │
    ///      ▼
    /// SplitMismatch { delta: -10.00 }
    ///      │
    ///      ▼
    /// UI asks: "Payment differs by -10.00 ₴. Continue?"
    ///      │
    ///      ▼
    /// resend with confirmation → receipt issued, mismatch logged
    /// ```
    #[error("Payment split differs from total by {delta}")]
    SplitMismatch { delta: Money },

    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    #[error("Check cannot have more than {max} lines")]
    CheckTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Register navigation event that makes no sense in the current view.
    #[error("Cannot handle {event} while {view}")]
    InvalidTransition { view: String, event: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Maps the error onto the Validation / Conflict / NotFound taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ShiftNotFound(_)
            | CoreError::CheckNotFound(_)
            | CoreError::LineNotFound(_)
            | CoreError::ReceiptNotFound(_)
            | CoreError::PromotionNotFound(_) => ErrorKind::NotFound,

            CoreError::ShiftAlreadyOpen { .. }
            | CoreError::ShiftNotOpen { .. }
            | CoreError::ShiftStillOpen { .. }
            | CoreError::CheckNotOpen { .. }
            | CoreError::PromotionInactive(_)
            | CoreError::PromotionNotApplicable(_)
            | CoreError::SplitMismatch { .. }
            | CoreError::InvalidTransition { .. } => ErrorKind::Conflict,

            CoreError::EmptyCheck
            | CoreError::InvalidPaymentAmount { .. }
            | CoreError::CheckTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparsable nominal, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CheckNotOpen {
            check_id: "c-1".to_string(),
            status: "paid".to_string(),
        };
        assert_eq!(err.to_string(), "Check c-1 is paid, cannot perform operation");

        let err = CoreError::SplitMismatch {
            delta: Money::from_minor(-1000),
        };
        assert_eq!(err.to_string(), "Payment split differs from total by -10.00 ₴");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "cashierId".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CoreError::ShiftAlreadyOpen { shift_id: "s".into() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(CoreError::ShiftNotFound("s".into()).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::EmptyCheck.kind(), ErrorKind::Validation);
    }
}
