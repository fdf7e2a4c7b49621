//! # API Error Type
//!
//! Unified error type for REST handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kassa                                  │
//! │                                                                         │
//! │  Register                    Rust Backend                               │
//! │  ────────                    ────────────                               │
//! │                                                                         │
//! │  POST /checkout                                                         │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<ApiResponse<T>>, ApiError>                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Storage down? ──── DbError::ConnectionFailed ─────┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Rule broken? ───── CoreError::SplitMismatch ──── ApiError ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  409 {"success":false,"error":{"code":"SPLIT_MISMATCH",                 │
//! │        "message":"...","details":{"delta":-2000}}}                      │
//! │  → register asks the cashier, resends with confirmMismatch: true        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kassa_core::{CoreError, ErrorKind, ValidationError};
use kassa_db::DbError;
use serde::Serialize;
use serde_json::Value;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "success": false,
///   "error": { "code": "NOT_FOUND", "message": "Check not found: c-1" }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Structured context, e.g. `delta` of a split mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Error codes for API responses.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (body.error.code) {
///   case 'SPLIT_MISMATCH':
///     if (confirm(`Off by ${body.error.details.delta}`)) resend({ confirmMismatch: true });
///     break;
///   case 'CONFLICT':
///     toast(body.error.message);
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Invalid state transition or duplicate (409)
    Conflict,

    /// Resource not found (404)
    NotFound,

    /// Payment split does not add up; confirmable (409)
    SplitMismatch,

    /// Database operation failed (500)
    DatabaseError,

    /// Storage unreachable (503)
    Unavailable,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict | ErrorCode::SplitMismatch => StatusCode::CONFLICT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Conflict, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

fn code_for(kind: ErrorKind) -> ErrorCode {
    match kind {
        ErrorKind::Validation => ErrorCode::ValidationError,
        ErrorKind::Conflict => ErrorCode::Conflict,
        ErrorKind::NotFound => ErrorCode::NotFound,
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SplitMismatch { delta } => ApiError::new(ErrorCode::SplitMismatch, err.to_string())
                .with_details(serde_json::json!({ "delta": delta.minor_units() })),
            other => ApiError::new(code_for(other.kind()), other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::Conflict(message) => ApiError::conflict(message),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::Unavailable, "Storage is unavailable, please retry")
            }
            DbError::Busy => {
                tracing::warn!("Database write lock wait timed out");
                ApiError::new(ErrorCode::Unavailable, "Storage is busy, please retry")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::Unavailable, "Storage is busy, please retry")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) | DbError::Serialization(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                ApiError::internal("Internal error")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self,
        };
        (self.status(), Json(&body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(ApiResponse { success: true, data })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_core::Money;

    #[test]
    fn test_split_mismatch_carries_delta() {
        let err: ApiError = CoreError::SplitMismatch {
            delta: Money::from_major(-20),
        }
        .into();
        assert_eq!(err.code, ErrorCode::SplitMismatch);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.details, Some(serde_json::json!({ "delta": -2000 })));
    }

    #[test]
    fn test_db_errors_map_to_taxonomy() {
        let err: ApiError = DbError::Domain(CoreError::ShiftNotOpen { shift_id: "s-1".into() }).into();
        assert_eq!(err.code, ErrorCode::Conflict);

        let err: ApiError = DbError::not_found("Check", "c-1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Check not found: c-1");

        let err: ApiError = DbError::ConnectionFailed("refused".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = DbError::Busy.into();
        assert_eq!(err.code, ErrorCode::Unavailable);

        let err: ApiError = DbError::Conflict("check c-1 is not open".into()).into();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::validation("cashierId is required");
        let body = serde_json::to_value(ErrorBody {
            success: false,
            error: &err,
        })
        .unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"].get("details").is_none());
    }
}
