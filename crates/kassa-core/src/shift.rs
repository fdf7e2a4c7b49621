//! # Shift Manager
//!
//! Lifecycle of a cashier shift on one register.
//!
//! ```text
//!   openShift ──► ┌──────────┐  closeShift  ┌──────────┐
//!                 │   open   │─────────────►│  closed  │
//!                 └──────────┘              └──────────┘
//!                  │  ▲                       │  ▲
//!                  └──┘ staff roster,         └──┘ denomination
//!                       transactions,              amendments only
//!                       denominations
//! ```
//!
//! Balances are never stored on the open shift; they are derived from its
//! receipts and transactions by the reporter. Close freezes `endBalance`
//! and `endTime`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::denomination::{cash_difference, DenominationSet};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    DenominationCounts, NewTransaction, Shift, ShiftStatus, Transaction, TransactionKind,
};
use crate::validation::{
    validate_comment, validate_non_negative_amount, validate_positive_amount, validate_required,
};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /shifts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftRequest {
    pub start_balance: Money,
    #[serde(default)]
    pub cashier_id: String,
    #[serde(default)]
    pub cashier_name: String,
}

/// Close parameters of `PUT /shifts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftRequest {
    /// Defaults to the computed balance.
    #[serde(default)]
    pub end_balance: Option<Money>,
    #[serde(default)]
    pub denomination_counts: Option<DenominationCounts>,
}

/// A manual transaction as posted, either typed or with a free-text label
/// from an older register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: String,
    pub amount: Money,
    #[serde(default)]
    pub comment: String,
}

impl TransactionInput {
    /// Resolves the kind once; downstream code never looks at labels.
    pub fn resolve(self) -> CoreResult<NewTransaction> {
        let kind = match (self.kind, self.label.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(label)) => TransactionKind::resolve_legacy(label, &self.category)
                .ok_or_else(|| ValidationError::InvalidFormat {
                    field: "type".to_string(),
                    reason: format!("cannot resolve transaction type from '{label}'"),
                })?,
            (None, None) => {
                return Err(ValidationError::Required {
                    field: "type".to_string(),
                }
                .into())
            }
        };

        Ok(NewTransaction {
            kind,
            category: self.category,
            amount: self.amount,
            comment: self.comment,
        })
    }
}

// =============================================================================
// Manager
// =============================================================================

#[derive(Debug, Clone)]
pub struct ShiftManager {
    register_id: String,
    denominations: DenominationSet,
}

impl ShiftManager {
    pub fn new(register_id: impl Into<String>, denominations: DenominationSet) -> Self {
        Self {
            register_id: register_id.into(),
            denominations,
        }
    }

    pub fn register_id(&self) -> &str {
        &self.register_id
    }

    pub fn denominations(&self) -> &DenominationSet {
        &self.denominations
    }

    /// Opens a shift. `existing_open` is the register's open shift, if any.
    pub fn open_shift(
        &self,
        existing_open: Option<&Shift>,
        req: OpenShiftRequest,
        shift_number: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Shift> {
        if let Some(open) = existing_open.filter(|s| s.is_open()) {
            return Err(CoreError::ShiftAlreadyOpen {
                shift_id: open.id.clone(),
            });
        }
        validate_required("cashierId", &req.cashier_id)?;
        validate_non_negative_amount("startBalance", req.start_balance)?;

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            register_id: self.register_id.clone(),
            shift_number,
            cashier_name: if req.cashier_name.trim().is_empty() {
                req.cashier_id.clone()
            } else {
                req.cashier_name
            },
            active_staff_ids: vec![req.cashier_id.clone()],
            cashier_id: req.cashier_id,
            start_time: now,
            end_time: None,
            start_balance: req.start_balance,
            end_balance: None,
            status: ShiftStatus::Open,
            denomination_counts: DenominationCounts::new(),
            cash_difference: None,
        };

        info!(
            shift_id = %shift.id,
            shift_number,
            cashier_id = %shift.cashier_id,
            start_balance = shift.start_balance.minor_units(),
            "Shift opened"
        );
        Ok(shift)
    }

    /// Replaces the staff roster. Balances are untouched.
    pub fn update_active_staff(&self, mut shift: Shift, staff_ids: Vec<String>) -> CoreResult<Shift> {
        ensure_open(&shift)?;

        let mut roster: Vec<String> = Vec::with_capacity(staff_ids.len());
        for id in staff_ids {
            let id = id.trim().to_string();
            if !id.is_empty() && !roster.contains(&id) {
                roster.push(id);
            }
        }
        shift.active_staff_ids = roster;
        Ok(shift)
    }

    /// Closes an open shift.
    ///
    /// `expected_balance` is the reporter's `currentBalance`; it becomes
    /// the end balance unless the request overrides it.
    pub fn close_shift(
        &self,
        mut shift: Shift,
        req: CloseShiftRequest,
        expected_balance: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Shift> {
        ensure_open(&shift)?;

        let end_balance = req.end_balance.unwrap_or(expected_balance);
        if let Some(counts) = req.denomination_counts {
            shift.denomination_counts = self.denominations.normalize(&counts)?;
        }

        shift.status = ShiftStatus::Closed;
        shift.end_time = Some(now);
        shift.end_balance = Some(end_balance);
        shift.cash_difference = cash_difference(&shift.denomination_counts, end_balance)?;

        info!(
            shift_id = %shift.id,
            end_balance = end_balance.minor_units(),
            cash_difference = ?shift.cash_difference.map(|m| m.minor_units()),
            "Shift closed"
        );
        Ok(shift)
    }

    /// Replaces the advisory cash count. Allowed after close, where it
    /// re-derives `cashDifference`.
    pub fn amend_denominations(&self, mut shift: Shift, counts: &DenominationCounts) -> CoreResult<Shift> {
        shift.denomination_counts = self.denominations.normalize(counts)?;
        if let Some(end_balance) = shift.end_balance {
            shift.cash_difference = cash_difference(&shift.denomination_counts, end_balance)?;
        }
        Ok(shift)
    }

    /// Records a manual income / expense / incasation on an open shift.
    pub fn record_transaction(
        &self,
        shift: &Shift,
        input: NewTransaction,
        now: DateTime<Utc>,
    ) -> CoreResult<Transaction> {
        ensure_open(shift)?;
        if !input.kind.is_manual() {
            return Err(ValidationError::InvalidFormat {
                field: "type".to_string(),
                reason: "sale transactions are written by checkout".to_string(),
            }
            .into());
        }
        validate_positive_amount("amount", input.amount)?;
        validate_comment(&input.comment)?;

        let category = if input.category.trim().is_empty() {
            default_category(input.kind).to_string()
        } else {
            input.category
        };

        Ok(Transaction {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id.clone(),
            kind: input.kind,
            category,
            amount: input.kind.signed(input.amount),
            comment: input.comment,
            receipt_id: None,
            created_at: now,
        })
    }
}

impl Default for ShiftManager {
    fn default() -> Self {
        Self::new(crate::DEFAULT_REGISTER_ID, DenominationSet::uah())
    }
}

fn ensure_open(shift: &Shift) -> CoreResult<()> {
    if shift.is_open() {
        Ok(())
    } else {
        Err(CoreError::ShiftNotOpen {
            shift_id: shift.id.clone(),
        })
    }
}

fn default_category(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "income",
        TransactionKind::Expense => "expense",
        TransactionKind::Incasation => "incasation",
        TransactionKind::SaleCash | TransactionKind::SaleCard => crate::checkout::SALES_CATEGORY,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-14T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn open(manager: &ShiftManager) -> Shift {
        manager
            .open_shift(
                None,
                OpenShiftRequest {
                    start_balance: Money::from_major(1000),
                    cashier_id: "staff-1".into(),
                    cashier_name: "Olena".into(),
                },
                7,
                now(),
            )
            .unwrap()
    }

    #[test]
    fn test_open_shift_seeds_roster() {
        let manager = ShiftManager::default();
        let shift = open(&manager);
        assert_eq!(shift.status, ShiftStatus::Open);
        assert_eq!(shift.shift_number, 7);
        assert_eq!(shift.active_staff_ids, vec!["staff-1".to_string()]);
        assert!(shift.end_balance.is_none());
    }

    #[test]
    fn test_open_shift_rejects_second_open_and_missing_cashier() {
        let manager = ShiftManager::default();
        let first = open(&manager);

        let err = manager
            .open_shift(
                Some(&first),
                OpenShiftRequest {
                    start_balance: Money::zero(),
                    cashier_id: "staff-2".into(),
                    cashier_name: String::new(),
                },
                8,
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::ShiftAlreadyOpen { .. }));

        let err = manager
            .open_shift(
                None,
                OpenShiftRequest {
                    start_balance: Money::zero(),
                    cashier_id: " ".into(),
                    cashier_name: String::new(),
                },
                8,
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn test_update_active_staff_dedupes() {
        let manager = ShiftManager::default();
        let shift = manager
            .update_active_staff(open(&manager), vec!["a".into(), "b".into(), "a".into(), "".into()])
            .unwrap();
        assert_eq!(shift.active_staff_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(shift.start_balance, Money::from_major(1000));
    }

    #[test]
    fn test_close_computes_difference_and_is_final() {
        let manager = ShiftManager::default();
        let counts: DenominationCounts = [("1000", 1), ("100", 1), ("50", 1), ("20", 1), ("10", 1)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();

        let closed = manager
            .close_shift(
                open(&manager),
                CloseShiftRequest {
                    end_balance: None,
                    denomination_counts: Some(counts),
                },
                Money::from_major(1200),
                now(),
            )
            .unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        assert_eq!(closed.end_balance, Some(Money::from_major(1200)));
        assert_eq!(closed.cash_difference, Some(Money::from_major(-20)));

        let err = manager
            .close_shift(closed.clone(), CloseShiftRequest::default(), Money::zero(), now())
            .unwrap_err();
        assert!(matches!(err, CoreError::ShiftNotOpen { .. }));
        assert!(manager.update_active_staff(closed, vec![]).is_err());
    }

    #[test]
    fn test_amend_after_close_recomputes_difference() {
        let manager = ShiftManager::default();
        let closed = manager
            .close_shift(open(&manager), CloseShiftRequest::default(), Money::from_major(500), now())
            .unwrap();
        assert_eq!(closed.cash_difference, None);

        let counts = DenominationCounts::from([("500".to_string(), 1), ("10c".to_string(), 1)]);
        let amended = manager.amend_denominations(closed, &counts).unwrap();
        assert_eq!(amended.cash_difference, Some(Money::from_major(10)));
    }

    #[test]
    fn test_record_transaction_normalizes_sign() {
        let manager = ShiftManager::default();
        let shift = open(&manager);
        let tx = manager
            .record_transaction(
                &shift,
                NewTransaction {
                    kind: TransactionKind::Incasation,
                    category: String::new(),
                    amount: Money::from_major(300),
                    comment: "to safe".into(),
                },
                now(),
            )
            .unwrap();
        assert_eq!(tx.amount, Money::from_major(-300));
        assert_eq!(tx.category, "incasation");

        let err = manager
            .record_transaction(
                &shift,
                NewTransaction {
                    kind: TransactionKind::Expense,
                    category: "supplies".into(),
                    amount: Money::zero(),
                    comment: String::new(),
                },
                now(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_sale_kinds_cannot_be_recorded_manually() {
        let manager = ShiftManager::default();
        let shift = open(&manager);
        let input = NewTransaction {
            kind: TransactionKind::SaleCash,
            category: "sales".into(),
            amount: Money::from_major(10),
            comment: String::new(),
        };
        assert!(manager.record_transaction(&shift, input, now()).is_err());
    }

    #[test]
    fn test_transaction_input_resolves_legacy_label() {
        let input = TransactionInput {
            kind: None,
            label: Some("Витрата (Accounting)".into()),
            category: "supplies".into(),
            amount: Money::from_major(50),
            comment: String::new(),
        };
        assert_eq!(input.resolve().unwrap().kind, TransactionKind::Expense);

        let unknown = TransactionInput {
            kind: None,
            label: Some("???".into()),
            category: String::new(),
            amount: Money::from_major(50),
            comment: String::new(),
        };
        assert!(unknown.resolve().is_err());
    }
}
