//! # Checkout Processor
//!
//! Converts an open check plus payment input into an immutable receipt.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Check (open) ──► 1. status must be open, items non-empty             │
//! │                    2. resolve channel amounts                           │
//! │                       cash  → {cash: total}, amountGiven >= total       │
//! │                       card  → {card: total}                             │
//! │                       mixed → operator split, validated (±0.01)         │
//! │                    3. receiptNumber (allocated by storage)              │
//! │                    4. snapshot lines/totals/promotion                   │
//! │                    5. check → paid (table frees)                        │
//! │                    6. history: created                                  │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │   CheckoutOutcome { check, receipt, transactions: sale_cash/sale_card } │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is the single place money is recognized as revenue. Storage runs
//! it inside one transaction with a guarded `open → paid` update, so a
//! second concurrent checkout of the same check fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use crate::allocation::{change_due, normalize_single_payment, validate_split};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    Check, CheckStatus, PaymentDetails, PaymentMethod, Receipt, ReceiptAction,
    ReceiptHistoryEntry, Shift, Transaction, TransactionKind,
};
use crate::validation::validate_non_negative_amount;

/// Category written on transactions generated by checkout.
pub const SALES_CATEGORY: &str = "sales";

/// Body of `POST /checkout`.
///
/// Older registers post the whole check alongside; only the fields below
/// are read, the check itself is loaded from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub check_id: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
    #[serde(default)]
    pub amount_given: Option<Money>,
    /// Operator confirmed a mixed split that does not add up.
    #[serde(default)]
    pub confirm_mismatch: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Everything checkout produces, persisted atomically by storage.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOutcome {
    /// The check, now `paid`.
    pub check: Check,
    pub receipt: Receipt,
    /// One sale transaction per non-zero cash/card channel.
    pub transactions: Vec<Transaction>,
}

/// Settles `check` under the open `shift`.
pub fn checkout(
    check: Check,
    shift: &Shift,
    req: &CheckoutRequest,
    receipt_number: i64,
    now: DateTime<Utc>,
) -> CoreResult<CheckoutOutcome> {
    if !check.is_open() {
        return Err(CoreError::CheckNotOpen {
            check_id: check.id.clone(),
            status: check.status.as_str().to_string(),
        });
    }
    if !shift.is_open() {
        return Err(CoreError::ShiftNotOpen {
            shift_id: shift.id.clone(),
        });
    }
    if check.items.is_empty() {
        return Err(CoreError::EmptyCheck);
    }

    let total = check.total;
    let (details, amount_given, change) = resolve_payment(&check, req)?;

    let receipt_id = Uuid::new_v4().to_string();
    let receipt = Receipt {
        id: receipt_id.clone(),
        receipt_number,
        check_id: check.id.clone(),
        shift_id: shift.id.clone(),
        table_id: check.table_id.clone(),
        table_name: check.table_name.clone(),
        waiter_id: check.waiter_id.clone(),
        waiter_name: check.waiter_name.clone(),
        guests_count: check.guests_count,
        items: check.items.clone(),
        subtotal: check.subtotal,
        discount: check.discount,
        tax: check.tax,
        total,
        applied_promotion_id: check.applied_promotion_id.clone(),
        payment_method: req.payment_method,
        payment_details: Some(details),
        amount_given,
        change,
        comment: check.comment.clone(),
        customer_id: check.customer_id.clone(),
        customer_name: check.customer_name.clone(),
        created_at: now,
        updated_at: now,
        history: vec![ReceiptHistoryEntry {
            action: ReceiptAction::Created,
            at: now,
            actor: req.actor.clone(),
            previous: None,
        }],
    };

    let transactions = sale_transactions(&receipt, &details, now);

    let mut check = check;
    check.status = CheckStatus::Paid;
    check.closed_at = Some(now);
    check.updated_at = now;

    Ok(CheckoutOutcome {
        check,
        receipt,
        transactions,
    })
}

/// Resolves `(channel amounts, amount given, change)` for a request.
fn resolve_payment(
    check: &Check,
    req: &CheckoutRequest,
) -> CoreResult<(PaymentDetails, Option<Money>, Money)> {
    let total = check.total;

    match req.payment_method {
        PaymentMethod::Cash => {
            let given = req.amount_given.unwrap_or(total);
            if given < total {
                return Err(CoreError::InvalidPaymentAmount {
                    reason: format!("amount given {given} is less than total {total}"),
                });
            }
            let details = normalize_single_payment(PaymentMethod::Cash, total).unwrap_or_default();
            Ok((details, Some(given), change_due(total, given)))
        }
        PaymentMethod::Card => {
            let details = normalize_single_payment(PaymentMethod::Card, total).unwrap_or_default();
            Ok((details, None, Money::zero()))
        }
        PaymentMethod::Mixed => {
            let details = req.payment_details.ok_or_else(|| CoreError::InvalidPaymentAmount {
                reason: "mixed payment requires paymentDetails".to_string(),
            })?;
            validate_non_negative_amount("paymentDetails.cash", details.cash)?;
            validate_non_negative_amount("paymentDetails.card", details.card)?;
            validate_non_negative_amount("paymentDetails.certificate", details.certificate)?;

            let split = validate_split(total, &details);
            if !split.ok {
                if !req.confirm_mismatch {
                    return Err(CoreError::SplitMismatch { delta: split.delta });
                }
                warn!(
                    check_id = %check.id,
                    delta = split.delta.minor_units(),
                    "Confirmed payment split mismatch"
                );
            }
            Ok((details, req.amount_given, Money::zero()))
        }
    }
}

/// Builds the `sale_cash` / `sale_card` rows for a receipt's channels.
pub fn sale_transactions(receipt: &Receipt, details: &PaymentDetails, now: DateTime<Utc>) -> Vec<Transaction> {
    [
        (TransactionKind::SaleCash, details.cash),
        (TransactionKind::SaleCard, details.card),
    ]
    .into_iter()
    .filter(|(_, amount)| !amount.is_zero())
    .map(|(kind, amount)| Transaction {
        id: Uuid::new_v4().to_string(),
        shift_id: receipt.shift_id.clone(),
        kind,
        category: SALES_CATEGORY.to_string(),
        amount,
        comment: format!("Receipt #{}", receipt.receipt_number),
        receipt_id: Some(receipt.id.clone()),
        created_at: now,
    })
    .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
