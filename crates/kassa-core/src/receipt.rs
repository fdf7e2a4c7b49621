//! # Receipt Corrections
//!
//! A receipt is immutable except through administrative corrections.
//! Every correction appends one history entry carrying the state before
//! the change, so the original sale can always be reconstructed.
//!
//! ```text
//!  history: [created] ──► [update_items prev=S0] ──► [update_payment prev=S1]
//!                                                        │
//!                                              current state S2
//! ```
//!
//! A mixed receipt must still balance after an items or discount
//! correction: the caller sends the new split along, or confirms the
//! mismatch explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::allocation::{normalize_single_payment, validate_split};
use crate::check::normalize_lines;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CartItem, PaymentDetails, PaymentMethod, Receipt, ReceiptAction, ReceiptHistoryEntry, TaxRate,
};
use crate::validation::{validate_comment, validate_guests, validate_non_negative_amount};

/// One bookkeeping correction, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReceiptCorrection {
    Items {
        items: Vec<CartItem>,
        /// New split for a mixed receipt.
        #[serde(default, rename = "paymentDetails")]
        payment_details: Option<PaymentDetails>,
        #[serde(default, rename = "confirmMismatch")]
        confirm_mismatch: bool,
    },
    Discount {
        discount: Money,
        #[serde(default, rename = "paymentDetails")]
        payment_details: Option<PaymentDetails>,
        #[serde(default, rename = "confirmMismatch")]
        confirm_mismatch: bool,
    },
    Comment {
        comment: String,
    },
    Guests {
        #[serde(rename = "guestsCount")]
        guests_count: u32,
    },
    Payment {
        #[serde(rename = "paymentMethod")]
        payment_method: PaymentMethod,
        #[serde(default, rename = "paymentDetails")]
        payment_details: Option<PaymentDetails>,
        #[serde(default, rename = "confirmMismatch")]
        confirm_mismatch: bool,
    },
}

impl ReceiptCorrection {
    pub fn action(&self) -> ReceiptAction {
        match self {
            ReceiptCorrection::Items { .. } => ReceiptAction::UpdateItems,
            ReceiptCorrection::Discount { .. } => ReceiptAction::UpdateDiscount,
            ReceiptCorrection::Comment { .. } => ReceiptAction::UpdateComment,
            ReceiptCorrection::Guests { .. } => ReceiptAction::UpdateGuests,
            ReceiptCorrection::Payment { .. } => ReceiptAction::UpdatePayment,
        }
    }

    /// Whether the correction can change channel amounts (sale rows must
    /// then be rewritten by storage).
    pub fn affects_money(&self) -> bool {
        matches!(
            self,
            ReceiptCorrection::Items { .. }
                | ReceiptCorrection::Discount { .. }
                | ReceiptCorrection::Payment { .. }
        )
    }
}

/// Applies a correction and appends its history entry.
pub fn correct_receipt(
    mut receipt: Receipt,
    correction: ReceiptCorrection,
    actor: Option<String>,
    tax_rate: TaxRate,
    now: DateTime<Utc>,
) -> CoreResult<Receipt> {
    let previous = receipt.snapshot();
    let action = correction.action();

    match correction {
        ReceiptCorrection::Items {
            items,
            payment_details,
            confirm_mismatch,
        } => {
            let mut items = normalize_lines(items)?;
            for line in items.iter_mut() {
                line.subtotal = line.line_subtotal();
                line.discount = Money::zero();
            }
            receipt.items = items;
            receipt.applied_promotion_id = None;
            let discount = receipt.discount;
            recompute_totals(&mut receipt, discount, tax_rate);
            rebalance_payment(&mut receipt, payment_details, confirm_mismatch)?;
        }
        ReceiptCorrection::Discount {
            discount,
            payment_details,
            confirm_mismatch,
        } => {
            validate_non_negative_amount("discount", discount)?;
            receipt.applied_promotion_id = None;
            for line in receipt.items.iter_mut() {
                line.discount = Money::zero();
            }
            recompute_totals(&mut receipt, discount, tax_rate);
            rebalance_payment(&mut receipt, payment_details, confirm_mismatch)?;
        }
        ReceiptCorrection::Comment { comment } => {
            validate_comment(&comment)?;
            receipt.comment = comment;
        }
        ReceiptCorrection::Guests { guests_count } => {
            validate_guests(guests_count)?;
            receipt.guests_count = guests_count;
        }
        ReceiptCorrection::Payment {
            payment_method,
            payment_details,
            confirm_mismatch,
        } => {
            let details = match normalize_single_payment(payment_method, receipt.total) {
                Some(details) => details,
                None => {
                    let details = payment_details.ok_or_else(|| CoreError::InvalidPaymentAmount {
                        reason: "mixed payment requires paymentDetails".to_string(),
                    })?;
                    let split = validate_split(receipt.total, &details);
                    if !split.ok && !confirm_mismatch {
                        return Err(CoreError::SplitMismatch { delta: split.delta });
                    }
                    details
                }
            };
            receipt.payment_method = payment_method;
            receipt.payment_details = Some(details);
            if payment_method != PaymentMethod::Cash {
                receipt.amount_given = None;
                receipt.change = Money::zero();
            }
        }
    }

    receipt.updated_at = now;
    receipt.history.push(ReceiptHistoryEntry {
        action,
        at: now,
        actor,
        previous: Some(previous),
    });
    Ok(receipt)
}

fn recompute_totals(receipt: &mut Receipt, discount: Money, tax_rate: TaxRate) {
    receipt.subtotal = receipt.items.iter().map(|line| line.subtotal).sum();
    receipt.discount = discount.clamp_between(Money::zero(), receipt.subtotal);
    receipt.total = receipt.subtotal - receipt.discount;
    receipt.tax = receipt.total.included_tax(tax_rate);
}

/// Brings payment details in step with a corrected total.
///
/// Single-channel receipts follow the total. A mixed receipt takes the
/// split sent with the correction, or keeps its old one; either must add
/// up unless the mismatch is confirmed.
fn rebalance_payment(
    receipt: &mut Receipt,
    payment_details: Option<PaymentDetails>,
    confirm_mismatch: bool,
) -> CoreResult<()> {
    if let Some(details) = normalize_single_payment(receipt.payment_method, receipt.total) {
        receipt.payment_details = Some(details);
        if let Some(given) = receipt.amount_given {
            receipt.change = crate::allocation::change_due(receipt.total, given);
        }
        return Ok(());
    }

    let details = payment_details.or(receipt.payment_details).unwrap_or_default();
    let split = validate_split(receipt.total, &details);
    if !split.ok {
        if !confirm_mismatch {
            return Err(CoreError::SplitMismatch { delta: split.delta });
        }
        warn!(
            receipt_id = %receipt.id,
            delta = split.delta.minor_units(),
            "Mixed receipt correction confirmed with unbalanced split"
        );
    }
    receipt.payment_details = Some(details);
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn line(product_id: &str, price_major: i64, qty: i64) -> CartItem {
        CartItem {
            service_id: format!("l-{product_id}"),
            product_id: product_id.into(),
            name: product_id.into(),
            category: "kitchen".into(),
            category_id: None,
            price: Money::from_major(price_major),
            quantity: qty,
            modifiers: vec![],
            subtotal: Money::from_major(price_major * qty),
            discount: Money::zero(),
        }
    }

    fn card_receipt() -> Receipt {
        Receipt {
            id: "r-1".into(),
            receipt_number: 101,
            check_id: "c-1".into(),
            shift_id: "s-1".into(),
            table_id: "t-1".into(),
            table_name: "Table 1".into(),
            waiter_id: None,
            waiter_name: None,
            guests_count: 2,
            items: vec![line("soup", 120, 1), line("bread", 20, 2)],
            subtotal: Money::from_major(160),
            discount: Money::zero(),
            tax: Money::zero(),
            total: Money::from_major(160),
            applied_promotion_id: None,
            payment_method: PaymentMethod::Card,
            payment_details: Some(PaymentDetails {
                card: Money::from_major(160),
                ..PaymentDetails::default()
            }),
            amount_given: None,
            change: Money::zero(),
            comment: String::new(),
            customer_id: None,
            customer_name: None,
            created_at: now(),
            updated_at: now(),
            history: vec![ReceiptHistoryEntry {
                action: ReceiptAction::Created,
                at: now(),
                actor: None,
                previous: None,
            }],
        }
    }

    #[test]
    fn test_items_correction_recomputes_and_keeps_history() {
        let original = card_receipt();
        let corrected = correct_receipt(
            original.clone(),
            ReceiptCorrection::Items {
                items: vec![line("soup", 120, 1)],
                payment_details: None,
                confirm_mismatch: false,
            },
            Some("manager".into()),
            TaxRate::zero(),
            now(),
        )
        .unwrap();

        assert_eq!(corrected.total, Money::from_major(120));
        assert_eq!(corrected.payment_details.unwrap().card, Money::from_major(120));
        assert_eq!(corrected.history.len(), 2);
        let entry = &corrected.history[1];
        assert_eq!(entry.action, ReceiptAction::UpdateItems);
        assert_eq!(entry.previous.as_ref().unwrap().total, original.total);
        assert_eq!(corrected.receipt_number, original.receipt_number);
    }

    #[test]
    fn test_payment_correction_to_mixed_must_balance() {
        let unbalanced = ReceiptCorrection::Payment {
            payment_method: PaymentMethod::Mixed,
            payment_details: Some(PaymentDetails {
                cash: Money::from_major(50),
                card: Money::from_major(100),
                certificate: Money::zero(),
            }),
            confirm_mismatch: false,
        };
        let err = correct_receipt(card_receipt(), unbalanced, None, TaxRate::zero(), now()).unwrap_err();
        assert!(matches!(err, CoreError::SplitMismatch { .. }));

        let balanced = ReceiptCorrection::Payment {
            payment_method: PaymentMethod::Mixed,
            payment_details: Some(PaymentDetails {
                cash: Money::from_major(60),
                card: Money::from_major(100),
                certificate: Money::zero(),
            }),
            confirm_mismatch: false,
        };
        let corrected = correct_receipt(card_receipt(), balanced, None, TaxRate::zero(), now()).unwrap();
        assert_eq!(corrected.payment_method, PaymentMethod::Mixed);
        assert_eq!(corrected.history.last().unwrap().action, ReceiptAction::UpdatePayment);
    }

    #[test]
    fn test_discount_correction_is_clamped() {
        let corrected = correct_receipt(
            card_receipt(),
            ReceiptCorrection::Discount {
                discount: Money::from_major(1000),
                payment_details: None,
                confirm_mismatch: false,
            },
            None,
            TaxRate::zero(),
            now(),
        )
        .unwrap();
        assert_eq!(corrected.discount, Money::from_major(160));
        assert_eq!(corrected.total, Money::zero());
    }

    fn mixed_receipt() -> Receipt {
        Receipt {
            payment_method: PaymentMethod::Mixed,
            payment_details: Some(PaymentDetails {
                cash: Money::from_major(60),
                card: Money::from_major(100),
                certificate: Money::zero(),
            }),
            ..card_receipt()
        }
    }

    #[test]
    fn test_mixed_items_correction_needs_new_split() {
        let items = vec![line("soup", 120, 1)];

        let err = correct_receipt(
            mixed_receipt(),
            ReceiptCorrection::Items {
                items: items.clone(),
                payment_details: None,
                confirm_mismatch: false,
            },
            None,
            TaxRate::zero(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::SplitMismatch { delta } if delta == Money::from_major(40)));

        let split = PaymentDetails {
            cash: Money::from_major(20),
            card: Money::from_major(100),
            certificate: Money::zero(),
        };
        let corrected = correct_receipt(
            mixed_receipt(),
            ReceiptCorrection::Items {
                items,
                payment_details: Some(split),
                confirm_mismatch: false,
            },
            None,
            TaxRate::zero(),
            now(),
        )
        .unwrap();
        assert_eq!(corrected.total, Money::from_major(120));
        assert_eq!(corrected.payment_details, Some(split));
    }

    #[test]
    fn test_mixed_discount_correction_can_be_confirmed() {
        let discount = |confirm_mismatch| ReceiptCorrection::Discount {
            discount: Money::from_major(10),
            payment_details: None,
            confirm_mismatch,
        };

        let err = correct_receipt(mixed_receipt(), discount(false), None, TaxRate::zero(), now()).unwrap_err();
        assert!(matches!(err, CoreError::SplitMismatch { .. }));

        let corrected = correct_receipt(mixed_receipt(), discount(true), None, TaxRate::zero(), now()).unwrap();
        assert_eq!(corrected.total, Money::from_major(150));
        assert_eq!(corrected.payment_details, mixed_receipt().payment_details);
        assert_eq!(corrected.history.last().unwrap().action, ReceiptAction::UpdateDiscount);
    }

    #[test]
    fn test_correction_wire_format() {
        let correction: ReceiptCorrection =
            serde_json::from_str(r#"{"action":"guests","guestsCount":4}"#).unwrap();
        assert_eq!(correction, ReceiptCorrection::Guests { guests_count: 4 });
        assert_eq!(correction.action(), ReceiptAction::UpdateGuests);
        assert!(!correction.affects_money());

        let correction: ReceiptCorrection =
            serde_json::from_str(r#"{"action":"discount","discount":500,"confirmMismatch":true}"#).unwrap();
        assert!(matches!(
            correction,
            ReceiptCorrection::Discount { confirm_mismatch: true, payment_details: None, .. }
        ));
    }
}
