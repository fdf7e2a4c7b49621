//! # Money Allocation
//!
//! Pure arithmetic over payment channels and discount distribution.
//! No state, no errors beyond what the inputs make impossible.
//!
//! ## Split Validation
//! ```text
//!   total 250.00       cash 100.00 + card 150.00 + cert 0.00
//!        │                            │
//!        └──────────► delta = Σ − total = 0.00 ──► ok
//!
//!   |delta| <= 0.01 (one kopiyka) is accepted; anything larger must be
//!   confirmed by the operator before checkout may post.
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentDetails, PaymentMethod};

/// Largest accepted difference between a split and the total.
pub const SPLIT_TOLERANCE: Money = Money::from_minor(1);

/// Outcome of [`validate_split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SplitValidation {
    pub ok: bool,
    /// `Σ amounts − total`: positive means overpaid.
    pub delta: Money,
}

/// Compares a payment split against the amount due.
///
/// ```rust
/// use kassa_core::allocation::validate_split;
/// use kassa_core::money::Money;
/// use kassa_core::types::PaymentDetails;
///
/// let split = PaymentDetails {
///     cash: Money::from_major(100),
///     card: Money::from_major(140),
///     certificate: Money::zero(),
/// };
/// let result = validate_split(Money::from_major(250), &split);
/// assert!(!result.ok);
/// assert_eq!(result.delta, Money::from_major(-10));
/// ```
pub fn validate_split(total: Money, amounts: &PaymentDetails) -> SplitValidation {
    let delta = amounts.sum() - total;
    SplitValidation {
        ok: delta.abs() <= SPLIT_TOLERANCE,
        delta,
    }
}

/// Puts the whole total on the single channel of a cash or card payment.
///
/// Returns `None` for `mixed`, whose amounts must come from the operator.
pub fn normalize_single_payment(method: PaymentMethod, total: Money) -> Option<PaymentDetails> {
    match method {
        PaymentMethod::Cash => Some(PaymentDetails {
            cash: total,
            ..PaymentDetails::default()
        }),
        PaymentMethod::Card => Some(PaymentDetails {
            card: total,
            ..PaymentDetails::default()
        }),
        PaymentMethod::Mixed => None,
    }
}

/// Change to hand back for a cash payment, never negative.
#[inline]
pub fn change_due(total: Money, amount_given: Money) -> Money {
    (amount_given - total).clamp_between(Money::zero(), amount_given.abs())
}

/// Distributes a percentage discount over the masked lines.
///
/// Each selected line gets `subtotal * percent / 100` (rounded half up);
/// unselected lines get zero. `mask` shorter than `subtotals` leaves the
/// tail unselected.
///
/// ```rust
/// use kassa_core::allocation::allocate_percent;
/// use kassa_core::money::Money;
///
/// let lines = [Money::from_major(200), Money::from_major(300)];
/// let discounts = allocate_percent(&lines, &[true, false], 10);
/// assert_eq!(discounts, vec![Money::from_major(20), Money::zero()]);
/// ```
pub fn allocate_percent(subtotals: &[Money], mask: &[bool], percent: u32) -> Vec<Money> {
    subtotals
        .iter()
        .enumerate()
        .map(|(idx, subtotal)| {
            if mask.get(idx).copied().unwrap_or(false) {
                subtotal.percent_of(percent).clamp_between(Money::zero(), *subtotal)
            } else {
                Money::zero()
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn split(cash: i64, card: i64, certificate: i64) -> PaymentDetails {
        PaymentDetails {
            cash: Money::from_minor(cash),
            card: Money::from_minor(card),
            certificate: Money::from_minor(certificate),
        }
    }

    #[test]
    fn test_exact_split_is_ok() {
        let result = validate_split(Money::from_minor(25000), &split(10000, 15000, 0));
        assert!(result.ok);
        assert!(result.delta.is_zero());
    }

    #[test]
    fn test_one_kopiyka_is_within_tolerance() {
        assert!(validate_split(Money::from_minor(25000), &split(10000, 15001, 0)).ok);
        assert!(validate_split(Money::from_minor(25000), &split(10000, 14999, 0)).ok);
        assert!(!validate_split(Money::from_minor(25000), &split(10000, 14998, 0)).ok);
    }

    #[test]
    fn test_certificate_counts_toward_split() {
        let result = validate_split(Money::from_minor(25000), &split(5000, 10000, 10000));
        assert!(result.ok);
    }

    #[test]
    fn test_overpayment_has_positive_delta() {
        let result = validate_split(Money::from_minor(25000), &split(30000, 0, 0));
        assert!(!result.ok);
        assert_eq!(result.delta, Money::from_minor(5000));
    }

    #[test]
    fn test_normalize_single_payment() {
        let total = Money::from_major(400);
        let card = normalize_single_payment(PaymentMethod::Card, total).unwrap();
        assert_eq!(card.card, total);
        assert!(card.cash.is_zero());

        let cash = normalize_single_payment(PaymentMethod::Cash, total).unwrap();
        assert_eq!(cash.cash, total);
        assert!(normalize_single_payment(PaymentMethod::Mixed, total).is_none());
    }

    #[test]
    fn test_change_due() {
        assert_eq!(
            change_due(Money::from_major(250), Money::from_major(300)),
            Money::from_major(50)
        );
        assert_eq!(change_due(Money::from_major(250), Money::from_major(250)), Money::zero());
        assert_eq!(change_due(Money::from_major(250), Money::from_major(200)), Money::zero());
    }

    #[test]
    fn test_allocate_percent_short_mask() {
        let lines = [Money::from_major(100), Money::from_major(100)];
        let discounts = allocate_percent(&lines, &[true], 50);
        assert_eq!(discounts, vec![Money::from_major(50), Money::zero()]);
    }
}
