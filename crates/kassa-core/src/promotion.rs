//! # Promotion Engine
//!
//! Evaluates promotions against the lines of a check.
//!
//! ## Evaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each condition:                                                    │
//! │     matching lines ──► relevantQuantity = Σ qty                         │
//! │                        relevantAmount   = Σ price * qty                 │
//! │     holds  ⇔  relevant{Quantity|Amount} >= value   (unit qty | uah)    │
//! │                                                                         │
//! │  applicable ⇔ isActive AND every condition holds                       │
//! │                                                                         │
//! │  fixed_discount   ──► one check-level amount, lines untouched          │
//! │  percent_discount ──► per-line discount on lines matching ANY condition│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Line Matching
//! - `total_amount` matches every line
//! - `product` matches when `productId ∈ targetIds`
//! - `category` matches by stable `categoryId ∈ targetIds` first, then by
//!   display name `category ∈ targetNames` for promotions authored before
//!   category ids existed

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::allocate_percent;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CartItem, ConditionKind, ConditionOperator, ConditionUnit, DiscountKind, Promotion,
    PromotionCondition,
};

/// Per-condition aggregate over the matching lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConditionEvaluation {
    pub relevant_quantity: i64,
    pub relevant_amount: Money,
    pub holds: bool,
}

/// Discount a promotion would grant on a given set of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionDiscount {
    /// One entry per line, zero where the promotion does not reach.
    pub item_discounts: Vec<Money>,
    /// Check-level discount (already clamped to the subtotal).
    pub total: Money,
}

fn line_matches(condition: &PromotionCondition, item: &CartItem) -> bool {
    match condition.kind {
        ConditionKind::TotalAmount => true,
        ConditionKind::Product => condition.target_ids.iter().any(|id| *id == item.product_id),
        ConditionKind::Category => {
            let by_id = item
                .category_id
                .as_ref()
                .is_some_and(|cid| condition.target_ids.iter().any(|id| id == cid));
            by_id || condition.target_names.iter().any(|name| *name == item.category)
        }
    }
}

/// Computes the aggregates of one condition and whether it holds.
pub fn evaluate_condition(condition: &PromotionCondition, items: &[CartItem]) -> ConditionEvaluation {
    let (relevant_quantity, relevant_amount) = items
        .iter()
        .filter(|item| line_matches(condition, item))
        .fold((0i64, Money::zero()), |(qty, amount), item| {
            (qty + item.quantity, amount + item.line_subtotal())
        });

    let holds = match condition.operator {
        ConditionOperator::Gte => match condition.unit {
            ConditionUnit::Qty => relevant_quantity >= condition.value,
            ConditionUnit::Uah => relevant_amount.minor_units() >= condition.value,
        },
    };

    ConditionEvaluation {
        relevant_quantity,
        relevant_amount,
        holds,
    }
}

/// Whether the promotion is active and all of its conditions hold.
///
/// A promotion without conditions applies unconditionally.
pub fn is_applicable(promotion: &Promotion, items: &[CartItem]) -> bool {
    promotion.is_active
        && promotion
            .conditions
            .iter()
            .all(|condition| evaluate_condition(condition, items).holds)
}

/// Like [`is_applicable`] but reports why a promotion was rejected.
pub fn ensure_applicable(promotion: &Promotion, items: &[CartItem]) -> CoreResult<()> {
    if !promotion.is_active {
        return Err(CoreError::PromotionInactive(promotion.id.clone()));
    }
    if !is_applicable(promotion, items) {
        return Err(CoreError::PromotionNotApplicable(promotion.id.clone()));
    }
    Ok(())
}

/// Lines reached by the promotion: those matching ANY condition.
pub fn matching_lines(promotion: &Promotion, items: &[CartItem]) -> Vec<bool> {
    items
        .iter()
        .map(|item| {
            promotion.conditions.is_empty()
                || promotion
                    .conditions
                    .iter()
                    .any(|condition| line_matches(condition, item))
        })
        .collect()
}

/// Computes the discount an applicable promotion grants.
///
/// ```rust
/// use kassa_core::money::Money;
/// use kassa_core::promotion::compute_discount;
/// use kassa_core::types::*;
///
/// let promo = Promotion {
///     id: "p".into(),
///     name: "Minus 50".into(),
///     is_active: true,
///     conditions: vec![],
///     result: PromotionResult { kind: DiscountKind::FixedDiscount, value: 5000 },
/// };
/// let discount = compute_discount(&promo, &[]);
/// // clamped to the (empty) subtotal
/// assert_eq!(discount.total, Money::zero());
/// ```
pub fn compute_discount(promotion: &Promotion, items: &[CartItem]) -> PromotionDiscount {
    let subtotal: Money = items.iter().map(CartItem::line_subtotal).sum();

    match promotion.result.kind {
        DiscountKind::FixedDiscount => PromotionDiscount {
            item_discounts: vec![Money::zero(); items.len()],
            total: Money::from_minor(promotion.result.value).clamp_between(Money::zero(), subtotal),
        },
        DiscountKind::PercentDiscount => {
            let percent = promotion.result.value.clamp(0, 100) as u32;
            let subtotals: Vec<Money> = items.iter().map(CartItem::line_subtotal).collect();
            let item_discounts =
                allocate_percent(&subtotals, &matching_lines(promotion, items), percent);
            let total = item_discounts
                .iter()
                .sum::<Money>()
                .clamp_between(Money::zero(), subtotal);
            PromotionDiscount {
                item_discounts,
                total,
            }
        }
    }
}

/// Active promotions whose conditions all hold, in directory order.
pub fn applicable_promotions<'a>(promotions: &'a [Promotion], items: &[CartItem]) -> Vec<&'a Promotion> {
    promotions
        .iter()
        .filter(|promotion| is_applicable(promotion, items))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
