//! # Check Ledger
//!
//! Lifecycle of a table's running tab.
//!
//! ## State Machine
//! ```text
//!                 addItem / setDiscount / applyPromotion / ...
//!                       ┌──────────┐
//!                       │          │
//!                       ▼          │
//!   openCheck ──► ┌───────────┐────┘
//!  (or resume)    │   open    │
//!                 └─────┬─────┘
//!                       │
//!           checkout    │    void
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//!   ┌───────────┐               ┌───────────┐
//!   │   paid    │ (terminal)    │   void    │ (terminal)
//!   └───────────┘               └───────────┘
//! ```
//!
//! Every operation takes the check by value and returns the updated
//! aggregate; totals are recomputed on every item or discount change so
//! `subtotal == Σ price * quantity` and `total == subtotal - discount`
//! hold after each call.
//!
//! ## Discount Sources
//! At most one of these is active at a time; setting one clears the others.
//! - applied promotion (re-evaluated on every item change)
//! - manual percentage (`discountPercent`)
//! - manual absolute amount (`manualDiscount`, capped at the subtotal)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::promotion::{compute_discount, ensure_applicable, is_applicable};
use crate::types::{CartItem, Check, CheckStatus, NewCartItem, Promotion, Shift, TaxRate};
use crate::validation::{
    validate_check_size, validate_comment, validate_guests, validate_non_negative_amount,
    validate_percent, validate_price, validate_quantity, validate_required,
};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /checks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OpenCheckRequest {
    pub table_id: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub department_id: String,
    pub shift_id: String,
    #[serde(default = "default_guests")]
    pub guests_count: u32,
    #[serde(default)]
    pub waiter_id: Option<String>,
    #[serde(default)]
    pub waiter_name: Option<String>,
}

fn default_guests() -> u32 {
    1
}

/// Body of `PUT /checks/:id`.
///
/// Client-side totals are accepted for compatibility but never trusted;
/// the ledger recomputes them from `items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckUpdate {
    #[serde(default)]
    pub items: Option<Vec<CartItem>>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub guests_count: Option<u32>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub discount_percent: Option<u32>,
    #[serde(default)]
    pub applied_promotion_id: Option<String>,
}

/// Result of [`CheckLedger::open_check`].
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Created(Check),
    /// The table already had an open check; it is returned unchanged.
    Resumed(Check),
}

impl OpenOutcome {
    pub fn into_check(self) -> Check {
        match self {
            OpenOutcome::Created(check) | OpenOutcome::Resumed(check) => check,
        }
    }

    pub fn is_resumed(&self) -> bool {
        matches!(self, OpenOutcome::Resumed(_))
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Pure check operations, parameterized by the venue's tax rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckLedger {
    tax_rate: TaxRate,
}

impl CheckLedger {
    pub fn new(tax_rate: TaxRate) -> Self {
        Self { tax_rate }
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Opens a check for a table, or resumes the one already open.
    ///
    /// `existing_open` is whatever storage found for `table_id`; passing it
    /// in keeps this function pure. Storage must still back this with a
    /// unique index, since two registers can race past the lookup.
    pub fn open_check(
        &self,
        existing_open: Option<Check>,
        shift: &Shift,
        req: OpenCheckRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<OpenOutcome> {
        validate_required("tableId", &req.table_id)?;

        if let Some(existing) = existing_open {
            if existing.is_open() && existing.table_id == req.table_id {
                debug!(check_id = %existing.id, table_id = %req.table_id, "Resuming open check");
                return Ok(OpenOutcome::Resumed(existing));
            }
        }

        if !shift.is_open() {
            return Err(CoreError::ShiftNotOpen {
                shift_id: shift.id.clone(),
            });
        }
        validate_guests(req.guests_count)?;

        let check = Check {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id.clone(),
            table_id: req.table_id,
            table_name: req.table_name,
            department_id: req.department_id,
            waiter_id: req.waiter_id,
            waiter_name: req.waiter_name,
            guests_count: req.guests_count,
            items: Vec::new(),
            subtotal: Money::zero(),
            discount: Money::zero(),
            discount_percent: None,
            manual_discount: None,
            applied_promotion_id: None,
            tax: Money::zero(),
            total: Money::zero(),
            customer_id: None,
            customer_name: None,
            comment: String::new(),
            status: CheckStatus::Open,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };

        Ok(OpenOutcome::Created(check))
    }

    /// Adds an item, merging into an existing line with the same
    /// `(productId, modifiers)`.
    ///
    /// `promotion` is the currently applied promotion (if any); it is
    /// re-evaluated against the new lines.
    pub fn add_item(
        &self,
        mut check: Check,
        item: NewCartItem,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> CoreResult<Check> {
        ensure_open(&check)?;
        validate_required("productId", &item.product_id)?;
        validate_quantity(item.quantity)?;
        validate_price(item.price)?;

        match check
            .items
            .iter_mut()
            .find(|line| line.is_same_line(&item.product_id, &item.modifiers))
        {
            Some(line) => {
                let merged = line.quantity + item.quantity;
                if merged > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: merged,
                        max: MAX_ITEM_QUANTITY,
                    });
                }
                line.quantity = merged;
            }
            None => {
                validate_check_size(check.items.len())?;
                check.items.push(new_line(item));
            }
        }

        check.updated_at = now;
        Ok(self.recalculate(check, promotion))
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_quantity(
        &self,
        mut check: Check,
        service_id: &str,
        quantity: i64,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> CoreResult<Check> {
        ensure_open(&check)?;
        if quantity == 0 {
            return self.remove_item(check, service_id, promotion, now);
        }
        validate_quantity(quantity)?;

        let line = check
            .items
            .iter_mut()
            .find(|line| line.service_id == service_id)
            .ok_or_else(|| CoreError::LineNotFound(service_id.to_string()))?;
        line.quantity = quantity;

        check.updated_at = now;
        Ok(self.recalculate(check, promotion))
    }

    pub fn remove_item(
        &self,
        mut check: Check,
        service_id: &str,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> CoreResult<Check> {
        ensure_open(&check)?;
        let before = check.items.len();
        check.items.retain(|line| line.service_id != service_id);
        if check.items.len() == before {
            return Err(CoreError::LineNotFound(service_id.to_string()));
        }

        check.updated_at = now;
        Ok(self.recalculate(check, promotion))
    }

    /// Replaces all lines at once, normalizing them as if each had been
    /// added through [`add_item`](Self::add_item).
    pub fn replace_items(
        &self,
        mut check: Check,
        items: Vec<CartItem>,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> CoreResult<Check> {
        ensure_open(&check)?;
        check.items = normalize_lines(items)?;
        check.updated_at = now;
        Ok(self.recalculate(check, promotion))
    }

    /// Applies a `PUT /checks/:id` body.
    ///
    /// `promotion` must be the promotion named by
    /// `update.applied_promotion_id`, or else by the check's current one.
    ///
    /// Clients send the whole check back, derived `discount` included, so
    /// one discount source wins: `appliedPromotionId`, then
    /// `discountPercent`, then `discount`.
    pub fn apply_update(
        &self,
        mut check: Check,
        update: CheckUpdate,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> CoreResult<Check> {
        ensure_open(&check)?;

        if let Some(items) = update.items {
            check.items = normalize_lines(items)?;
        }
        if let Some(comment) = update.comment {
            validate_comment(&comment)?;
            check.comment = comment;
        }
        if let Some(guests) = update.guests_count {
            validate_guests(guests)?;
            check.guests_count = guests;
        }
        if update.customer_id.is_some() || update.customer_name.is_some() {
            check.customer_id = update.customer_id;
            check.customer_name = update.customer_name;
        }

        if let Some(promotion_id) = update.applied_promotion_id {
            if check.applied_promotion_id.as_deref() != Some(promotion_id.as_str()) {
                let promo = promotion
                    .filter(|p| p.id == promotion_id)
                    .ok_or_else(|| CoreError::PromotionNotFound(promotion_id.clone()))?;
                ensure_applicable(promo, &check.items)?;
                check.discount_percent = None;
                check.manual_discount = None;
                check.applied_promotion_id = Some(promotion_id);
            }
        } else if let Some(percent) = update.discount_percent {
            validate_percent(percent)?;
            check.applied_promotion_id = None;
            check.manual_discount = None;
            check.discount_percent = Some(percent);
        } else if let Some(amount) = update.discount {
            validate_non_negative_amount("discount", amount)?;
            // Echo of the clamped figure keeps the requested amount
            if check.manual_discount.is_none() || amount != check.discount {
                check.manual_discount = Some(amount).filter(|a| !a.is_zero());
            }
            check.applied_promotion_id = None;
            check.discount_percent = None;
        }

        check.updated_at = now;
        Ok(self.recalculate(check, promotion))
    }

    /// Sets a manual percentage discount, replacing any promotion.
    pub fn set_discount_percent(&self, mut check: Check, percent: u32, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        validate_percent(percent)?;
        check.applied_promotion_id = None;
        check.manual_discount = None;
        check.discount_percent = if percent == 0 { None } else { Some(percent) };
        check.updated_at = now;
        Ok(self.recalculate(check, None))
    }

    /// Sets a manual absolute discount, replacing any promotion.
    ///
    /// The amount is kept as entered; only the applied `discount` is capped
    /// at the subtotal.
    pub fn set_discount_amount(&self, mut check: Check, amount: Money, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        validate_non_negative_amount("discount", amount)?;
        check.applied_promotion_id = None;
        check.discount_percent = None;
        check.manual_discount = Some(amount).filter(|a| !a.is_zero());
        check.updated_at = now;
        Ok(self.recalculate(check, None))
    }

    /// Applies a promotion. Re-applying the same one replaces, never stacks.
    pub fn apply_promotion(&self, mut check: Check, promotion: &Promotion, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        ensure_applicable(promotion, &check.items)?;

        check.discount_percent = None;
        check.manual_discount = None;
        check.applied_promotion_id = Some(promotion.id.clone());
        check.updated_at = now;
        Ok(self.recalculate(check, Some(promotion)))
    }

    /// Clears the applied promotion and the line discounts it introduced.
    pub fn revoke_promotion(&self, mut check: Check, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        check.applied_promotion_id = None;
        check.updated_at = now;
        Ok(self.recalculate(check, None))
    }

    pub fn set_comment(&self, mut check: Check, comment: String, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        validate_comment(&comment)?;
        check.comment = comment;
        check.updated_at = now;
        Ok(check)
    }

    pub fn set_guests(&self, mut check: Check, guests: u32, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        validate_guests(guests)?;
        check.guests_count = guests;
        check.updated_at = now;
        Ok(check)
    }

    pub fn set_customer(
        &self,
        mut check: Check,
        customer_id: Option<String>,
        customer_name: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Check> {
        ensure_open(&check)?;
        check.customer_id = customer_id;
        check.customer_name = customer_name;
        check.updated_at = now;
        Ok(check)
    }

    /// Cancels an open check. No receipt is produced; the table frees up
    /// because no open check references it any more.
    pub fn void_check(&self, mut check: Check, now: DateTime<Utc>) -> CoreResult<Check> {
        ensure_open(&check)?;
        check.status = CheckStatus::Void;
        check.closed_at = Some(now);
        check.updated_at = now;
        Ok(check)
    }

    /// Recomputes line subtotals, the discount and the totals.
    ///
    /// An applied promotion that no longer holds (or is not the one
    /// passed in) is revoked.
    pub fn recalculate(&self, mut check: Check, promotion: Option<&Promotion>) -> Check {
        for line in check.items.iter_mut() {
            line.subtotal = line.line_subtotal();
            line.discount = Money::zero();
        }
        let subtotal: Money = check.items.iter().map(|line| line.subtotal).sum();

        let discount = match check.applied_promotion_id.clone() {
            Some(promotion_id) => match promotion
                .filter(|p| p.id == promotion_id && is_applicable(p, &check.items))
            {
                Some(promo) => {
                    let computed = compute_discount(promo, &check.items);
                    for (line, line_discount) in check.items.iter_mut().zip(computed.item_discounts) {
                        line.discount = line_discount;
                    }
                    computed.total
                }
                None => {
                    warn!(
                        check_id = %check.id,
                        promotion_id = %promotion_id,
                        "Promotion no longer applicable, revoking"
                    );
                    check.applied_promotion_id = None;
                    Money::zero()
                }
            },
            None => match check.discount_percent {
                Some(percent) => subtotal.percent_of(percent),
                None => check.manual_discount.unwrap_or_default(),
            },
        };

        check.subtotal = subtotal;
        check.discount = discount.clamp_between(Money::zero(), subtotal);
        check.total = check.subtotal - check.discount;
        check.tax = check.total.included_tax(self.tax_rate);
        check
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn ensure_open(check: &Check) -> CoreResult<()> {
    if check.is_open() {
        Ok(())
    } else {
        Err(CoreError::CheckNotOpen {
            check_id: check.id.clone(),
            status: check.status.as_str().to_string(),
        })
    }
}

fn new_line(item: NewCartItem) -> CartItem {
    CartItem {
        service_id: Uuid::new_v4().to_string(),
        product_id: item.product_id,
        name: item.name,
        category: item.category,
        category_id: item.category_id,
        price: item.price,
        quantity: item.quantity,
        modifiers: item.modifiers,
        subtotal: item.price * item.quantity,
        discount: Money::zero(),
    }
}

/// Validates client-supplied lines, merges duplicates and fills missing
/// line ids.
pub(crate) fn normalize_lines(items: Vec<CartItem>) -> CoreResult<Vec<CartItem>> {
    let mut lines: Vec<CartItem> = Vec::with_capacity(items.len());

    for mut item in items {
        validate_required("productId", &item.product_id)?;
        validate_quantity(item.quantity)?;
        validate_price(item.price)?;

        if let Some(line) = lines
            .iter_mut()
            .find(|line| line.is_same_line(&item.product_id, &item.modifiers))
        {
            let merged = line.quantity + item.quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = merged;
            continue;
        }

        validate_check_size(lines.len())?;
        if item.service_id.trim().is_empty() {
            item.service_id = Uuid::new_v4().to_string();
        }
        lines.push(item);
    }

    Ok(lines)
}

// =============================================================================
// Unit Tests
// =============================================================================
