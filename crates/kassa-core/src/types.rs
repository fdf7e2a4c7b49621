//! # Domain Types
//!
//! Core domain types of the cash register.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐  1   * ┌─────────────┐  1   0..1 ┌─────────────┐      │
//! │  │    Shift    │───────►│    Check    │──────────►│   Receipt   │      │
//! │  │  open/closed│        │ open/paid/  │ checkout  │ (snapshot + │      │
//! │  │  balances   │        │ void        │           │  history)   │      │
//! │  └──────┬──────┘        └──────┬──────┘           └─────────────┘      │
//! │         │ 1                    │ *                                      │
//! │         │                      ▼                                        │
//! │         │ *              ┌─────────────┐        ┌─────────────┐        │
//! │  ┌──────▼──────┐         │  CartItem   │        │  Promotion  │        │
//! │  │ Transaction │         │ (line)      │◄───────│ conditions  │        │
//! │  │ income/exp/ │         └─────────────┘ match  │ + result    │        │
//! │  │ incasation/ │                                └─────────────┘        │
//! │  │ sale_*      │                                                        │
//! │  └─────────────┘                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All wire names are camelCase; enum values are snake_case.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 2000 bps = 20% VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (config convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Physical cash count: nominal (e.g. `"1000"`, `"0.5"`) → number of pieces.
pub type DenominationCounts = BTreeMap<String, u32>;

// =============================================================================
// Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "open",
            ShiftStatus::Closed => "closed",
        }
    }
}

/// A cashier's working session on one register.
///
/// ## Invariants
/// - At most one `open` shift per register (enforced by storage)
/// - `end_balance` / `end_time` are set only at close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub register_id: String,
    /// Venue-wide monotonic number printed on reports.
    pub shift_number: i64,
    pub cashier_id: String,
    pub cashier_name: String,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    pub start_balance: Money,
    pub end_balance: Option<Money>,
    pub status: ShiftStatus,
    /// Staff clocked in under this shift.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub active_staff_ids: Vec<String>,
    /// Advisory only, never feeds balances.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub denomination_counts: DenominationCounts,
    /// `countedCash - endBalance`, absent while uncounted.
    pub cash_difference: Option<Money>,
}

impl Shift {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Departments & Tables
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub department_id: String,
    pub name: String,
    /// Stored flag; the visible status is derived, see [`TableStatus::derive`].
    pub reserved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Free,
    Busy,
    Reserved,
}

impl TableStatus {
    /// Status is never stored: a table is busy exactly when an open check
    /// references it.
    pub fn derive(has_open_check: bool, reserved: bool) -> Self {
        if has_open_check {
            TableStatus::Busy
        } else if reserved {
            TableStatus::Reserved
        } else {
            TableStatus::Free
        }
    }
}

/// Table as shown on the floor plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub id: String,
    pub department_id: String,
    pub name: String,
    pub status: TableStatus,
    pub open_check_id: Option<String>,
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line on a check.
///
/// ## Line Identity
/// `service_id` identifies the line itself. Two additions of the same
/// `(product_id, modifiers)` merge into one line with a larger quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub service_id: String,
    pub product_id: String,
    pub name: String,
    /// Category display name, kept for reports and legacy promotions.
    pub category: String,
    /// Stable category id, preferred for promotion matching.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Unit price (including modifiers).
    pub price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// `price * quantity`
    pub subtotal: Money,
    #[serde(default)]
    pub discount: Money,
}

impl CartItem {
    /// Computes `price * quantity` without trusting the stored subtotal.
    #[inline]
    pub fn line_subtotal(&self) -> Money {
        self.price * self.quantity
    }

    /// Whether an addition of `(product_id, modifiers)` merges into this line.
    pub fn is_same_line(&self, product_id: &str, modifiers: &[String]) -> bool {
        self.product_id == product_id && modifier_key(&self.modifiers) == modifier_key(modifiers)
    }
}

/// Order-insensitive identity of a modifier set.
pub fn modifier_key(modifiers: &[String]) -> Vec<String> {
    let mut key: Vec<String> = modifiers.to_vec();
    key.sort();
    key
}

/// Item as submitted by the register before it gets a line id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

// =============================================================================
// Check
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Tab is running, items can change.
    Open,
    /// Checkout issued a receipt (terminal).
    Paid,
    /// Cancelled without a receipt (terminal).
    Void,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Open => "open",
            CheckStatus::Paid => "paid",
            CheckStatus::Void => "void",
        }
    }
}

/// A table's running tab.
///
/// ## Invariants
/// - `subtotal == Σ item.price * item.quantity`
/// - `total == subtotal - discount`
/// - `0 <= discount <= subtotal`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub shift_id: String,
    pub table_id: String,
    pub table_name: String,
    pub department_id: String,
    pub waiter_id: Option<String>,
    pub waiter_name: Option<String>,
    pub guests_count: u32,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub discount: Money,
    /// Manual percentage discount (whole percent) while active.
    pub discount_percent: Option<u32>,
    /// Absolute discount as requested; `discount` is this clamped to the
    /// subtotal, so it comes back in full when items are re-added.
    #[serde(default)]
    pub manual_discount: Option<Money>,
    pub applied_promotion_id: Option<String>,
    /// Tax contained in `total`.
    pub tax: Money,
    pub total: Money,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub comment: String,
    pub status: CheckStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Check {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == CheckStatus::Open
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Split across cash, card and (optionally) a gift certificate.
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mixed => "mixed",
        }
    }
}

/// Amount per payment channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub cash: Money,
    #[serde(default)]
    pub card: Money,
    #[serde(default)]
    pub certificate: Money,
}

impl PaymentDetails {
    #[inline]
    pub fn sum(&self) -> Money {
        self.cash + self.card + self.certificate
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Kind of entry in a receipt's audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptAction {
    Created,
    UpdateItems,
    UpdateDiscount,
    UpdateComment,
    UpdateGuests,
    UpdatePayment,
}

/// The editable state of a receipt, captured before each correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSnapshot {
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub comment: String,
    pub guests_count: u32,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<PaymentDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptHistoryEntry {
    pub action: ReceiptAction,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
    pub actor: Option<String>,
    /// State before this entry was applied; `None` for `created`.
    pub previous: Option<ReceiptSnapshot>,
}

/// Immutable record of a completed sale.
///
/// Uses the snapshot pattern: items and totals are copied from the check
/// at the moment of payment, never referenced live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    /// Venue-wide monotonic number.
    pub receipt_number: i64,
    pub check_id: String,
    pub shift_id: String,
    pub table_id: String,
    pub table_name: String,
    pub waiter_id: Option<String>,
    pub waiter_name: Option<String>,
    pub guests_count: u32,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub applied_promotion_id: Option<String>,
    pub payment_method: PaymentMethod,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub payment_details: Option<PaymentDetails>,
    pub amount_given: Option<Money>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "change_due"))]
    pub change: Money,
    pub comment: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Append-only.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub history: Vec<ReceiptHistoryEntry>,
}

impl Receipt {
    pub fn snapshot(&self) -> ReceiptSnapshot {
        ReceiptSnapshot {
            items: self.items.clone(),
            subtotal: self.subtotal,
            discount: self.discount,
            tax: self.tax,
            total: self.total,
            comment: self.comment.clone(),
            guests_count: self.guests_count,
            payment_method: self.payment_method,
            payment_details: self.payment_details,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Kind of cash movement under a shift, resolved once at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Manual cash put into the drawer.
    Income,
    /// Manual cash taken out for a purchase.
    Expense,
    /// Cash moved from the drawer to the safe.
    Incasation,
    /// Cash part of a receipt (written by checkout).
    SaleCash,
    /// Card part of a receipt (written by checkout).
    SaleCard,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Incasation => "incasation",
            TransactionKind::SaleCash => "sale_cash",
            TransactionKind::SaleCard => "sale_card",
        }
    }

    /// Manual movements are listed on X/Z reports; sale rows are not.
    #[inline]
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            TransactionKind::Income | TransactionKind::Expense | TransactionKind::Incasation
        )
    }

    /// Applies the storage sign convention to an unsigned input amount.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            TransactionKind::Expense | TransactionKind::Incasation => -amount.abs(),
            _ => amount.abs(),
        }
    }

    /// Resolves a free-text label from older registers.
    ///
    /// ```rust
    /// use kassa_core::types::TransactionKind;
    ///
    /// assert_eq!(
    ///     TransactionKind::resolve_legacy("Витрата (Accounting)", ""),
    ///     Some(TransactionKind::Expense)
    /// );
    /// assert_eq!(TransactionKind::resolve_legacy("???", ""), None);
    /// ```
    pub fn resolve_legacy(label: &str, category: &str) -> Option<Self> {
        let label = label.to_lowercase();
        let category = category.to_lowercase();

        if label.contains("інкас") || label.contains("incas") || label.contains("collection") {
            Some(TransactionKind::Incasation)
        } else if label.contains("витрат") || label.contains("expense") {
            Some(TransactionKind::Expense)
        } else if label.contains("дохід")
            || label.contains("внесення")
            || label.contains("income")
            || label.contains("deposit")
        {
            Some(TransactionKind::Income)
        } else if category == "sales" || label.contains("продаж") || label.contains("sale") {
            if label.contains("card") || label.contains("карт") {
                Some(TransactionKind::SaleCard)
            } else {
                Some(TransactionKind::SaleCash)
            }
        } else {
            None
        }
    }
}

/// A cash movement recorded under a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub shift_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    /// Signed: expenses and incasations are negative.
    pub amount: Money,
    pub comment: String,
    pub receipt_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Manual transaction as entered by the cashier (amount unsigned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub category: String,
    pub amount: Money,
    #[serde(default)]
    pub comment: String,
}

// =============================================================================
// Promotion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Matches every line of the check.
    TotalAmount,
    /// Matches lines whose product id is targeted.
    Product,
    /// Matches lines whose category is targeted.
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConditionUnit {
    /// Threshold is a quantity of pieces.
    Qty,
    /// Threshold is an amount in minor units.
    Uah,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromotionCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub operator: ConditionOperator,
    pub unit: ConditionUnit,
    pub value: i64,
    #[serde(default)]
    pub target_ids: Vec<String>,
    #[serde(default)]
    pub target_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    FixedDiscount,
    PercentDiscount,
}

/// Discount formula.
///
/// `value` is minor units for `fixed_discount` and whole percent for
/// `percent_discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromotionResult {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub conditions: Vec<PromotionCondition>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub result: PromotionResult,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(20.0).bps(), 2000);
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_table_status_derivation() {
        assert_eq!(TableStatus::derive(true, true), TableStatus::Busy);
        assert_eq!(TableStatus::derive(false, true), TableStatus::Reserved);
        assert_eq!(TableStatus::derive(false, false), TableStatus::Free);
    }

    #[test]
    fn test_same_line_ignores_modifier_order() {
        let item = CartItem {
            service_id: "l1".into(),
            product_id: "latte".into(),
            name: "Latte".into(),
            category: "bar".into(),
            category_id: None,
            price: Money::from_major(60),
            quantity: 1,
            modifiers: vec!["oat".into(), "syrup".into()],
            subtotal: Money::from_major(60),
            discount: Money::zero(),
        };
        assert!(item.is_same_line("latte", &["syrup".into(), "oat".into()]));
        assert!(!item.is_same_line("latte", &["oat".into()]));
        assert!(!item.is_same_line("espresso", &["oat".into(), "syrup".into()]));
    }

    #[test]
    fn test_transaction_sign_convention() {
        let amount = Money::from_major(50);
        assert_eq!(TransactionKind::Expense.signed(amount), -amount);
        assert_eq!(TransactionKind::Incasation.signed(amount), -amount);
        assert_eq!(TransactionKind::Income.signed(amount), amount);
        assert!(TransactionKind::Income.is_manual());
        assert!(!TransactionKind::SaleCash.is_manual());
    }

    #[test]
    fn test_resolve_legacy_labels() {
        assert_eq!(
            TransactionKind::resolve_legacy("Інкасація", ""),
            Some(TransactionKind::Incasation)
        );
        assert_eq!(
            TransactionKind::resolve_legacy("Внесення", "cash"),
            Some(TransactionKind::Income)
        );
        assert_eq!(
            TransactionKind::resolve_legacy("Sale", "sales"),
            Some(TransactionKind::SaleCash)
        );
        assert_eq!(
            TransactionKind::resolve_legacy("Продаж (карта)", "sales"),
            Some(TransactionKind::SaleCard)
        );
    }

    #[test]
    fn test_wire_names() {
        let t = NewTransaction {
            kind: TransactionKind::Incasation,
            category: "safe".into(),
            amount: Money::from_major(300),
            comment: String::new(),
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "incasation");
        assert_eq!(json["amount"], 30000);

        let cond: PromotionCondition = serde_json::from_str(
            r#"{"type":"category","operator":"gte","unit":"qty","value":1,"targetNames":["bar"]}"#,
        )
        .unwrap();
        assert_eq!(cond.kind, ConditionKind::Category);
        assert!(cond.target_ids.is_empty());
    }
}
