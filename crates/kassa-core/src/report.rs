//! # Reconciliation Reporter
//!
//! Builds the live X-report of an open shift, the close preview, and the
//! frozen Z-report of a closed shift. All three share one aggregation.
//!
//! ## Cash On Hand
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  currentBalance = startBalance                                          │
//! │                 + totalSalesCash        (cash receipts + mixed.cash)    │
//! │                 + totalIncome           (manual)                        │
//! │                 − totalExpenses         (manual, absolute)              │
//! │                 − totalIncasation       (manual, absolute)              │
//! │                                                                         │
//! │  Card and certificate sales never touch the drawer.                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::denomination::{cash_difference, counted_total};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    DenominationCounts, PaymentMethod, Receipt, Shift, ShiftStatus, Transaction, TransactionKind,
};

/// Category used for lines without one.
pub const FALLBACK_CATEGORY: &str = "other";

// =============================================================================
// Report Types
// =============================================================================

/// Live totals of a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct XReport {
    pub shift_id: String,
    pub shift_number: i64,
    pub cashier_name: String,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    pub status: ShiftStatus,
    pub receipts_count: u32,
    pub total_sales: Money,
    pub total_sales_cash: Money,
    pub total_sales_card: Money,
    pub total_sales_certificate: Money,
    pub start_balance: Money,
    pub total_income: Money,
    pub total_expenses: Money,
    pub total_incasation: Money,
    pub current_balance: Money,
    pub sales_by_category: BTreeMap<String, Money>,
    /// Manual movements only; sale rows are summarized above.
    pub transactions: Vec<Transaction>,
    /// Informational.
    pub denomination_counts: DenominationCounts,
    pub counted_cash: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopService {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// What closing the shift now would freeze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClosePreview {
    #[serde(flatten)]
    pub summary: XReport,
    pub expected_end_balance: Money,
    pub duration_minutes: i64,
    pub top_services: Vec<TopService>,
}

/// Frozen totals of a closed shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ZReport {
    #[serde(flatten)]
    pub summary: XReport,
    #[ts(as = "String")]
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub end_balance: Money,
    /// `countedCash − endBalance`: positive surplus, negative shortage.
    pub cash_difference: Option<Money>,
    pub top_services: Vec<TopService>,
}

// =============================================================================
// Builders
// =============================================================================

/// Aggregates receipts and transactions of a shift.
///
/// Works for open and closed shifts alike; `status` is copied from the
/// shift.
pub fn build_x_report(shift: &Shift, receipts: &[Receipt], transactions: &[Transaction]) -> XReport {
    let mut report = XReport {
        shift_id: shift.id.clone(),
        shift_number: shift.shift_number,
        cashier_name: shift.cashier_name.clone(),
        start_time: shift.start_time,
        status: shift.status,
        receipts_count: receipts.len() as u32,
        total_sales: Money::zero(),
        total_sales_cash: Money::zero(),
        total_sales_card: Money::zero(),
        total_sales_certificate: Money::zero(),
        start_balance: shift.start_balance,
        total_income: Money::zero(),
        total_expenses: Money::zero(),
        total_incasation: Money::zero(),
        current_balance: Money::zero(),
        sales_by_category: BTreeMap::new(),
        transactions: Vec::new(),
        denomination_counts: shift.denomination_counts.clone(),
        counted_cash: counted_total(&shift.denomination_counts)
            .ok()
            .filter(|total| !total.is_zero()),
    };

    for receipt in receipts {
        report.total_sales += receipt.total;
        match receipt.payment_method {
            PaymentMethod::Cash => report.total_sales_cash += receipt.total,
            PaymentMethod::Card => report.total_sales_card += receipt.total,
            PaymentMethod::Mixed => {
                let details = receipt.payment_details.unwrap_or_default();
                report.total_sales_cash += details.cash;
                report.total_sales_card += details.card;
                report.total_sales_certificate += details.certificate;
            }
        }

        for item in &receipt.items {
            let amount = if item.subtotal.is_zero() {
                item.line_subtotal()
            } else {
                item.subtotal
            };
            let category = if item.category.trim().is_empty() {
                FALLBACK_CATEGORY.to_string()
            } else {
                item.category.clone()
            };
            *report.sales_by_category.entry(category).or_default() += amount;
        }
    }

    // The kind decides; a manual income may carry any free-text category
    for transaction in transactions.iter().filter(|t| t.kind.is_manual()) {
        match transaction.kind {
            TransactionKind::Income => report.total_income += transaction.amount.abs(),
            TransactionKind::Expense => report.total_expenses += transaction.amount.abs(),
            TransactionKind::Incasation => report.total_incasation += transaction.amount.abs(),
            TransactionKind::SaleCash | TransactionKind::SaleCard => {}
        }
        report.transactions.push(transaction.clone());
    }

    report.current_balance = report.start_balance + report.total_sales_cash + report.total_income
        - report.total_expenses
        - report.total_incasation;

    report
}

/// Best-selling products of the given receipts by revenue.
pub fn top_services(receipts: &[Receipt], limit: usize) -> Vec<TopService> {
    let mut by_product: HashMap<&str, TopService> = HashMap::new();

    for item in receipts.iter().flat_map(|r| r.items.iter()) {
        let entry = by_product
            .entry(item.product_id.as_str())
            .or_insert_with(|| TopService {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                quantity: 0,
                revenue: Money::zero(),
            });
        entry.quantity += item.quantity;
        entry.revenue += item.line_subtotal();
    }

    let mut services: Vec<TopService> = by_product.into_values().collect();
    services.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(b.quantity.cmp(&a.quantity))
            .then_with(|| a.name.cmp(&b.name))
    });
    services.truncate(limit);
    services
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_minutes().max(0)
}

/// Same aggregates as a Z-report, without touching the shift.
pub fn preview_close(
    shift: &Shift,
    receipts: &[Receipt],
    transactions: &[Transaction],
    now: DateTime<Utc>,
    top_limit: usize,
) -> ClosePreview {
    let summary = build_x_report(shift, receipts, transactions);
    ClosePreview {
        expected_end_balance: summary.current_balance,
        duration_minutes: minutes_between(shift.start_time, shift.end_time.unwrap_or(now)),
        top_services: top_services(receipts, top_limit),
        summary,
    }
}

/// Freezes the Z-report of a closed shift.
pub fn build_z_report(
    shift: &Shift,
    receipts: &[Receipt],
    transactions: &[Transaction],
    top_limit: usize,
) -> CoreResult<ZReport> {
    let (Some(end_time), Some(end_balance)) = (shift.end_time, shift.end_balance) else {
        return Err(CoreError::ShiftStillOpen {
            shift_id: shift.id.clone(),
        });
    };
    if shift.status != ShiftStatus::Closed {
        return Err(CoreError::ShiftStillOpen {
            shift_id: shift.id.clone(),
        });
    }

    Ok(ZReport {
        summary: build_x_report(shift, receipts, transactions),
        end_time,
        duration_minutes: minutes_between(shift.start_time, end_time),
        end_balance,
        cash_difference: cash_difference(&shift.denomination_counts, end_balance)?,
        top_services: top_services(receipts, top_limit),
    })
}

/// Re-derives the count-dependent fields after a late denomination amendment.
pub fn refresh_z_report_count(mut report: ZReport, counts: &DenominationCounts) -> CoreResult<ZReport> {
    report.summary.counted_cash = Some(counted_total(counts)?).filter(|total| !total.is_zero());
    report.summary.denomination_counts = counts.clone();
    report.cash_difference = cash_difference(counts, report.end_balance)?;
    Ok(report)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartItem, PaymentDetails};
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-14T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn shift() -> Shift {
        Shift {
            id: "shift-1".into(),
            register_id: "main".into(),
            shift_number: 12,
            cashier_id: "staff-1".into(),
            cashier_name: "Olena".into(),
            start_time: start(),
            end_time: None,
            start_balance: Money::from_major(1000),
            end_balance: None,
            status: ShiftStatus::Open,
            active_staff_ids: vec!["staff-1".into()],
            denomination_counts: Default::default(),
            cash_difference: None,
        }
    }

    fn line(product_id: &str, category: &str, price_major: i64, qty: i64) -> CartItem {
        CartItem {
            service_id: format!("l-{product_id}"),
            product_id: product_id.into(),
            name: product_id.into(),
            category: category.into(),
            category_id: None,
            price: Money::from_major(price_major),
            quantity: qty,
            modifiers: vec![],
            subtotal: Money::from_major(price_major * qty),
            discount: Money::zero(),
        }
    }

    fn receipt(number: i64, method: PaymentMethod, items: Vec<CartItem>) -> Receipt {
        let total: Money = items.iter().map(|i| i.subtotal).sum();
        Receipt {
            id: format!("r-{number}"),
            receipt_number: number,
            check_id: format!("c-{number}"),
            shift_id: "shift-1".into(),
            table_id: "t-1".into(),
            table_name: "Table 1".into(),
            waiter_id: None,
            waiter_name: None,
            guests_count: 1,
            items,
            subtotal: total,
            discount: Money::zero(),
            tax: Money::zero(),
            total,
            applied_promotion_id: None,
            payment_method: method,
            payment_details: None,
            amount_given: None,
            change: Money::zero(),
            comment: String::new(),
            customer_id: None,
            customer_name: None,
            created_at: start(),
            updated_at: start(),
            history: vec![],
        }
    }

    fn transaction(kind: TransactionKind, category: &str, major: i64) -> Transaction {
        Transaction {
            id: format!("tx-{major}"),
            shift_id: "shift-1".into(),
            kind,
            category: category.into(),
            amount: kind.signed(Money::from_major(major)),
            comment: String::new(),
            receipt_id: None,
            created_at: start(),
        }
    }

    #[test]
    fn test_balance_scenario() {
        let receipts = vec![
            receipt(1, PaymentMethod::Cash, vec![line("set", "kitchen", 250, 1)]),
            receipt(2, PaymentMethod::Card, vec![line("pool", "billiards", 400, 1)]),
        ];
        let transactions = vec![
            transaction(TransactionKind::SaleCash, "sales", 250),
            transaction(TransactionKind::SaleCard, "sales", 400),
            transaction(TransactionKind::Expense, "supplies", 50),
        ];

        let report = build_x_report(&shift(), &receipts, &transactions);
        assert_eq!(report.total_sales_cash, Money::from_major(250));
        assert_eq!(report.total_sales_card, Money::from_major(400));
        assert_eq!(report.total_expenses, Money::from_major(50));
        assert_eq!(report.current_balance, Money::from_major(1200));
        assert_eq!(report.transactions.len(), 1);
        assert_eq!(report.receipts_count, 2);
    }

    #[test]
    fn test_balance_formula_holds_for_all_kinds() {
        let mut mixed = receipt(3, PaymentMethod::Mixed, vec![line("set", "kitchen", 300, 1)]);
        mixed.payment_details = Some(PaymentDetails {
            cash: Money::from_major(100),
            card: Money::from_major(150),
            certificate: Money::from_major(50),
        });
        let transactions = vec![
            transaction(TransactionKind::Income, "float", 200),
            transaction(TransactionKind::Incasation, "safe", 500),
            transaction(TransactionKind::Expense, "supplies", 30),
        ];

        let r = build_x_report(&shift(), &[mixed], &transactions);
        assert_eq!(r.total_sales, Money::from_major(300));
        assert_eq!(r.total_sales_certificate, Money::from_major(50));
        assert_eq!(
            r.current_balance,
            r.start_balance + r.total_sales_cash + r.total_income - r.total_expenses - r.total_incasation
        );
        assert_eq!(r.current_balance, Money::from_major(770));
    }

    #[test]
    fn test_manual_income_counts_whatever_its_category() {
        let transactions = vec![
            transaction(TransactionKind::Income, "sales", 100),
            transaction(TransactionKind::SaleCash, "sales", 40),
        ];

        let r = build_x_report(&shift(), &[], &transactions);
        assert_eq!(r.total_income, Money::from_major(100));
        assert_eq!(r.current_balance, Money::from_major(1100));
        assert_eq!(r.transactions.len(), 1);
        assert_eq!(r.transactions[0].kind, TransactionKind::Income);
    }

    #[test]
    fn test_sales_by_category_with_fallback() {
        let mut no_subtotal = line("tea", "", 40, 2);
        no_subtotal.subtotal = Money::zero();
        let receipts = vec![receipt(
            1,
            PaymentMethod::Cash,
            vec![line("beer", "bar", 60, 2), no_subtotal],
        )];

        let report = build_x_report(&shift(), &receipts, &[]);
        assert_eq!(report.sales_by_category["bar"], Money::from_major(120));
        assert_eq!(report.sales_by_category[FALLBACK_CATEGORY], Money::from_major(80));
    }

    #[test]
    fn test_top_services_ordering() {
        let receipts = vec![
            receipt(1, PaymentMethod::Cash, vec![line("beer", "bar", 60, 3), line("pool", "billiards", 400, 1)]),
            receipt(2, PaymentMethod::Card, vec![line("beer", "bar", 60, 2)]),
        ];
        let top = top_services(&receipts, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "pool");

        let all = top_services(&receipts, 10);
        assert_eq!(all[1].quantity, 5);
        assert_eq!(all[1].revenue, Money::from_major(300));
    }

    #[test]
    fn test_z_report_requires_closed_shift() {
        assert!(matches!(
            build_z_report(&shift(), &[], &[], 10),
            Err(CoreError::ShiftStillOpen { .. })
        ));
    }

    #[test]
    fn test_z_report_cash_difference() {
        let mut closed = shift();
        closed.status = ShiftStatus::Closed;
        closed.end_time = Some(start() + Duration::hours(8));
        closed.end_balance = Some(Money::from_major(1200));
        closed.denomination_counts = [("1000", 1), ("100", 1), ("50", 1), ("20", 1), ("10", 1)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();

        let z = build_z_report(&closed, &[], &[], 10).unwrap();
        assert_eq!(z.duration_minutes, 480);
        assert_eq!(z.cash_difference, Some(Money::from_major(-20)));
        assert_eq!(z.summary.counted_cash, Some(Money::from_major(1180)));

        let z = refresh_z_report_count(z, &DenominationCounts::new()).unwrap();
        assert_eq!(z.cash_difference, None);
        assert_eq!(z.summary.counted_cash, None);
    }

    #[test]
    fn test_preview_does_not_need_close() {
        let receipts = vec![receipt(1, PaymentMethod::Cash, vec![line("set", "kitchen", 250, 1)])];
        let preview = preview_close(&shift(), &receipts, &[], start() + Duration::minutes(95), 5);
        assert_eq!(preview.expected_end_balance, Money::from_major(1250));
        assert_eq!(preview.duration_minutes, 95);
        assert_eq!(preview.summary.status, ShiftStatus::Open);
    }

    #[test]
    fn test_z_report_flattens_summary() {
        let mut closed = shift();
        closed.status = ShiftStatus::Closed;
        closed.end_time = Some(start());
        closed.end_balance = Some(Money::from_major(1000));
        let z = build_z_report(&closed, &[], &[], 10).unwrap();

        let json = serde_json::to_value(&z).unwrap();
        assert_eq!(json["currentBalance"], 100_000);
        assert_eq!(json["endBalance"], 100_000);
        assert!(json["cashDifference"].is_null());
    }
}
