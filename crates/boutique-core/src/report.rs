//! # Monthly Statement
//!
//! Derives the month-at-a-glance financials the dashboard shows. Accrual
//! numbers come from sales DATED in the month; cash received comes from
//! installments PAID in the month, regardless of when the sale happened.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Expense, ExpenseCategory, Sale};

/// Financial summary for one calendar month, all values in cents.
///
/// ```text
/// real_revenue  = Σ net_amount (sales in month) − refunds
/// profit        = real_revenue − cost_of_goods − fixed_expenses
/// cash_received = Σ paid installments with payment_date in month
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlyStatement {
    pub year: i32,
    pub month: u32,
    pub gross_revenue_cents: i64,
    pub discounts_cents: i64,
    pub card_fees_cents: i64,
    pub cost_of_goods_cents: i64,
    pub refunds_cents: i64,
    pub fixed_expenses_cents: i64,
    pub real_revenue_cents: i64,
    pub cash_received_cents: i64,
    pub profit_cents: i64,
}

impl MonthlyStatement {
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

/// Builds the statement for `year`/`month`.
///
/// Undated expenses are legacy rows and count as recurring fixed costs in
/// every month.
pub fn monthly_statement(
    sales: &[Sale],
    expenses: &[Expense],
    year: i32,
    month: u32,
) -> MonthlyStatement {
    let in_month = |date: NaiveDate| date.year() == year && date.month() == month;

    let mut gross = Money::zero();
    let mut discounts = Money::zero();
    let mut card_fees = Money::zero();
    let mut cost_of_goods = Money::zero();
    let mut net = Money::zero();
    for sale in sales.iter().filter(|s| in_month(s.date)) {
        gross += Money::from_cents(sale.base_amount_cents);
        discounts += Money::from_cents(sale.discount_cents);
        card_fees += Money::from_cents(sale.card_fee_cents);
        cost_of_goods += Money::from_cents(sale.total_cost_cents);
        net += Money::from_cents(sale.net_amount_cents);
    }

    let mut refunds = Money::zero();
    let mut fixed = Money::zero();
    for expense in expenses {
        let counts = match expense.date {
            Some(date) => in_month(date),
            None => true, // legacy undated rows recur every month
        };
        if !counts {
            continue;
        }
        match expense.category {
            ExpenseCategory::Refund => refunds += expense.amount(),
            ExpenseCategory::Fixed => fixed += expense.amount(),
            ExpenseCategory::Other => {}
        }
    }

    // Payments received this month, whatever month the sale was made in
    let cash_received: Money = sales
        .iter()
        .flat_map(|s| &s.installments)
        .filter(|i| i.payment_date.is_some_and(in_month))
        .map(|i| i.paid_amount())
        .sum();

    let real_revenue = net - refunds;
    MonthlyStatement {
        year,
        month,
        gross_revenue_cents: gross.cents(),
        discounts_cents: discounts.cents(),
        card_fees_cents: card_fees.cents(),
        cost_of_goods_cents: cost_of_goods.cents(),
        refunds_cents: refunds.cents(),
        fixed_expenses_cents: fixed.cents(),
        real_revenue_cents: real_revenue.cents(),
        cash_received_cents: cash_received.cents(),
        profit_cents: (real_revenue - cost_of_goods - fixed).cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
