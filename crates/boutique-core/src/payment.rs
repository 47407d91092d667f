//! # Payment Allocator
//!
//! Receivables are collected per customer per due date, not per sale. One
//! payment "card" can span several sales, and one payment spreads across
//! every matching installment until the money runs out.
//!
//! ## Allocation Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate(customer, due_date, R$ 80)                                    │
//! │                                                                         │
//! │  Sale A, inst due 15/04, debt R$ 50 ──► pay 50  (Paid, stamp date)     │
//! │  Sale B, inst due 15/04, debt R$ 50 ──► pay 30  (Partial)              │
//! │  Sale C, inst due 15/05 ─────────────► untouched (different due date)  │
//! │                                                                         │
//! │  returns R$ 80 allocated; excess beyond total debt is discarded        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are visited in stable insertion order, so allocation is
//! first-created, first-served and fully deterministic.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::sales::SaleLedger;
use crate::types::{Customer, PaymentStatus, Sale};
use crate::validation::validate_payment_amount;
use crate::WALK_IN_CUSTOMER_ID;

/// Display length cap for the short item descriptions on a card.
const SHORT_DESCRIPTION_LEN: usize = 15;

// =============================================================================
// Allocation
// =============================================================================

/// Spreads a payment across every installment of `customer_id` due on
/// `due_date`, in sale insertion order.
///
/// Each installment receives `min(debt, remaining)`; a settled installment
/// gets `payment_date = today` and `Paid`, a partially covered one gets
/// `Partial`. Every touched sale has its status re-derived. Money beyond
/// the total debt is silently discarded.
///
/// Returns the amount actually allocated: `min(amount, Σ debt)`.
///
/// ## Errors
/// Rejects non-positive payment amounts before touching anything.
pub fn allocate(
    ledger: &mut SaleLedger,
    customer_id: &str,
    due_date: NaiveDate,
    amount: Money,
    today: NaiveDate,
) -> CoreResult<Money> {
    validate_payment_amount(amount)?;

    let mut remaining = amount;
    for sale in ledger.sales_mut() {
        if sale.customer_id != customer_id {
            continue;
        }
        let mut touched = false;
        for inst in &mut sale.installments {
            if inst.due_date != due_date || inst.status == PaymentStatus::Canceled {
                continue;
            }
            touched = true;
            let pay = inst.outstanding().min(remaining);
            if pay.is_positive() {
                inst.paid_amount_cents += pay.cents();
                remaining -= pay;
                if inst.is_settled() {
                    inst.payment_date = Some(today);
                    inst.status = PaymentStatus::Paid;
                } else {
                    inst.status = PaymentStatus::Partial;
                }
            }
        }
        if touched {
            sale.status = sale.derived_status();
        }
    }
    Ok(amount - remaining)
}

// =============================================================================
// Due Cards
// =============================================================================

/// One consolidated receivable: everything a customer owes on one due date,
/// across however many sales carry installments on that date.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DueCard {
    pub customer_id: String,
    pub customer_name: String,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub amount_cents: i64,
    pub paid_amount_cents: i64,
    pub remaining_cents: i64,
    pub overdue: bool,
    pub sale_ids: Vec<String>,
    pub descriptions: Vec<String>,
}

impl DueCard {
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_cents)
    }
}

/// Builds the consolidated receivables view: one card per customer × due
/// date with an open (not settled, not canceled) installment, sorted by due
/// date then customer.
pub fn due_cards(sales: &[Sale], customers: &[Customer], today: NaiveDate) -> Vec<DueCard> {
    let mut cards: BTreeMap<(NaiveDate, String), DueCard> = BTreeMap::new();

    for sale in sales {
        for inst in &sale.installments {
            if inst.is_settled() || inst.status == PaymentStatus::Canceled {
                continue;
            }
            let key = (inst.due_date, sale.customer_id.clone());
            let card = cards.entry(key).or_insert_with(|| DueCard {
                customer_id: sale.customer_id.clone(),
                customer_name: display_name(&sale.customer_id, customers),
                due_date: inst.due_date,
                amount_cents: 0,
                paid_amount_cents: 0,
                remaining_cents: 0,
                overdue: false,
                sale_ids: Vec::new(),
                descriptions: Vec::new(),
            });

            card.amount_cents += inst.amount_cents;
            card.paid_amount_cents += inst.paid_amount_cents;
            card.remaining_cents += inst.outstanding().cents();
            if !card.sale_ids.contains(&sale.id) {
                card.sale_ids.push(sale.id.clone());
                let short = short_description(&sale.description);
                if !short.is_empty() && !card.descriptions.contains(&short) {
                    card.descriptions.push(short);
                }
            }
        }
    }

    let mut result: Vec<DueCard> = cards.into_values().collect();
    for card in &mut result {
        card.overdue = card.due_date < today && card.remaining_cents > 0;
    }
    result
}

fn display_name(customer_id: &str, customers: &[Customer]) -> String {
    if customer_id == WALK_IN_CUSTOMER_ID {
        return "Venda Balcão".to_string();
    }
    customers
        .iter()
        .find(|c| c.id == customer_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Cliente Excluído".to_string())
}

/// Compact label for a card: the part after "Consolidada:" when present,
/// otherwise the first comma-separated segment, capped and uppercased.
fn short_description(description: &str) -> String {
    let core = match description.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => description.split(',').next().unwrap_or("").trim(),
    };
    core.chars()
        .take(SHORT_DESCRIPTION_LEN)
        .collect::<String>()
        .to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
