//! # Sale Ledger
//!
//! The single owner of every `Sale` and its installments.
//!
//! ## Consolidation on Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  New CREDIT sale for a registered customer                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Open credit sale for the same customer in the same calendar month?    │
//! │       │                                                                 │
//! │       ├── yes ──► merge carts, add amounts, spread the new debt        │
//! │       │           evenly across the EXISTING schedule, description     │
//! │       │           becomes "Consolidada: ...", status Partial           │
//! │       │                                                                 │
//! │       └── no ───► fresh Sale with its own installment schedule         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One receivable per customer per month instead of a pile of small
//! schedules. Walk-in and cash sales never consolidate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::same_month;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::schedule::{build_installments, PaymentPlan};
use crate::types::{new_id, FeeRate, Installment, PaymentStatus, Sale, SaleItem, SaleKind};
use crate::validation::{validate_cart, validate_fee_rate, validate_non_negative};
use crate::{MAX_CONSOLIDATED_DESCRIPTION_LEN, MAX_DESCRIPTION_LEN, WALK_IN_CUSTOMER_ID};

// =============================================================================
// New Sale Input
// =============================================================================

/// What the point-of-sale form submits to create a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub customer_id: String,
    pub items: Vec<SaleItem>,
    pub discount: Money,
    pub card_fee_rate: FeeRate,
    pub plan: PaymentPlan,
}

// =============================================================================
// Sale Ledger
// =============================================================================

/// In-memory sale collection, kept in stable insertion order (the payment
/// allocator depends on that order being deterministic).
#[derive(Debug, Clone, Default)]
pub struct SaleLedger {
    sales: Vec<Sale>,
}

impl SaleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the ledger from a loaded dataset.
    pub fn from_sales(sales: Vec<Sale>) -> Self {
        SaleLedger { sales }
    }

    pub fn sales(&self) -> &[Sale] {
        &self.sales
    }

    pub(crate) fn sales_mut(&mut self) -> &mut [Sale] {
        &mut self.sales
    }

    pub fn into_sales(self) -> Vec<Sale> {
        self.sales
    }

    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Sale> {
        self.sales.iter().find(|s| s.id == id)
    }

    /// Removes and returns a sale (the lifecycle manager moves it into the
    /// trash). Unknown id returns `None`.
    pub fn take(&mut self, id: &str) -> Option<Sale> {
        let pos = self.sales.iter().position(|s| s.id == id)?;
        Some(self.sales.remove(pos))
    }

    /// Puts a sale (back) into the ledger, e.g. on restore from trash.
    pub fn insert(&mut self, sale: Sale) {
        self.sales.push(sale);
    }

    /// Creates a sale from the cart, consolidating into an open same-month
    /// credit sale when one exists. Returns the id of the affected sale.
    ///
    /// ## Preconditions
    /// Non-empty cart, positive quantities, non-negative prices and
    /// discount, fee rate at most 100%, and a strictly positive total.
    /// Violations reject the whole operation before anything mutates.
    pub fn create(&mut self, new: NewSale, today: NaiveDate) -> CoreResult<String> {
        validate_cart(&new.items)?;
        validate_non_negative("discount", new.discount)?;
        validate_fee_rate(new.card_fee_rate)?;

        let base: Money = new.items.iter().map(|i| i.line_total()).sum();
        let total = (base - new.discount).clamp_non_negative();
        if !total.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "totalAmount".to_string(),
            }
            .into());
        }
        let fee = total.fee(new.card_fee_rate);
        let net = total - fee;
        let cost: Money = new.items.iter().map(|i| i.line_cost()).sum();

        if new.plan.kind() == SaleKind::Credit && new.customer_id != WALK_IN_CUSTOMER_ID {
            if let Some(pos) = self.find_consolidation_target(&new.customer_id, today) {
                return Ok(self.consolidate_into(pos, new.items, base, new.discount, total, fee, net, cost));
            }
        }

        let sale_id = new_id();
        let installments = build_installments(&sale_id, total, &new.plan, today)?;
        let kind = new.plan.kind();
        let status = match kind {
            SaleKind::Cash => PaymentStatus::Paid,
            SaleKind::Credit => PaymentStatus::Pending,
        };

        let sale = Sale {
            id: sale_id.clone(),
            customer_id: new.customer_id,
            description: summarize_items(&new.items, MAX_DESCRIPTION_LEN),
            items: new.items,
            base_amount_cents: base.cents(),
            discount_cents: new.discount.cents(),
            total_amount_cents: total.cents(),
            card_fee_rate: new.card_fee_rate,
            card_fee_cents: fee.cents(),
            net_amount_cents: net.cents(),
            total_cost_cents: cost.cents(),
            date: today,
            installments,
            status,
            kind,
        };
        self.sales.push(sale);
        Ok(sale_id)
    }

    /// First open (status ≠ Paid) credit sale for this customer dated in
    /// the same calendar month as `today`.
    fn find_consolidation_target(&self, customer_id: &str, today: NaiveDate) -> Option<usize> {
        self.sales.iter().position(|s| {
            s.customer_id == customer_id
                && s.kind == SaleKind::Credit
                && s.status != PaymentStatus::Paid
                && !s.installments.is_empty()
                && same_month(s.date, today)
        })
    }

    /// Merges a new cart into an existing open credit sale.
    ///
    /// Monetary fields are additive; the new debt is spread evenly across
    /// the EXISTING installment count (floor-to-cents, last slice absorbs
    /// the remainder, same as the scheduler), `paid_amount` is untouched
    /// and statuses are re-derived against the grown amounts.
    #[allow(clippy::too_many_arguments)]
    fn consolidate_into(
        &mut self,
        pos: usize,
        items: Vec<SaleItem>,
        base: Money,
        discount: Money,
        total: Money,
        fee: Money,
        net: Money,
        cost: Money,
    ) -> String {
        let sale = &mut self.sales[pos];
        let count = sale.installments.len() as u32;
        let slice = total.split_even(count);
        let last = total - slice.multiply_quantity(count as i64 - 1);

        for (i, inst) in sale.installments.iter_mut().enumerate() {
            let add = if i as u32 == count - 1 { last } else { slice };
            inst.amount_cents += add.cents();
            inst.status = inst.derived_status();
        }

        sale.items.extend(items);
        sale.base_amount_cents += base.cents();
        sale.discount_cents += discount.cents();
        sale.total_amount_cents += total.cents();
        sale.card_fee_cents += fee.cents();
        sale.net_amount_cents += net.cents();
        sale.total_cost_cents += cost.cents();
        sale.description = format!(
            "Consolidada: {}",
            join_descriptions(&sale.items)
        );
        sale.description = truncate_chars(&sale.description, MAX_CONSOLIDATED_DESCRIPTION_LEN);
        sale.status = PaymentStatus::Partial;
        sale.id.clone()
    }

    /// Full-replacement update (installment edits, status corrections).
    ///
    /// Derived monetary fields are recomputed from the item list and both
    /// installment and sale statuses are re-derived from payment state, so
    /// a caller can never leave the sale internally inconsistent. Explicit
    /// `Canceled` marks survive. Unknown id is a no-op.
    pub fn replace(&mut self, mut sale: Sale) {
        let Some(existing) = self.sales.iter_mut().find(|s| s.id == sale.id) else {
            return;
        };
        sale.recompute_amounts();
        for inst in &mut sale.installments {
            if inst.status != PaymentStatus::Canceled {
                inst.status = inst.derived_status();
            }
        }
        if sale.status != PaymentStatus::Canceled {
            sale.status = sale.derived_status();
        }
        *existing = sale;
    }

    /// Appends an item to an existing sale.
    ///
    /// The line total lands on the first not-fully-paid installment, or on
    /// a fresh installment due today when the schedule is already settled.
    /// The sale is forced to `Partial`: new debt on an old sale always
    /// leaves something owed. Unknown id is a silent no-op.
    pub fn add_item(&mut self, sale_id: &str, item: SaleItem, today: NaiveDate) -> bool {
        let Some(sale) = self.sales.iter_mut().find(|s| s.id == sale_id) else {
            return false;
        };

        let addition = item.line_total();
        sale.items.push(item);
        sale.recompute_amounts();
        sale.description = summarize_items(&sale.items, MAX_DESCRIPTION_LEN);

        match sale.installments.iter_mut().find(|i| !i.is_settled()) {
            Some(inst) => {
                inst.amount_cents += addition.cents();
                inst.status = inst.derived_status();
            }
            None => sale.installments.push(Installment {
                id: new_id(),
                sale_id: sale_id.to_string(),
                amount_cents: addition.cents(),
                paid_amount_cents: 0,
                due_date: today,
                payment_date: None,
                status: PaymentStatus::Pending,
            }),
        }

        sale.status = PaymentStatus::Partial;
        true
    }
}

// =============================================================================
// Description Helpers
// =============================================================================

fn join_descriptions(items: &[SaleItem]) -> String {
    items
        .iter()
        .map(|i| i.description.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Joins item descriptions and caps the result at `max` characters.
fn summarize_items(items: &[SaleItem], max: usize) -> String {
    truncate_chars(&join_descriptions(items), max)
}

/// Char-boundary-safe truncation (descriptions are pt-BR text).
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(desc: &str, price: i64, qty: i64) -> SaleItem {
        SaleItem {
            id: new_id(),
            product_id: None,
            description: desc.to_string(),
            price_cents: price,
            cost_price_cents: price / 2,
            quantity: qty,
        }
    }

    fn credit_sale(count: u32, first_due: NaiveDate) -> PaymentPlan {
        PaymentPlan::Credit {
            installments: count,
            first_due,
        }
    }

    fn new_credit(customer: &str, items: Vec<SaleItem>, count: u32, first_due: NaiveDate) -> NewSale {
        NewSale {
            customer_id: customer.to_string(),
            items,
            discount: Money::zero(),
            card_fee_rate: FeeRate::zero(),
            plan: credit_sale(count, first_due),
        }
    }

    #[test]
    fn test_create_cash_sale_is_settled() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                NewSale {
                    customer_id: WALK_IN_CUSTOMER_ID.to_string(),
                    items: vec![item("Saia", 4500, 1)],
                    discount: Money::zero(),
                    card_fee_rate: FeeRate::zero(),
                    plan: PaymentPlan::Cash,
                },
                d(2025, 3, 5),
            )
            .unwrap();

        let sale = ledger.get(&id).unwrap();
        assert_eq!(sale.kind, SaleKind::Cash);
        assert_eq!(sale.status, PaymentStatus::Paid);
        assert_eq!(sale.installments.len(), 1);
        assert_eq!(sale.total_paid(), Money::from_cents(4500));
        assert_eq!(sale.description, "Saia");
    }

    #[test]
    fn test_create_rejects_empty_cart_and_zero_total() {
        let mut ledger = SaleLedger::new();
        let today = d(2025, 3, 5);

        let empty = new_credit("c1", vec![], 2, d(2025, 4, 1));
        assert!(ledger.create(empty, today).is_err());

        let mut zeroed = new_credit("c1", vec![item("Brinde", 1000, 1)], 2, d(2025, 4, 1));
        zeroed.discount = Money::from_cents(1000);
        assert!(ledger.create(zeroed, today).is_err());
        assert!(ledger.is_empty(), "failed create must not mutate");
    }

    #[test]
    fn test_create_credit_sale_with_fee_and_discount() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                NewSale {
                    customer_id: "c1".to_string(),
                    items: vec![item("Vestido", 20000, 1)],
                    discount: Money::from_cents(2000),
                    card_fee_rate: FeeRate::from_percentage(2.5),
                    plan: credit_sale(2, d(2025, 4, 10)),
                },
                d(2025, 3, 5),
            )
            .unwrap();

        let sale = ledger.get(&id).unwrap();
        assert_eq!(sale.base_amount_cents, 20000);
        assert_eq!(sale.total_amount_cents, 18000);
        assert_eq!(sale.card_fee_cents, 450); // 2.5% of 180.00
        assert_eq!(sale.net_amount_cents, 17550);
        assert_eq!(sale.status, PaymentStatus::Pending);
        let sum: i64 = sale.installments.iter().map(|i| i.amount_cents).sum();
        assert_eq!(sum, 18000);
    }

    #[test]
    fn test_same_month_credit_sales_consolidate() {
        let mut ledger = SaleLedger::new();
        let first = ledger
            .create(
                new_credit("c1", vec![item("Vestido", 30000, 1)], 3, d(2025, 4, 10)),
                d(2025, 3, 5),
            )
            .unwrap();
        let second = ledger
            .create(
                new_credit("c1", vec![item("Cinto", 9000, 1)], 6, d(2025, 5, 1)),
                d(2025, 3, 20),
            )
            .unwrap();

        assert_eq!(first, second, "second sale must merge into the first");
        assert_eq!(ledger.len(), 1);

        let sale = ledger.get(&first).unwrap();
        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.total_amount_cents, 39000);
        // The schedule keeps the ORIGINAL three slices, grown evenly
        assert_eq!(sale.installments.len(), 3);
        let amounts: Vec<i64> = sale.installments.iter().map(|i| i.amount_cents).collect();
        assert_eq!(amounts, vec![13000, 13000, 13000]);
        assert_eq!(sale.status, PaymentStatus::Partial);
        assert!(sale.description.starts_with("Consolidada: "));
        assert!(sale.description.chars().count() <= MAX_CONSOLIDATED_DESCRIPTION_LEN);
    }

    #[test]
    fn test_consolidation_spreads_remainder_onto_last_slice() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                new_credit("c1", vec![item("Blusa", 30000, 1)], 3, d(2025, 4, 10)),
                d(2025, 3, 5),
            )
            .unwrap();
        ledger
            .create(
                new_credit("c1", vec![item("Meia", 100, 1)], 1, d(2025, 5, 1)),
                d(2025, 3, 6),
            )
            .unwrap();

        let sale = ledger.get(&id).unwrap();
        let amounts: Vec<i64> = sale.installments.iter().map(|i| i.amount_cents).collect();
        // 100 over 3 slices: 33 / 33 / 34
        assert_eq!(amounts, vec![10033, 10033, 10034]);
        let sum: i64 = amounts.iter().sum();
        assert_eq!(sum, sale.total_amount_cents);
    }

    #[test]
    fn test_different_month_credit_sales_stay_separate() {
        let mut ledger = SaleLedger::new();
        let a = ledger
            .create(
                new_credit("c1", vec![item("Vestido", 30000, 1)], 3, d(2025, 4, 10)),
                d(2025, 3, 28),
            )
            .unwrap();
        let b = ledger
            .create(
                new_credit("c1", vec![item("Cinto", 9000, 1)], 2, d(2025, 5, 1)),
                d(2025, 4, 2),
            )
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_walk_in_and_paid_sales_never_consolidate() {
        let mut ledger = SaleLedger::new();
        let today = d(2025, 3, 5);

        // Walk-in credit sales are one-off by definition
        let a = ledger
            .create(
                new_credit(WALK_IN_CUSTOMER_ID, vec![item("A", 1000, 1)], 1, d(2025, 4, 1)),
                today,
            )
            .unwrap();
        let b = ledger
            .create(
                new_credit(WALK_IN_CUSTOMER_ID, vec![item("B", 1000, 1)], 1, d(2025, 4, 1)),
                today,
            )
            .unwrap();
        assert_ne!(a, b);

        // A fully paid sale no longer attracts new purchases
        let c = ledger
            .create(new_credit("c9", vec![item("C", 1000, 1)], 1, d(2025, 4, 1)), today)
            .unwrap();
        crate::payment::allocate(
            &mut ledger,
            "c9",
            d(2025, 4, 1),
            Money::from_cents(1000),
            d(2025, 3, 6),
        )
        .unwrap();
        assert_eq!(ledger.get(&c).unwrap().status, PaymentStatus::Paid);

        let d2 = ledger
            .create(new_credit("c9", vec![item("D", 500, 1)], 1, d(2025, 4, 1)), today)
            .unwrap();
        assert_ne!(c, d2);
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_replace_recomputes_derived_fields() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                new_credit("c1", vec![item("Vestido", 10000, 1)], 2, d(2025, 4, 10)),
                d(2025, 3, 5),
            )
            .unwrap();

        let mut edited = ledger.get(&id).unwrap().clone();
        edited.installments[0].paid_amount_cents = 5000;
        // Caller hands in stale fields; replace must not trust them
        edited.status = PaymentStatus::Pending;
        edited.base_amount_cents = 0;
        ledger.replace(edited);

        let sale = ledger.get(&id).unwrap();
        assert_eq!(sale.base_amount_cents, 10000);
        assert_eq!(sale.installments[0].status, PaymentStatus::Paid);
        assert_eq!(sale.status, PaymentStatus::Partial);
    }

    #[test]
    fn test_replace_unknown_id_is_noop() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                new_credit("c1", vec![item("Bolsa", 5000, 1)], 1, d(2025, 4, 1)),
                d(2025, 3, 5),
            )
            .unwrap();

        let mut ghost = ledger.get(&id).unwrap().clone();
        ghost.id = "nao-existe".to_string();
        ghost.items.push(item("Extra", 100, 1));
        ledger.replace(ghost);

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(&id).unwrap().items.len(), 1);
    }

    #[test]
    fn test_add_item_grows_first_open_installment() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                new_credit("c1", vec![item("Vestido", 10000, 1)], 2, d(2025, 4, 10)),
                d(2025, 3, 5),
            )
            .unwrap();

        assert!(ledger.add_item(&id, item("Lenço", 2000, 1), d(2025, 3, 8)));

        let sale = ledger.get(&id).unwrap();
        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.total_amount_cents, 12000);
        assert_eq!(sale.installments[0].amount_cents, 7000);
        assert_eq!(sale.installments[1].amount_cents, 5000);
        assert_eq!(sale.status, PaymentStatus::Partial);
        assert_eq!(sale.description, "Vestido, Lenço");
    }

    #[test]
    fn test_add_item_to_settled_sale_appends_installment() {
        let mut ledger = SaleLedger::new();
        let today = d(2025, 3, 5);
        let id = ledger
            .create(
                NewSale {
                    customer_id: "c1".to_string(),
                    items: vec![item("Saia", 5000, 1)],
                    discount: Money::zero(),
                    card_fee_rate: FeeRate::zero(),
                    plan: PaymentPlan::Cash,
                },
                today,
            )
            .unwrap();

        assert!(ledger.add_item(&id, item("Cinto", 3000, 1), d(2025, 3, 9)));

        let sale = ledger.get(&id).unwrap();
        assert_eq!(sale.installments.len(), 2);
        let added = &sale.installments[1];
        assert_eq!(added.amount_cents, 3000);
        assert_eq!(added.due_date, d(2025, 3, 9));
        assert_eq!(added.status, PaymentStatus::Pending);
        assert_eq!(sale.status, PaymentStatus::Partial);
    }

    #[test]
    fn test_add_item_unknown_sale_is_noop() {
        let mut ledger = SaleLedger::new();
        assert!(!ledger.add_item("fantasma", item("X", 100, 1), d(2025, 1, 1)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_description_truncation() {
        let mut ledger = SaleLedger::new();
        let long = "Vestido longo de festa bordado à mão ".repeat(5);
        let id = ledger
            .create(
                new_credit("c1", vec![item(&long, 10000, 1)], 1, d(2025, 4, 1)),
                d(2025, 3, 5),
            )
            .unwrap();
        let sale = ledger.get(&id).unwrap();
        assert_eq!(sale.description.chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn test_take_and_insert_round_trip() {
        let mut ledger = SaleLedger::new();
        let id = ledger
            .create(
                new_credit("c1", vec![item("Bolsa", 5000, 1)], 1, d(2025, 4, 1)),
                d(2025, 3, 5),
            )
            .unwrap();

        let sale = ledger.take(&id).unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.take(&id).is_none());

        ledger.insert(sale);
        assert_eq!(ledger.len(), 1);
    }
}
