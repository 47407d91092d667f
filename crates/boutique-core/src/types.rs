//! # Domain Types
//!
//! Core entity definitions for the boutique back office.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Entity Relationships                             │
//! │                                                                         │
//! │  Customer ──1:N──► Sale ──1:N──► SaleItem ──N:1──► Product (optional)  │
//! │                     │                                                   │
//! │                     └──1:N──► Installment (credit schedule)            │
//! │                                                                         │
//! │  Sale ──(trashed)──► TrashItem (snapshot + deletion timestamp)         │
//! │                                                                         │
//! │  Expense ──(category: refund)◄── emitted when a paid sale is refunded  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization Convention
//! All types serialize with camelCase field names: the persisted documents
//! and the export/import format are consumed by a TypeScript frontend, and
//! `ts-rs` generates the matching bindings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

/// Generates a fresh entity id (UUID v4 as a string).
///
/// ## Why UUID v4?
/// Globally unique without coordination, so ids can be minted offline and
/// survive export/import without collisions.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Rates
// =============================================================================

/// A percentage rate stored in basis points (1 bps = 0.01%).
///
/// ## Why Basis Points?
/// Card fee rates like 2.5% become the integer 250, so fee math stays in
/// integer arithmetic end to end. 10000 bps = 100%.
///
/// ## Example
/// ```rust
/// use boutique_core::types::FeeRate;
///
/// let rate = FeeRate::from_percentage(2.5);
/// assert_eq!(rate.bps(), 250);
/// assert_eq!(FeeRate::from_bps(825).as_percentage(), 8.25);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct FeeRate(u32);

impl FeeRate {
    /// Creates a rate from basis points (250 = 2.5%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        FeeRate(bps)
    }

    /// Creates a rate from a percentage as entered in the UI (2.5 = 2.5%).
    ///
    /// Rounds to the nearest basis point; this is the single place a float
    /// touches money-adjacent math, and it is quantized immediately.
    pub fn from_percentage(pct: f64) -> Self {
        FeeRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display).
    pub fn as_percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate (no card fee).
    #[inline]
    pub const fn zero() -> Self {
        FeeRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Payment status of a sale or of a single installment.
///
/// ## Status Derivation
/// Status is a pure function of `paid_amount` vs `amount` (see
/// [`Installment::derived_status`]); `Canceled` is only ever set explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Canceled,
}

/// How a sale is paid: at once, or over an installment schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SaleKind {
    Cash,
    Credit,
}

/// Expense classification.
///
/// `Refund` expenses are emitted by the lifecycle manager when a paid sale
/// is refunded; `Fixed` expenses recur in the monthly statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ExpenseCategory {
    Fixed,
    Refund,
    Other,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// Stock and cost are owned exclusively by the inventory ledger; nothing
/// else mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Stock-keeping unit, stored uppercase, matched case-insensitively.
    pub sku: String,
    pub name: String,
    pub category: String,
    /// Weighted-average acquisition cost per unit, in cents.
    pub cost_price_cents: i64,
    /// Selling price per unit, in cents.
    pub price_cents: i64,
    /// Units on hand. Never driven below zero by sales.
    pub stock: i64,
    /// Reorder threshold for the low-stock warning.
    pub min_stock: i64,
}

impl Product {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item inside a sale's cart.
///
/// `product_id` is optional: free-form service lines (alterations, custom
/// orders) have no backing product and never touch stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub product_id: Option<String>,
    pub description: String,
    /// Unit selling price at the time of sale, in cents.
    pub price_cents: i64,
    /// Unit acquisition cost captured at the time of sale, in cents.
    pub cost_price_cents: i64,
    pub quantity: i64,
}

impl SaleItem {
    /// Selling value of the line (price × quantity).
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }

    /// Acquisition cost of the line (cost × quantity).
    pub fn line_cost(&self) -> Money {
        Money::from_cents(self.cost_price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Installment
// =============================================================================

/// One slice of a credit sale's payment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Installment {
    pub id: String,
    pub sale_id: String,
    /// Amount owed for this installment, in cents.
    pub amount_cents: i64,
    /// Amount received so far, in cents. Invariant: `0 ≤ paid ≤ amount`.
    pub paid_amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Stamped when the installment is settled in full.
    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,
    pub status: PaymentStatus,
}

impl Installment {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    /// Remaining debt, floored at zero.
    pub fn outstanding(&self) -> Money {
        (self.amount() - self.paid_amount()).clamp_non_negative()
    }

    /// True once the installment is paid in full.
    pub fn is_settled(&self) -> bool {
        self.paid_amount_cents >= self.amount_cents
    }

    /// The pure status function: `Paid` when settled, `Partial` when some
    /// money arrived, `Pending` otherwise. `Canceled` is never derived.
    pub fn derived_status(&self) -> PaymentStatus {
        if self.is_settled() {
            PaymentStatus::Paid
        } else if self.paid_amount_cents > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale with its cart, derived monetary fields and installment schedule.
///
/// ## Monetary Invariants
/// ```text
/// base_amount  = Σ item price × quantity
/// total_amount = max(0, base_amount − discount)
/// card_fee     = total_amount × fee_rate        (round half-up)
/// net_amount   = total_amount − card_fee
/// total_cost   = Σ item cost × quantity
/// Σ installment amounts = total_amount          (at creation time)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `WALK_IN_CUSTOMER_ID` for anonymous counter sales.
    pub customer_id: String,
    pub description: String,
    pub items: Vec<SaleItem>,
    pub base_amount_cents: i64,
    pub discount_cents: i64,
    pub total_amount_cents: i64,
    pub card_fee_rate: FeeRate,
    pub card_fee_cents: i64,
    pub net_amount_cents: i64,
    pub total_cost_cents: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub installments: Vec<Installment>,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub kind: SaleKind,
}

impl Sale {
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Total received across the whole schedule.
    pub fn total_paid(&self) -> Money {
        self.installments.iter().map(|i| i.paid_amount()).sum()
    }

    /// Remaining debt across the whole schedule, floored at zero.
    pub fn outstanding(&self) -> Money {
        self.installments.iter().map(|i| i.outstanding()).sum()
    }

    /// Derives the sale status from its installments: `Paid` when every
    /// installment is settled, `Partial` when any money arrived, `Pending`
    /// otherwise.
    pub fn derived_status(&self) -> PaymentStatus {
        if !self.installments.is_empty() && self.installments.iter().all(|i| i.is_settled()) {
            PaymentStatus::Paid
        } else if self.total_paid().is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }

    /// Recomputes every derived monetary field from the item list, keeping
    /// the monetary invariants in lockstep with cart contents.
    pub fn recompute_amounts(&mut self) {
        let base: Money = self.items.iter().map(|i| i.line_total()).sum();
        let total = (base - Money::from_cents(self.discount_cents)).clamp_non_negative();
        let fee = total.fee(self.card_fee_rate);

        self.base_amount_cents = base.cents();
        self.total_amount_cents = total.cents();
        self.card_fee_cents = fee.cents();
        self.net_amount_cents = (total - fee).cents();
        self.total_cost_cents = self
            .items
            .iter()
            .map(|i| i.line_cost())
            .sum::<Money>()
            .cents();
    }
}

// =============================================================================
// Expense
// =============================================================================

/// A business expense.
///
/// Legacy documents carry undated expenses; the monthly statement treats
/// those as recurring fixed costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
}

impl Expense {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer. Walk-in sales use the `WALK_IN_CUSTOMER_ID`
/// sentinel instead of a row here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Trash
// =============================================================================

/// A trashed sale: full snapshot plus the deletion timestamp that drives
/// the 30-day retention purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TrashItem {
    pub id: String,
    pub sale: Sale,
    #[ts(as = "String")]
    pub deleted_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn item(price: i64, cost: i64, qty: i64) -> SaleItem {
        SaleItem {
            id: new_id(),
            product_id: None,
            description: "Vestido".to_string(),
            price_cents: price,
            cost_price_cents: cost,
            quantity: qty,
        }
    }

    fn bare_sale(items: Vec<SaleItem>) -> Sale {
        Sale {
            id: new_id(),
            customer_id: crate::WALK_IN_CUSTOMER_ID.to_string(),
            description: String::new(),
            items,
            base_amount_cents: 0,
            discount_cents: 0,
            total_amount_cents: 0,
            card_fee_rate: FeeRate::zero(),
            card_fee_cents: 0,
            net_amount_cents: 0,
            total_cost_cents: 0,
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            installments: vec![],
            status: PaymentStatus::Pending,
            kind: SaleKind::Cash,
        }
    }

    #[test]
    fn test_fee_rate_conversions() {
        assert_eq!(FeeRate::from_percentage(2.5).bps(), 250);
        assert_eq!(FeeRate::from_bps(825).as_percentage(), 8.25);
        assert!(FeeRate::zero().is_zero());
    }

    #[test]
    fn test_installment_status_derivation() {
        let mut inst = Installment {
            id: new_id(),
            sale_id: "s1".to_string(),
            amount_cents: 5000,
            paid_amount_cents: 0,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 15).unwrap(),
            payment_date: None,
            status: PaymentStatus::Pending,
        };
        assert_eq!(inst.derived_status(), PaymentStatus::Pending);
        assert_eq!(inst.outstanding(), Money::from_cents(5000));

        inst.paid_amount_cents = 2000;
        assert_eq!(inst.derived_status(), PaymentStatus::Partial);
        assert_eq!(inst.outstanding(), Money::from_cents(3000));

        inst.paid_amount_cents = 5000;
        assert_eq!(inst.derived_status(), PaymentStatus::Paid);
        assert!(inst.is_settled());
        assert!(inst.outstanding().is_zero());
    }

    #[test]
    fn test_recompute_amounts_invariants() {
        let mut sale = bare_sale(vec![item(10000, 4000, 2), item(5000, 2000, 1)]);
        sale.discount_cents = 1000;
        sale.card_fee_rate = FeeRate::from_percentage(2.0);
        sale.recompute_amounts();

        assert_eq!(sale.base_amount_cents, 25000);
        assert_eq!(sale.total_amount_cents, 24000);
        assert_eq!(sale.card_fee_cents, 480); // 2% of 240.00
        assert_eq!(sale.net_amount_cents, 23520);
        assert_eq!(sale.total_cost_cents, 10000);
    }

    #[test]
    fn test_recompute_amounts_clamps_over_discount() {
        let mut sale = bare_sale(vec![item(1000, 500, 1)]);
        sale.discount_cents = 5000;
        sale.recompute_amounts();
        assert_eq!(sale.total_amount_cents, 0);
        assert_eq!(sale.net_amount_cents, 0);
    }

    #[test]
    fn test_serde_camel_case_and_type_rename() {
        let sale = bare_sale(vec![]);
        let json = serde_json::to_value(&sale).unwrap();
        assert!(json.get("customerId").is_some());
        assert!(json.get("baseAmountCents").is_some());
        assert_eq!(json.get("type").unwrap(), "cash");
        assert_eq!(json.get("status").unwrap(), "PENDING");
    }
}
