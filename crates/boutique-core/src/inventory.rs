//! # Inventory Ledger
//!
//! The single owner of product stock and acquisition cost.
//!
//! ## Ownership Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Nothing outside this ledger mutates stock or cost.                     │
//! │                                                                         │
//! │  Sale created ───────► commit_sale    (decrement, floored at 0)        │
//! │  Sale trashed/refund ► reverse_sale   (increment, no upper clamp)      │
//! │  Sale restored ──────► commit_sale    (decrement again)                │
//! │  Goods received ─────► receive        (weighted-average cost merge)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Weighted-Average Cost
//! Receiving stock into an existing SKU re-averages the unit cost:
//! `newCost = (oldStock·oldCost + incoming·incomingCost) / newStock`,
//! rounded to the nearest cent. 10 units at R$5 plus 10 units at R$7
//! yields 20 units at R$6.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{new_id, Product, SaleItem};

// =============================================================================
// Stock Receipt
// =============================================================================

/// What the goods-received form submits: either a brand-new product or a
/// restock of an existing SKU (matched case-insensitively).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReceipt {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub cost_price_cents: i64,
    pub price_cents: i64,
    pub stock: i64,
    pub min_stock: i64,
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// In-memory product collection with stock/cost bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct InventoryLedger {
    products: Vec<Product>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the ledger from a loaded dataset.
    pub fn from_products(products: Vec<Product>) -> Self {
        InventoryLedger { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn into_products(self) -> Vec<Product> {
        self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Case-insensitive SKU lookup (SKUs are stored uppercase, but legacy
    /// documents may carry mixed case).
    pub fn find_by_sku(&self, sku: &str) -> Option<&Product> {
        let wanted = sku.trim();
        self.products
            .iter()
            .find(|p| p.sku.eq_ignore_ascii_case(wanted))
    }

    /// Full-replacement product update (edit form). Unknown id is a no-op.
    pub fn update(&mut self, product: Product) {
        if let Some(existing) = self.products.iter_mut().find(|p| p.id == product.id) {
            *existing = product;
        }
    }

    /// Removes a product. Sales referencing it keep their captured prices;
    /// their `product_id` simply stops resolving.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        self.products.len() != before
    }

    /// Registers received goods.
    ///
    /// Matching SKU (case-insensitive): stock is added, the unit cost is
    /// re-averaged over old and incoming units, and name/category/price/
    /// min-stock take the incoming values (last write wins). No match: a
    /// fresh product is created with the SKU normalized to uppercase.
    ///
    /// Returns the id of the affected product.
    pub fn receive(&mut self, receipt: StockReceipt) -> String {
        let sku = receipt.sku.trim().to_uppercase();

        if let Some(existing) = self
            .products
            .iter_mut()
            .find(|p| p.sku.eq_ignore_ascii_case(&sku))
        {
            let old_stock = existing.stock.max(0);
            let new_stock = old_stock + receipt.stock;

            existing.cost_price_cents = if new_stock <= 0 {
                // Nothing on hand to average over
                receipt.cost_price_cents
            } else {
                weighted_average_cost(
                    old_stock,
                    existing.cost_price_cents,
                    receipt.stock,
                    receipt.cost_price_cents,
                    new_stock,
                )
            };
            existing.stock = new_stock;
            existing.name = receipt.name;
            existing.category = receipt.category;
            existing.price_cents = receipt.price_cents;
            existing.min_stock = receipt.min_stock;
            existing.id.clone()
        } else {
            let product = Product {
                id: new_id(),
                sku,
                name: receipt.name,
                category: receipt.category,
                cost_price_cents: receipt.cost_price_cents,
                price_cents: receipt.price_cents,
                stock: receipt.stock,
                min_stock: receipt.min_stock,
            };
            let id = product.id.clone();
            self.products.push(product);
            id
        }
    }

    /// Decrements stock for every cart line backed by a product.
    ///
    /// Stock floors at zero: overselling records the sale but never drives
    /// inventory negative. Lines without a `product_id` are skipped.
    pub fn commit_sale(&mut self, items: &[SaleItem]) {
        for item in items {
            let Some(product_id) = &item.product_id else {
                continue;
            };
            if let Some(product) = self.products.iter_mut().find(|p| &p.id == product_id) {
                product.stock = (product.stock - item.quantity).max(0);
            }
        }
    }

    /// Mirror of [`commit_sale`](Self::commit_sale): returns sold units to
    /// stock when a sale is trashed or refunded. No upper clamp.
    pub fn reverse_sale(&mut self, items: &[SaleItem]) {
        for item in items {
            let Some(product_id) = &item.product_id else {
                continue;
            };
            if let Some(product) = self.products.iter_mut().find(|p| &p.id == product_id) {
                product.stock += item.quantity;
            }
        }
    }

    /// Total acquisition value of everything on hand.
    pub fn stock_cost_value(&self) -> Money {
        self.products
            .iter()
            .map(|p| p.cost_price().multiply_quantity(p.stock.max(0)))
            .sum()
    }

    /// Total selling value of everything on hand.
    pub fn stock_sale_value(&self) -> Money {
        self.products
            .iter()
            .map(|p| p.price().multiply_quantity(p.stock.max(0)))
            .sum()
    }
}

/// `(old·oldCost + inc·incCost) / newStock`, rounded half-up, in i128 to
/// keep large restocks away from overflow.
fn weighted_average_cost(
    old_stock: i64,
    old_cost: i64,
    inc_stock: i64,
    inc_cost: i64,
    new_stock: i64,
) -> i64 {
    let numerator = old_stock as i128 * old_cost as i128 + inc_stock as i128 * inc_cost as i128;
    let denominator = new_stock as i128;
    ((numerator + denominator / 2) / denominator) as i64
}

// =============================================================================
// Unit Tests
// =============================================================================
