//! # Sale Lifecycle & Trash
//!
//! Sales are never hard-deleted in one step. They move through a trash bin
//! with a 30-day retention window, and a refund is just a trash move that
//! also books the returned money as an expense.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Sale ───trash/refund──► TrashItem                      │
//! │                   ▲                          │                          │
//! │                   │ restore                  ├── delete_forever         │
//! │                   │ (stock re-committed)     │     (no stock change)    │
//! │                   └──────────────────────────┤                          │
//! │                                              └── 30 days ──► purged     │
//! │                                                                         │
//! │  trash/refund: stock reversed, snapshot kept                            │
//! │  refund only:  Σ paid > 0 ──► Expense "ESTORNO (DEVOLUÇÃO): <nome>"    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The coordinator functions here borrow the ledgers; ownership of sales,
//! stock and expenses stays where it was.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::inventory::InventoryLedger;
use crate::money::Money;
use crate::sales::SaleLedger;
use crate::types::{new_id, Customer, Expense, ExpenseCategory, TrashItem};
use crate::validation::validate_payment_amount;
use crate::{TRASH_RETENTION_DAYS, WALK_IN_CUSTOMER_ID};

// =============================================================================
// Removal Reason
// =============================================================================

/// Why a sale is leaving the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalReason {
    /// Plain deletion (mistake, test sale). No financial side effects.
    Delete,
    /// Customer returned the goods. Money already collected is booked as a
    /// refund expense.
    Refund,
}

// =============================================================================
// Trash Bin
// =============================================================================

/// Holds trashed sale snapshots until restore, permanent deletion or the
/// retention purge.
#[derive(Debug, Clone, Default)]
pub struct TrashBin {
    items: Vec<TrashItem>,
}

impl TrashBin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the bin from a loaded dataset.
    pub fn from_items(items: Vec<TrashItem>) -> Self {
        TrashBin { items }
    }

    pub fn items(&self) -> &[TrashItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<TrashItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, trash_id: &str) -> Option<&TrashItem> {
        self.items.iter().find(|t| t.id == trash_id)
    }

    fn take(&mut self, trash_id: &str) -> Option<TrashItem> {
        let pos = self.items.iter().position(|t| t.id == trash_id)?;
        Some(self.items.remove(pos))
    }

    /// Drops every item older than the retention window. Runs at load
    /// time. Returns how many items were purged.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        let retention = Duration::days(TRASH_RETENTION_DAYS);
        self.items.retain(|t| now - t.deleted_at < retention);
        before - self.items.len()
    }
}

// =============================================================================
// Coordinators
// =============================================================================

/// Moves a sale into the trash: snapshot, reverse its stock, and with
/// `reason = Refund` book the collected money as a refund expense.
///
/// Unknown sale id is a silent no-op (returns `false`).
pub fn trash_sale(
    sales: &mut SaleLedger,
    inventory: &mut InventoryLedger,
    trash: &mut TrashBin,
    expenses: &mut Vec<Expense>,
    customers: &[Customer],
    sale_id: &str,
    reason: RemovalReason,
    now: DateTime<Utc>,
) -> bool {
    let Some(sale) = sales.take(sale_id) else {
        return false;
    };

    if reason == RemovalReason::Refund {
        let collected = sale.total_paid();
        if collected.is_positive() {
            expenses.push(Expense {
                id: new_id(),
                description: format!(
                    "ESTORNO (DEVOLUÇÃO): {}",
                    refund_customer_label(&sale.customer_id, customers)
                ),
                amount_cents: collected.cents(),
                category: ExpenseCategory::Refund,
                date: Some(now.date_naive()),
            });
        }
    }

    inventory.reverse_sale(&sale.items);
    trash.items.push(TrashItem {
        id: new_id(),
        sale,
        deleted_at: now,
    });
    true
}

/// Moves a trashed sale back into the ledger and re-commits its stock
/// (floored at zero, same as the original sale). Unknown trash id is a
/// no-op.
pub fn restore_sale(
    sales: &mut SaleLedger,
    inventory: &mut InventoryLedger,
    trash: &mut TrashBin,
    trash_id: &str,
) -> bool {
    let Some(item) = trash.take(trash_id) else {
        return false;
    };
    inventory.commit_sale(&item.sale.items);
    sales.insert(item.sale);
    true
}

/// Drops a trash item for good. Stock was already reversed when the sale
/// was trashed, so nothing else moves.
pub fn delete_forever(trash: &mut TrashBin, trash_id: &str) -> bool {
    trash.take(trash_id).is_some()
}

/// Books a free-form refund that is not tied to a trashed sale (customer
/// returned one item, goodwill credit, ...).
///
/// ## Errors
/// Rejects an empty description and a non-positive amount.
pub fn record_manual_refund(
    expenses: &mut Vec<Expense>,
    description: &str,
    amount: Money,
    today: NaiveDate,
) -> CoreResult<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        }
        .into());
    }
    validate_payment_amount(amount)?;

    let expense = Expense {
        id: new_id(),
        description: format!("ESTORNO MANUAL: {trimmed}"),
        amount_cents: amount.cents(),
        category: ExpenseCategory::Refund,
        date: Some(today),
    };
    let id = expense.id.clone();
    expenses.push(expense);
    Ok(id)
}

fn refund_customer_label(customer_id: &str, customers: &[Customer]) -> String {
    if customer_id == WALK_IN_CUSTOMER_ID {
        return "Cliente Balcão".to_string();
    }
    customers
        .iter()
        .find(|c| c.id == customer_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Desconhecido".to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
