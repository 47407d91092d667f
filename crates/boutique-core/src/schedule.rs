//! # Installment Scheduler
//!
//! Turns a sale total and a payment plan into an installment schedule.
//!
//! ## The Two Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cash                                Credit (N installments)            │
//! │  ─────────────────────────────────   ─────────────────────────────────  │
//! │  one installment, due today,         base = total / N  (floor cents)    │
//! │  paid in full, status Paid           last = total − base × (N−1)        │
//! │                                      due_i = first_due + i months       │
//! │                                      all Pending, nothing paid          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remainder always lands on the LAST installment, so the schedule sums
//! back to the total exactly for any count. Due dates clamp to month ends
//! (Jan 31 → Feb 28 → Mar 31) instead of producing invalid dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::add_months_clamped;
use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{new_id, Installment, PaymentStatus, SaleKind};
use crate::validation::{validate_installment_count, validate_non_negative};

// =============================================================================
// Payment Plan
// =============================================================================

/// How the customer will pay for a new sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaymentPlan {
    /// Paid in full at the counter.
    Cash,
    /// Spread over `installments` monthly slices, the first due on
    /// `first_due`.
    #[serde(rename_all = "camelCase")]
    Credit {
        installments: u32,
        first_due: NaiveDate,
    },
}

impl PaymentPlan {
    /// The sale kind this plan produces.
    pub fn kind(&self) -> SaleKind {
        match self {
            PaymentPlan::Cash => SaleKind::Cash,
            PaymentPlan::Credit { .. } => SaleKind::Credit,
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Builds the installment schedule for a sale.
///
/// ## Guarantees
/// - The installment amounts sum to `total` exactly, for any count
/// - Due date `i` is `first_due + i` calendar months, day-of-month clamped
/// - Cash plans yield a single already-settled installment dated `today`
///
/// ## Errors
/// Rejects a negative total and a credit installment count outside `1..=24`.
///
/// ## Example
/// ```rust
/// use boutique_core::money::Money;
/// use boutique_core::schedule::{build_installments, PaymentPlan};
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
/// let plan = PaymentPlan::Credit {
///     installments: 3,
///     first_due: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
/// };
/// let schedule = build_installments("sale-1", Money::from_cents(10000), &plan, today).unwrap();
///
/// let amounts: Vec<i64> = schedule.iter().map(|i| i.amount_cents).collect();
/// assert_eq!(amounts, vec![3333, 3333, 3334]);
/// ```
pub fn build_installments(
    sale_id: &str,
    total: Money,
    plan: &PaymentPlan,
    today: NaiveDate,
) -> CoreResult<Vec<Installment>> {
    validate_non_negative("totalAmount", total)?;

    match plan {
        PaymentPlan::Cash => Ok(vec![Installment {
            id: new_id(),
            sale_id: sale_id.to_string(),
            amount_cents: total.cents(),
            paid_amount_cents: total.cents(),
            due_date: today,
            payment_date: Some(today),
            status: PaymentStatus::Paid,
        }]),
        PaymentPlan::Credit {
            installments: count,
            first_due,
        } => {
            validate_installment_count(*count)?;

            let base = total.split_even(*count);
            let last = total - base.multiply_quantity(*count as i64 - 1);

            let schedule = (0..*count)
                .map(|i| Installment {
                    id: new_id(),
                    sale_id: sale_id.to_string(),
                    amount_cents: if i == count - 1 {
                        last.cents()
                    } else {
                        base.cents()
                    },
                    paid_amount_cents: 0,
                    due_date: add_months_clamped(*first_due, i),
                    payment_date: None,
                    status: PaymentStatus::Pending,
                })
                .collect();
            Ok(schedule)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
