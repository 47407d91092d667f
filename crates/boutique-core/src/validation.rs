//! # Validation Rules
//!
//! Precondition checks that run BEFORE any state mutation. A mutation either
//! passes validation and commits fully, or fails here and changes nothing.
//!
//! ## What Is (and Is Not) Validated
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rejected here (hard preconditions)    Handled softly elsewhere         │
//! │  ───────────────────────────────────   ───────────────────────────      │
//! │  • Empty cart                          • Unknown sale/product id        │
//! │  • Non-positive quantities               (silent no-op)                 │
//! │  • Negative prices / discounts         • Overpayment (excess ignored)   │
//! │  • Installment count outside 1..=24    • Oversell (stock floored at 0)  │
//! │  • Non-positive payment amounts                                         │
//! │  • Fee rate above 100%                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{FeeRate, SaleItem};
use crate::MAX_INSTALLMENTS;

/// Result type for validation functions.
pub type ValidationResult = Result<(), ValidationError>;

/// Validates a sale cart: non-empty, positive quantities, non-negative
/// unit prices and costs.
pub fn validate_cart(items: &[SaleItem]) -> ValidationResult {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        if item.price_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "price".to_string(),
            });
        }
        if item.cost_price_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "costPrice".to_string(),
            });
        }
    }
    Ok(())
}

/// Validates an installment count: `1..=MAX_INSTALLMENTS`.
pub fn validate_installment_count(count: u32) -> ValidationResult {
    if count < 1 || count as i64 > MAX_INSTALLMENTS as i64 {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max: MAX_INSTALLMENTS as i64,
        });
    }
    Ok(())
}

/// Validates a monetary field that may be zero but never negative
/// (discounts, totals).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a payment amount: strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a card fee rate: at most 100% (10000 bps).
pub fn validate_fee_rate(rate: FeeRate) -> ValidationResult {
    if rate.bps() > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "cardFeeRate".to_string(),
            min: 0,
            max: 10000,
        });
    }
    Ok(())
}

/// Validates a SKU: non-empty after trimming, at most 50 characters,
/// alphanumeric plus `-` and `_`.
pub fn validate_sku(sku: &str) -> ValidationResult {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    if trimmed.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "only letters, digits, '-' and '_' allowed".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
