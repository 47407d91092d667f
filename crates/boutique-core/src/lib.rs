//! # boutique-core: Pure Business Logic for the Boutique Back Office
//!
//! This crate is the **heart** of the back office. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Back-Office Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   Frontend (TypeScript)                         │   │
//! │  │   Sales UI ──► Agenda UI ──► Inventory UI ──► Dashboard UI      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Session methods                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ boutique-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────────┐  │   │
//! │  │  │  money   │ │ schedule │ │ inventory │ │ sales + payment  │  │   │
//! │  │  │  dates   │ │ install- │ │  stock &  │ │ consolidation &  │  │   │
//! │  │  │  types   │ │  ments   │ │   cost    │ │   allocation     │  │   │
//! │  │  └──────────┘ └──────────┘ └───────────┘ └──────────────────┘  │   │
//! │  │  ┌──────────────────────┐ ┌──────────────────────────────────┐ │   │
//! │  │  │ lifecycle (trash &   │ │ report (monthly statements)      │ │   │
//! │  │  │ refunds)             │ │                                  │ │   │
//! │  │  └──────────────────────┘ └──────────────────────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCKS • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              boutique-db (Persistence Layer)                    │   │
//! │  │        SQLite document store, debounced saver, Session          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Installment, Expense, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`dates`] - Calendar-month arithmetic with day clamping
//! - [`error`] - Domain error types
//! - [`validation`] - Precondition checks
//! - [`schedule`] - Installment scheduler
//! - [`inventory`] - Stock and weighted-average cost ledger
//! - [`sales`] - Sale ledger with same-month consolidation
//! - [`payment`] - Receivables cards and payment allocation
//! - [`lifecycle`] - Trash bin, restore, refunds, retention purge
//! - [`report`] - Monthly financial statements
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: callers pass `today`/`now`; nothing reads a clock
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64), never floats
//! 4. **Soft references**: a missing sale/product id is a silent no-op, an
//!    invalid input is a typed error, and neither half-applies a mutation
//!
//! ## Example Usage
//!
//! ```rust
//! use boutique_core::money::Money;
//! use boutique_core::schedule::{build_installments, PaymentPlan};
//! use chrono::NaiveDate;
//!
//! let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
//! let plan = PaymentPlan::Credit {
//!     installments: 3,
//!     first_due: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
//! };
//!
//! // R$ 100.00 in three: 33.33 / 33.33 / 33.34 - sums back exactly
//! let schedule = build_installments("sale-1", Money::from_cents(10000), &plan, today).unwrap();
//! let total: i64 = schedule.iter().map(|i| i.amount_cents).sum();
//! assert_eq!(total, 10000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dates;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod money;
pub mod payment;
pub mod report;
pub mod sales;
pub mod schedule;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use boutique_core::Money` instead of
// `use boutique_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{InventoryLedger, StockReceipt};
pub use lifecycle::{RemovalReason, TrashBin};
pub use money::Money;
pub use payment::DueCard;
pub use report::MonthlyStatement;
pub use sales::{NewSale, SaleLedger};
pub use schedule::PaymentPlan;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sentinel customer id for anonymous counter sales.
///
/// ## Why a sentinel?
/// Walk-in sales need no customer row, but every sale carries a customer
/// id. Sales under this id never consolidate and never appear as a named
/// receivable.
pub const WALK_IN_CUSTOMER_ID: &str = "BALCAO";

/// Maximum installment count for a credit sale.
///
/// ## Business Reason
/// Two years of monthly slices is the longest plan the boutique offers;
/// anything larger is a typo (240 instead of 24).
pub const MAX_INSTALLMENTS: u32 = 24;

/// Days a trashed sale survives before the retention purge drops it.
pub const TRASH_RETENTION_DAYS: i64 = 30;

/// Character cap for an auto-generated sale description.
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// Character cap for the rewritten description of a consolidated sale.
pub const MAX_CONSOLIDATED_DESCRIPTION_LEN: usize = 80;
