//! # boutique-db: Persistence Layer for the Boutique Back Office
//!
//! Local-first persistence: SQLite used as a namespaced key/value document
//! store, a debounced fire-and-forget saver, and the `Session` domain
//! service that ties the pure ledgers from `boutique-core` to storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     boutique-db (THIS CRATE)                            │
//! │                                                                         │
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────────┐  │
//! │  │  store    │   │   keys    │   │   saver   │   │     session      │  │
//! │  │ app_data  │   │ per-user  │   │ debounced │   │ ledgers + saver  │  │
//! │  │ kv table  │   │namespacing│   │  writes   │   │  orchestration   │  │
//! │  └───────────┘   └───────────┘   └───────────┘   └──────────────────┘  │
//! │                                                                         │
//! │  Mutations hit memory synchronously; disk catches up a second later.   │
//! │  A failed save flips the sync indicator, never the mutation.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let store = Store::open(StoreConfig::new("./boutique.db")).await?;
//! let mut session = Session::load(store, "user-1").await;
//!
//! let sale_id = session.create_sale(new_sale).await?;
//! // ... a debounced save is already on its way
//! session.flush().await?; // shutdown
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod keys;
pub mod saver;
pub mod session;
pub mod store;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use saver::{Saver, Snapshot, SyncStatus};
pub use session::Session;
pub use store::{Store, StoreConfig};
