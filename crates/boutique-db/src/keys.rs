//! # Dataset Keys
//!
//! Every user's data lives under its own key namespace in the document
//! store: `boutique.<dataset>.<user_id>`. Two users on the same machine
//! never see each other's documents.

/// The five persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Customers,
    Sales,
    Expenses,
    Products,
    Trash,
}

impl Dataset {
    /// All datasets, in save order.
    pub const ALL: [Dataset; 5] = [
        Dataset::Customers,
        Dataset::Sales,
        Dataset::Expenses,
        Dataset::Products,
        Dataset::Trash,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Dataset::Customers => "customers",
            Dataset::Sales => "sales",
            Dataset::Expenses => "expenses",
            Dataset::Products => "products",
            Dataset::Trash => "trash",
        }
    }
}

/// Store key for one user's copy of a dataset.
///
/// ## Example
/// ```rust
/// use boutique_db::keys::{data_key, Dataset};
///
/// assert_eq!(data_key(Dataset::Sales, "u-1"), "boutique.sales.u-1");
/// ```
pub fn data_key(dataset: Dataset, user_id: &str) -> String {
    format!("boutique.{}.{}", dataset.as_str(), user_id)
}
