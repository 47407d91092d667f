//! # Session
//!
//! The domain-service object the UI layer talks to. One `Session` per
//! signed-in user: it owns the in-memory ledgers, applies every mutation
//! synchronously, and queues a debounced save after each one.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Session::load(store, user)                                             │
//! │       │  safe-parse 5 datasets (corrupt/missing → empty, warn)          │
//! │       │  purge expired trash                                            │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │  Session                                                      │     │
//! │  │   customers   SaleLedger   InventoryLedger   expenses  Trash  │     │
//! │  └───────────────┬───────────────────────────────────────────────┘     │
//! │                  │ every mutation: memory first, then                   │
//! │                  ▼                                                      │
//! │            Saver::schedule(snapshot)  ──debounce──► SQLite             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads (due cards, statements, snapshots) never touch the store.

use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use boutique_core::error::{CoreResult, ValidationError};
use boutique_core::inventory::{InventoryLedger, StockReceipt};
use boutique_core::lifecycle::{self, RemovalReason, TrashBin};
use boutique_core::money::Money;
use boutique_core::payment::{self, DueCard};
use boutique_core::report::{monthly_statement, MonthlyStatement};
use boutique_core::sales::{NewSale, SaleLedger};
use boutique_core::types::{new_id, Customer, Expense, ExpenseCategory, Product, Sale, SaleItem};
use boutique_core::validation::validate_payment_amount;

use crate::error::StoreResult;
use crate::keys::{data_key, Dataset};
use crate::saver::{Saver, Snapshot, SyncStatus, DEFAULT_DEBOUNCE};
use crate::store::Store;

// =============================================================================
// Session
// =============================================================================

/// One user's live back-office state.
pub struct Session {
    user_id: String,
    store: Store,
    customers: Vec<Customer>,
    sales: SaleLedger,
    inventory: InventoryLedger,
    expenses: Vec<Expense>,
    trash: TrashBin,
    saver: Saver,
}

impl Session {
    /// Loads (or initializes) the session for `user_id`.
    ///
    /// Each dataset is parsed defensively: a missing or corrupt document
    /// becomes an empty collection with a warning, never a failed login.
    /// Expired trash is purged on the way in.
    pub async fn load(store: Store, user_id: impl Into<String>) -> Self {
        Self::load_with_debounce(store, user_id, DEFAULT_DEBOUNCE).await
    }

    /// Same as [`load`](Self::load) with a custom save debounce (tests use
    /// a short one).
    pub async fn load_with_debounce(
        store: Store,
        user_id: impl Into<String>,
        debounce: std::time::Duration,
    ) -> Self {
        let user_id = user_id.into();

        let customers: Vec<Customer> = load_dataset(&store, Dataset::Customers, &user_id).await;
        let sales: Vec<Sale> = load_dataset(&store, Dataset::Sales, &user_id).await;
        let expenses: Vec<Expense> = load_dataset(&store, Dataset::Expenses, &user_id).await;
        let products: Vec<Product> = load_dataset(&store, Dataset::Products, &user_id).await;
        let trash_items = load_dataset(&store, Dataset::Trash, &user_id).await;

        let mut trash = TrashBin::from_items(trash_items);
        let purged = trash.purge_expired(Utc::now());

        info!(
            %user_id,
            customers = customers.len(),
            sales = sales.len(),
            products = products.len(),
            purged_trash = purged,
            "Session loaded"
        );

        let mut session = Session {
            saver: Saver::with_debounce(store.clone(), user_id.clone(), debounce),
            user_id,
            store,
            customers,
            sales: SaleLedger::from_sales(sales),
            inventory: InventoryLedger::from_products(products),
            expenses,
            trash,
        };
        if purged > 0 {
            session.queue_save().await;
        }
        session
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn sales(&self) -> &[Sale] {
        self.sales.sales()
    }

    pub fn products(&self) -> &[Product] {
        self.inventory.products()
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn trash_items(&self) -> &[boutique_core::types::TrashItem] {
        self.trash.items()
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.saver.status().await
    }

    /// Consolidated receivables cards as of today.
    pub fn due_cards(&self) -> Vec<DueCard> {
        payment::due_cards(self.sales.sales(), &self.customers, today())
    }

    /// Financial statement for one calendar month.
    pub fn statement(&self, year: i32, month: u32) -> MonthlyStatement {
        monthly_statement(self.sales.sales(), &self.expenses, year, month)
    }

    /// Statement for the current month.
    pub fn current_statement(&self) -> MonthlyStatement {
        let now = today();
        self.statement(now.year(), now.month())
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Creates (or consolidates) a sale and commits its stock.
    pub async fn create_sale(&mut self, new: NewSale) -> CoreResult<String> {
        let items = new.items.clone();
        let sale_id = self.sales.create(new, today())?;
        // Stock moves only after the sale is accepted
        self.inventory.commit_sale(&items);
        debug!(%sale_id, "Sale recorded");
        self.queue_save().await;
        Ok(sale_id)
    }

    /// Full-replacement sale update; derived fields are recomputed by the
    /// ledger. Unknown id is a no-op.
    pub async fn replace_sale(&mut self, sale: Sale) {
        self.sales.replace(sale);
        self.queue_save().await;
    }

    /// Appends an item to an open sale and decrements its stock.
    pub async fn add_item_to_sale(&mut self, sale_id: &str, item: SaleItem) -> bool {
        let stock_line = item.clone();
        if !self.sales.add_item(sale_id, item, today()) {
            return false;
        }
        self.inventory.commit_sale(&[stock_line]);
        self.queue_save().await;
        true
    }

    /// Spreads a payment across the customer's installments due on
    /// `due_date`. Returns the amount actually allocated.
    pub async fn allocate_payment(
        &mut self,
        customer_id: &str,
        due_date: NaiveDate,
        amount: Money,
    ) -> CoreResult<Money> {
        let allocated = payment::allocate(&mut self.sales, customer_id, due_date, amount, today())?;
        info!(customer_id, %due_date, %allocated, "Payment allocated");
        self.queue_save().await;
        Ok(allocated)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Moves a sale to the trash. With `refund = true`, money already
    /// collected is booked as a refund expense.
    pub async fn trash_sale(&mut self, sale_id: &str, refund: bool) -> bool {
        let reason = if refund {
            RemovalReason::Refund
        } else {
            RemovalReason::Delete
        };
        let moved = lifecycle::trash_sale(
            &mut self.sales,
            &mut self.inventory,
            &mut self.trash,
            &mut self.expenses,
            &self.customers,
            sale_id,
            reason,
            Utc::now(),
        );
        if moved {
            info!(sale_id, refund, "Sale moved to trash");
            self.queue_save().await;
        }
        moved
    }

    /// Restores a trashed sale (stock is re-committed).
    pub async fn restore_sale(&mut self, trash_id: &str) -> bool {
        let restored =
            lifecycle::restore_sale(&mut self.sales, &mut self.inventory, &mut self.trash, trash_id);
        if restored {
            self.queue_save().await;
        }
        restored
    }

    /// Drops a trash item permanently. No stock movement.
    pub async fn delete_forever(&mut self, trash_id: &str) -> bool {
        let dropped = lifecycle::delete_forever(&mut self.trash, trash_id);
        if dropped {
            self.queue_save().await;
        }
        dropped
    }

    /// Books a refund not tied to a trashed sale.
    pub async fn record_manual_refund(
        &mut self,
        description: &str,
        amount: Money,
    ) -> CoreResult<String> {
        let id = lifecycle::record_manual_refund(&mut self.expenses, description, amount, today())?;
        self.queue_save().await;
        Ok(id)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn add_customer(
        &mut self,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> String {
        let customer = Customer {
            id: new_id(),
            name: name.into(),
            phone: phone.into(),
            cpf: None,
            email: None,
            address: None,
            created_at: Utc::now(),
        };
        let id = customer.id.clone();
        self.customers.push(customer);
        self.queue_save().await;
        id
    }

    /// Full-replacement customer update. Unknown id is a no-op.
    pub async fn update_customer(&mut self, customer: Customer) {
        if let Some(existing) = self.customers.iter_mut().find(|c| c.id == customer.id) {
            *existing = customer;
            self.queue_save().await;
        }
    }

    /// Removes a customer. Their sales survive and show up under the
    /// "deleted customer" label.
    pub async fn remove_customer(&mut self, id: &str) -> bool {
        let before = self.customers.len();
        self.customers.retain(|c| c.id != id);
        let removed = self.customers.len() != before;
        if removed {
            self.queue_save().await;
        }
        removed
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Registers received goods (new product or weighted-average restock).
    pub async fn receive_product(&mut self, receipt: StockReceipt) -> String {
        let id = self.inventory.receive(receipt);
        self.queue_save().await;
        id
    }

    /// Full-replacement product edit. Unknown id is a no-op.
    pub async fn update_product(&mut self, product: Product) {
        self.inventory.update(product);
        self.queue_save().await;
    }

    pub async fn remove_product(&mut self, id: &str) -> bool {
        let removed = self.inventory.remove(id);
        if removed {
            self.queue_save().await;
        }
        removed
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Books an expense. Description and a positive amount are required.
    pub async fn add_expense(
        &mut self,
        description: &str,
        amount: Money,
        category: ExpenseCategory,
        date: Option<NaiveDate>,
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
            description: trimmed.to_string(),
            amount_cents: amount.cents(),
            category,
            date,
        };
        let id = expense.id.clone();
        self.expenses.push(expense);
        self.queue_save().await;
        Ok(id)
    }

    pub async fn update_expense(&mut self, expense: Expense) {
        if let Some(existing) = self.expenses.iter_mut().find(|e| e.id == expense.id) {
            *existing = expense;
            self.queue_save().await;
        }
    }

    pub async fn remove_expense(&mut self, id: &str) -> bool {
        let before = self.expenses.len();
        self.expenses.retain(|e| e.id != id);
        let removed = self.expenses.len() != before;
        if removed {
            self.queue_save().await;
        }
        removed
    }

    // =========================================================================
    // Whole-Document Operations
    // =========================================================================

    /// Full snapshot of the user's data (the backup/export document).
    pub fn export(&self) -> Snapshot {
        Snapshot {
            customers: self.customers.clone(),
            sales: self.sales.sales().to_vec(),
            expenses: self.expenses.clone(),
            products: self.inventory.products().to_vec(),
            trash: self.trash.items().to_vec(),
        }
    }

    /// Wholesale replace from an exported snapshot and persist immediately.
    /// The document is trusted as-is (it came out of [`export`](Self::export)).
    pub async fn import(&mut self, snapshot: Snapshot) -> StoreResult<()> {
        info!(
            user_id = %self.user_id,
            sales = snapshot.sales.len(),
            "Importing snapshot"
        );
        self.customers = snapshot.customers.clone();
        self.sales = SaleLedger::from_sales(snapshot.sales.clone());
        self.expenses = snapshot.expenses.clone();
        self.inventory = InventoryLedger::from_products(snapshot.products.clone());
        self.trash = TrashBin::from_items(snapshot.trash.clone());
        self.saver.flush(snapshot).await
    }

    /// Erases everything: in-memory state and the user's stored documents.
    pub async fn clear_all(&mut self) -> StoreResult<()> {
        warn!(user_id = %self.user_id, "Clearing ALL data for user");
        self.customers.clear();
        self.sales = SaleLedger::new();
        self.inventory = InventoryLedger::new();
        self.expenses.clear();
        self.trash = TrashBin::new();

        for dataset in Dataset::ALL {
            self.store.remove(&data_key(dataset, &self.user_id)).await?;
        }
        Ok(())
    }

    /// Writes the current snapshot right now (shutdown path).
    pub async fn flush(&mut self) -> StoreResult<()> {
        let snapshot = self.export();
        self.saver.flush(snapshot).await
    }

    async fn queue_save(&mut self) {
        let snapshot = self.export();
        self.saver.schedule(snapshot).await;
    }
}

/// Local calendar date; business dates follow the shop's clock.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn load_dataset<T: DeserializeOwned>(
    store: &Store,
    dataset: Dataset,
    user_id: &str,
) -> Vec<T> {
    match store.load::<Vec<T>>(&data_key(dataset, user_id)).await {
        Ok(Some(values)) => values,
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(
                dataset = dataset.as_str(),
                user_id,
                error = %e,
                "Dataset unreadable, starting empty"
            );
            Vec::new()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use boutique_core::schedule::PaymentPlan;
    use boutique_core::types::FeeRate;
    use chrono::{Duration as ChronoDuration, Months};
    use std::time::Duration;

    async fn store() -> Store {
        Store::open(StoreConfig::in_memory()).await.unwrap()
    }

    async fn session(store: &Store) -> Session {
        Session::load_with_debounce(store.clone(), "u1", Duration::from_millis(5)).await
    }

    fn receipt(sku: &str, cost: i64, price: i64, stock: i64) -> StockReceipt {
        StockReceipt {
            sku: sku.to_string(),
            name: "Vestido".to_string(),
            category: "Roupas".to_string(),
            cost_price_cents: cost,
            price_cents: price,
            stock,
            min_stock: 1,
        }
    }

    fn cart_item(product_id: Option<&str>, price: i64, qty: i64) -> SaleItem {
        SaleItem {
            id: new_id(),
            product_id: product_id.map(str::to_string),
            description: "Vestido".to_string(),
            price_cents: price,
            cost_price_cents: price / 2,
            quantity: qty,
        }
    }

    fn credit_sale(customer: &str, item: SaleItem, count: u32) -> NewSale {
        NewSale {
            customer_id: customer.to_string(),
            items: vec![item],
            discount: Money::zero(),
            card_fee_rate: FeeRate::zero(),
            plan: PaymentPlan::Credit {
                installments: count,
                first_due: today(),
            },
        }
    }

    #[tokio::test]
    async fn test_state_survives_flush_and_reload() {
        let store = store().await;
        let mut session = session(&store).await;

        let customer_id = session.add_customer("Maria", "11 99999-0000").await;
        let product_id = session.receive_product(receipt("VES-1", 4000, 10000, 10)).await;
        let sale_id = session
            .create_sale(credit_sale(
                &customer_id,
                cart_item(Some(&product_id), 10000, 2),
                2,
            ))
            .await
            .unwrap();
        session.flush().await.unwrap();

        let reloaded = Session::load(store.clone(), "u1").await;
        assert_eq!(reloaded.customers().len(), 1);
        assert_eq!(reloaded.sales().len(), 1);
        assert_eq!(reloaded.sales()[0].id, sale_id);
        // Stock decrement persisted too
        assert_eq!(reloaded.products()[0].stock, 8);
    }

    #[tokio::test]
    async fn test_users_are_namespaced() {
        let store = store().await;
        let mut session = session(&store).await;
        session.add_customer("Maria", "x").await;
        session.flush().await.unwrap();

        let other = Session::load(store.clone(), "u2").await;
        assert!(other.customers().is_empty());
    }

    #[tokio::test]
    async fn test_allocate_payment_and_due_cards() {
        let store = store().await;
        let mut session = session(&store).await;

        let customer_id = session.add_customer("Ana", "x").await;
        session
            .create_sale(credit_sale(&customer_id, cart_item(None, 10000, 1), 2))
            .await
            .unwrap();

        let cards = session.due_cards();
        assert_eq!(cards.len(), 2);
        let due = cards[0].due_date;

        let allocated = session
            .allocate_payment(&customer_id, due, Money::from_cents(9000))
            .await
            .unwrap();
        assert_eq!(allocated, Money::from_cents(5000), "excess discarded");
        session.flush().await.unwrap();

        let reloaded = Session::load(store.clone(), "u1").await;
        assert_eq!(
            reloaded.sales()[0].total_paid(),
            Money::from_cents(5000)
        );
    }

    #[tokio::test]
    async fn test_refund_flow_through_session() {
        let store = store().await;
        let mut session = session(&store).await;

        let customer_id = session.add_customer("Bia", "x").await;
        let product_id = session.receive_product(receipt("SAI-1", 2000, 5000, 5)).await;
        let sale_id = session
            .create_sale(credit_sale(
                &customer_id,
                cart_item(Some(&product_id), 5000, 1),
                1,
            ))
            .await
            .unwrap();
        let due = session.sales()[0].installments[0].due_date;
        session
            .allocate_payment(&customer_id, due, Money::from_cents(5000))
            .await
            .unwrap();

        assert!(session.trash_sale(&sale_id, true).await);
        assert!(session.sales().is_empty());
        assert_eq!(session.trash_items().len(), 1);
        assert_eq!(session.products()[0].stock, 5, "stock restored");

        let refund = &session.expenses()[0];
        assert_eq!(refund.category, ExpenseCategory::Refund);
        assert_eq!(refund.amount_cents, 5000);
        assert_eq!(refund.description, "ESTORNO (DEVOLUÇÃO): Bia");

        // Restore brings the sale (and the stock decrement) back
        let trash_id = session.trash_items()[0].id.clone();
        assert!(session.restore_sale(&trash_id).await);
        assert_eq!(session.sales().len(), 1);
        assert_eq!(session.products()[0].stock, 4);
    }

    #[tokio::test]
    async fn test_corrupt_dataset_starts_empty() {
        let store = store().await;
        {
            let mut session = session(&store).await;
            session.add_customer("Maria", "x").await;
            session.flush().await.unwrap();
        }
        // Sabotage one dataset; the rest must still load
        store
            .save(&data_key(Dataset::Sales, "u1"), &"garbage")
            .await
            .unwrap();

        let reloaded = Session::load(store.clone(), "u1").await;
        assert!(reloaded.sales().is_empty());
        assert_eq!(reloaded.customers().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_trash_purged_at_load() {
        let store = store().await;
        let mut session = session(&store).await;

        let product_id = session.receive_product(receipt("OLD-1", 100, 200, 1)).await;
        let sale_id = session
            .create_sale(NewSale {
                customer_id: boutique_core::WALK_IN_CUSTOMER_ID.to_string(),
                items: vec![cart_item(Some(&product_id), 200, 1)],
                discount: Money::zero(),
                card_fee_rate: FeeRate::zero(),
                plan: PaymentPlan::Cash,
            })
            .await
            .unwrap();
        session.trash_sale(&sale_id, false).await;
        session.flush().await.unwrap();

        // Age the trash item past the retention window behind the
        // session's back, then reload
        let mut snapshot = session.export();
        snapshot.trash[0].deleted_at = Utc::now() - ChronoDuration::days(31);
        store
            .save(&data_key(Dataset::Trash, "u1"), &snapshot.trash)
            .await
            .unwrap();

        let reloaded = Session::load(store.clone(), "u1").await;
        assert!(reloaded.trash_items().is_empty());
    }

    #[tokio::test]
    async fn test_statement_through_session() {
        let store = store().await;
        let mut session = session(&store).await;

        session
            .create_sale(NewSale {
                customer_id: boutique_core::WALK_IN_CUSTOMER_ID.to_string(),
                items: vec![cart_item(None, 10000, 1)],
                discount: Money::zero(),
                card_fee_rate: FeeRate::zero(),
                plan: PaymentPlan::Cash,
            })
            .await
            .unwrap();
        session
            .add_expense("Aluguel", Money::from_cents(3000), ExpenseCategory::Fixed, Some(today()))
            .await
            .unwrap();

        let st = session.current_statement();
        assert_eq!(st.gross_revenue_cents, 10000);
        assert_eq!(st.fixed_expenses_cents, 3000);
        assert_eq!(st.cash_received_cents, 10000);
        // net 10000 − cost 5000 − fixed 3000
        assert_eq!(st.profit_cents, 2000);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let store = store().await;
        let mut session = session(&store).await;
        session.add_customer("Maria", "x").await;
        session.receive_product(receipt("EXP-1", 100, 200, 3)).await;

        let snapshot = session.export();

        let mut other =
            Session::load_with_debounce(store.clone(), "u2", Duration::from_millis(5)).await;
        other.import(snapshot).await.unwrap();
        assert_eq!(other.customers().len(), 1);
        assert_eq!(other.products().len(), 1);

        let reloaded = Session::load(store.clone(), "u2").await;
        assert_eq!(reloaded.customers().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_all_erases_memory_and_store() {
        let store = store().await;
        let mut session = session(&store).await;
        session.add_customer("Maria", "x").await;
        session.receive_product(receipt("CLR-1", 100, 200, 3)).await;
        session.flush().await.unwrap();

        session.clear_all().await.unwrap();
        assert!(session.customers().is_empty());
        assert!(session.products().is_empty());

        let reloaded = Session::load(store.clone(), "u1").await;
        assert!(reloaded.customers().is_empty());
        assert!(reloaded.products().is_empty());
    }

    #[tokio::test]
    async fn test_add_expense_validation() {
        let store = store().await;
        let mut session = session(&store).await;

        assert!(session
            .add_expense("", Money::from_cents(100), ExpenseCategory::Fixed, None)
            .await
            .is_err());
        assert!(session
            .add_expense("Luz", Money::zero(), ExpenseCategory::Fixed, None)
            .await
            .is_err());
        assert!(session.expenses().is_empty());
    }

    #[tokio::test]
    async fn test_consolidation_through_session_commits_both_carts() {
        let store = store().await;
        let mut session = session(&store).await;

        let customer_id = session.add_customer("Lia", "x").await;
        let product_id = session.receive_product(receipt("CON-1", 100, 1000, 10)).await;

        let first_due = today().checked_add_months(Months::new(1)).unwrap();
        let a = session
            .create_sale(NewSale {
                customer_id: customer_id.clone(),
                items: vec![cart_item(Some(&product_id), 1000, 2)],
                discount: Money::zero(),
                card_fee_rate: FeeRate::zero(),
                plan: PaymentPlan::Credit {
                    installments: 2,
                    first_due,
                },
            })
            .await
            .unwrap();
        let b = session
            .create_sale(NewSale {
                customer_id: customer_id.clone(),
                items: vec![cart_item(Some(&product_id), 1000, 3)],
                discount: Money::zero(),
                card_fee_rate: FeeRate::zero(),
                plan: PaymentPlan::Credit {
                    installments: 4,
                    first_due,
                },
            })
            .await
            .unwrap();

        assert_eq!(a, b, "same-month credit sales consolidate");
        assert_eq!(session.sales().len(), 1);
        // Both carts hit the stock
        assert_eq!(session.products()[0].stock, 5);
    }
}
