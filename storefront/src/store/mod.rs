// storefront/src/store/mod.rs

//! Persistence behind one trait so handlers and pipelines do not care whether
//! rows live in Postgres or in process memory.

use crate::errors::Result;
use crate::models::{CartItem, CartLine, NewOrder, Order, OrderStatus, Product, Transaction, TransactionStatus};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of a compare-and-set on a transaction's status.
#[derive(Debug, Clone)]
pub struct StatusChange {
  pub transaction: Transaction,
  /// `false` when the stored status was already terminal and was left alone.
  pub applied: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
  /// Fails with `AppError::Conflict` when the correlation id is already taken.
  async fn insert_transaction(&self, transaction: &Transaction) -> Result<()>;

  async fn find_transaction(&self, product_id: &str) -> Result<Option<Transaction>>;

  /// Moves a PENDING transaction to `next`. Terminal rows are returned unchanged.
  /// `None` when no transaction has this correlation id.
  async fn transition_transaction(&self, product_id: &str, next: TransactionStatus) -> Result<Option<StatusChange>>;

  async fn insert_product(&self, product: &Product) -> Result<()>;

  async fn list_products(&self) -> Result<Vec<Product>>;

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;

  /// Adds `quantity` to the user's line for this product, creating it when absent.
  /// The resulting quantity may not exceed stock.
  async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem>;

  async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>>;

  /// Places the order as one unit of work: rejects a second order for the same
  /// transaction id, re-checks and decrements stock, stores item snapshots and
  /// clears the user's cart.
  async fn place_order(&self, order: NewOrder) -> Result<Order>;

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

  async fn all_orders(&self) -> Result<Vec<Order>>;

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;

  async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>>;

  /// `false` when there was nothing to delete.
  async fn delete_order(&self, id: Uuid) -> Result<bool>;
}
