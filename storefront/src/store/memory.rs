// storefront/src/store/memory.rs

use super::{StatusChange, Store};
use crate::errors::{AppError, Result};
use crate::models::{CartItem, CartLine, NewOrder, Order, OrderItem, OrderStatus, Product, Transaction, TransactionStatus};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  transactions: HashMap<String, Transaction>,
  products: HashMap<Uuid, Product>,
  cart_items: Vec<CartItem>,
  orders: Vec<Order>,
}

/// In-process store selected by `DATABASE_URL=memory://`.
///
/// One mutex guards every table so `place_order` is atomic.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn order_count(&self) -> usize {
    self.tables.lock().orders.len()
  }
}

fn lines_for(tables: &Tables, user_id: Uuid) -> Vec<CartLine> {
  tables
    .cart_items
    .iter()
    .filter(|item| item.user_id == user_id)
    .filter_map(|item| {
      let product = tables.products.get(&item.product_id)?;
      Some(CartLine {
        cart_item_id: item.id,
        product_id: product.id,
        name: product.name.clone(),
        price_cents: product.price_cents,
        image_url: product.image_url.clone(),
        stock: product.stock,
        quantity: item.quantity,
      })
    })
    .collect()
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.transactions.contains_key(&transaction.product_id) {
      return Err(AppError::Conflict(format!(
        "Transaction {} already exists",
        transaction.product_id
      )));
    }
    tables
      .transactions
      .insert(transaction.product_id.clone(), transaction.clone());
    Ok(())
  }

  async fn find_transaction(&self, product_id: &str) -> Result<Option<Transaction>> {
    Ok(self.tables.lock().transactions.get(product_id).cloned())
  }

  async fn transition_transaction(&self, product_id: &str, next: TransactionStatus) -> Result<Option<StatusChange>> {
    let mut tables = self.tables.lock();
    let Some(transaction) = tables.transactions.get_mut(product_id) else {
      return Ok(None);
    };
    let applied = transaction.status.can_transition_to(next);
    if applied {
      transaction.status = next;
      transaction.updated_at = Utc::now();
    }
    Ok(Some(StatusChange {
      transaction: transaction.clone(),
      applied,
    }))
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    self.tables.lock().products.entry(product.id).or_insert_with(|| product.clone());
    Ok(())
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let mut products: Vec<Product> = self.tables.lock().products.values().cloned().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get(&id).cloned())
  }

  async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    let mut tables = self.tables.lock();
    let stock = tables
      .products
      .get(&product_id)
      .map(|p| p.stock)
      .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if let Some(item) = tables
      .cart_items
      .iter_mut()
      .find(|i| i.user_id == user_id && i.product_id == product_id)
    {
      let new_quantity = item.quantity.saturating_add(quantity);
      if new_quantity > stock {
        return Err(AppError::Validation("Insufficient stock".to_string()));
      }
      item.quantity = new_quantity;
      item.added_at = Utc::now();
      return Ok(item.clone());
    }

    if quantity > stock {
      return Err(AppError::Validation("Insufficient stock".to_string()));
    }
    let item = CartItem {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      quantity,
      added_at: Utc::now(),
    };
    tables.cart_items.push(item.clone());
    Ok(item)
  }

  async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
    Ok(lines_for(&self.tables.lock(), user_id))
  }

  async fn place_order(&self, new_order: NewOrder) -> Result<Order> {
    let mut tables = self.tables.lock();

    if let Some(txn_id) = &new_order.transaction_id {
      if tables
        .orders
        .iter()
        .any(|o| o.transaction_id.as_deref() == Some(txn_id.as_str()))
      {
        return Err(AppError::Conflict(format!("An order already exists for transaction {}", txn_id)));
      }
    }

    for line in &new_order.lines {
      let available = tables.products.get(&line.product_id).map(|p| p.stock);
      match available {
        None => return Err(AppError::Validation("Product not found".to_string())),
        Some(stock) if stock < line.quantity => {
          return Err(AppError::Validation(format!("Insufficient stock for {}", line.name)));
        }
        Some(_) => {}
      }
    }

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let items: Vec<OrderItem> = new_order
      .lines
      .iter()
      .map(|line| OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id: line.product_id,
        name: line.name.clone(),
        price_cents: line.price_cents,
        quantity: line.quantity,
        image_url: line.image_url.clone(),
      })
      .collect();

    for line in &new_order.lines {
      if let Some(product) = tables.products.get_mut(&line.product_id) {
        product.stock -= line.quantity;
        product.updated_at = now;
      }
    }
    tables.cart_items.retain(|item| item.user_id != new_order.user_id);

    let order = Order {
      id: order_id,
      user_id: new_order.user_id,
      status: new_order.initial_status(),
      shipping_address: new_order.shipping_address,
      city: new_order.city,
      postal_code: new_order.postal_code,
      country: new_order.country,
      payment_method: new_order.payment_method,
      total_amount_cents: new_order.total_amount_cents,
      payment_status: new_order.payment_status,
      transaction_id: new_order.transaction_id,
      created_at: now,
      updated_at: now,
      items,
    };
    tables.orders.push(order.clone());
    Ok(order)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    let mut orders: Vec<Order> = tables.orders.iter().filter(|o| o.user_id == user_id).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn all_orders(&self) -> Result<Vec<Order>> {
    let mut orders = self.tables.lock().orders.clone();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
    let mut tables = self.tables.lock();
    Ok(tables.orders.iter_mut().find(|o| o.id == id).map(|order| {
      order.status = status;
      order.updated_at = Utc::now();
      order.clone()
    }))
  }

  async fn delete_order(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let before = tables.orders.len();
    tables.orders.retain(|o| o.id != id);
    Ok(tables.orders.len() != before)
  }
}
