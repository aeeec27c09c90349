// storefront/src/store/postgres.rs

use super::{StatusChange, Store};
use crate::errors::{AppError, Result};
use crate::models::{CartItem, CartLine, NewOrder, Order, OrderItem, OrderStatus, Product, Transaction, TransactionStatus};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, instrument};
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = "id, product_id, product_name, amount_cents, customer_name, customer_email, \
   customer_phone, gateway, status, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, category, price_cents, stock, image_url, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, shipping_address, city, postal_code, country, payment_method, \
   total_amount_cents, payment_status, status, transaction_id, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, name, price_cents, quantity, image_url";

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPool::connect(database_url).await?;
    MIGRATOR.run(&pool).await?;
    tracing::info!("Database connected and migrations applied.");
    Ok(Self::new(pool))
  }

  async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>> {
    if orders.is_empty() {
      return Ok(orders);
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> = sqlx::query_as(&format!(
      "SELECT {} FROM order_items WHERE order_id = ANY($1)",
      ORDER_ITEM_COLUMNS
    ))
    .bind(&ids)
    .fetch_all(&self.pool)
    .await?;
    for order in &mut orders {
      order.items = items.iter().filter(|i| i.order_id == order.id).cloned().collect();
    }
    Ok(orders)
  }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  err
    .as_database_error()
    .map(|db_err| db_err.is_unique_violation())
    .unwrap_or(false)
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "store::insert_transaction", skip_all, fields(product_id = %transaction.product_id))]
  async fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
    let result = sqlx::query(
      "INSERT INTO transactions (id, product_id, product_name, amount_cents, customer_name, customer_email, \
       customer_phone, gateway, status, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(transaction.id)
    .bind(&transaction.product_id)
    .bind(&transaction.product_name)
    .bind(transaction.amount_cents)
    .bind(&transaction.customer_name)
    .bind(&transaction.customer_email)
    .bind(&transaction.customer_phone)
    .bind(transaction.gateway)
    .bind(transaction.status)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
        "Transaction {} already exists",
        transaction.product_id
      ))),
      Err(e) => Err(AppError::Sqlx(e)),
    }
  }

  async fn find_transaction(&self, product_id: &str) -> Result<Option<Transaction>> {
    let row = sqlx::query_as(&format!(
      "SELECT {} FROM transactions WHERE product_id = $1",
      TRANSACTION_COLUMNS
    ))
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(name = "store::transition_transaction", skip(self))]
  async fn transition_transaction(&self, product_id: &str, next: TransactionStatus) -> Result<Option<StatusChange>> {
    // Conditional update keeps terminal rows untouched under concurrent confirmations.
    let updated: Option<Transaction> = sqlx::query_as(&format!(
      "UPDATE transactions SET status = $2, updated_at = NOW() \
       WHERE product_id = $1 AND status = 'PENDING' RETURNING {}",
      TRANSACTION_COLUMNS
    ))
    .bind(product_id)
    .bind(next)
    .fetch_optional(&self.pool)
    .await?;

    if let Some(transaction) = updated {
      return Ok(Some(StatusChange {
        transaction,
        applied: true,
      }));
    }
    Ok(self.find_transaction(product_id).await?.map(|transaction| StatusChange {
      transaction,
      applied: false,
    }))
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    sqlx::query(
      "INSERT INTO products (id, name, description, category, price_cents, stock, image_url, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (id) DO NOTHING",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(&product.image_url)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    let products = sqlx::query_as(&format!("SELECT {} FROM products ORDER BY name ASC", PRODUCT_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  #[instrument(name = "store::add_cart_item", skip(self))]
  async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    let mut tx = self.pool.begin().await?;

    let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
      .bind(product_id)
      .fetch_optional(&mut *tx)
      .await?;
    let stock = stock.ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let item: CartItem = sqlx::query_as(
      "INSERT INTO cart_items (id, user_id, product_id, quantity, added_at) \
       VALUES ($1, $2, $3, $4, NOW()) \
       ON CONFLICT (user_id, product_id) DO UPDATE \
       SET quantity = cart_items.quantity + EXCLUDED.quantity, added_at = NOW() \
       RETURNING id, user_id, product_id, quantity, added_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await?;

    if item.quantity > stock {
      tx.rollback().await?;
      return Err(AppError::Validation("Insufficient stock".to_string()));
    }
    tx.commit().await?;
    Ok(item)
  }

  async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
    let lines = sqlx::query_as(
      "SELECT c.id AS cart_item_id, p.id AS product_id, p.name, p.price_cents, p.image_url, p.stock, c.quantity \
       FROM cart_items c JOIN products p ON p.id = c.product_id \
       WHERE c.user_id = $1 ORDER BY c.added_at ASC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(lines)
  }

  #[instrument(name = "store::place_order", skip_all, fields(user_id = %new_order.user_id, transaction_id = ?new_order.transaction_id))]
  async fn place_order(&self, new_order: NewOrder) -> Result<Order> {
    let mut tx = self.pool.begin().await?;
    let order_id = Uuid::new_v4();

    let inserted: std::result::Result<Order, sqlx::Error> = sqlx::query_as(&format!(
      "INSERT INTO orders (id, user_id, shipping_address, city, postal_code, country, payment_method, \
       total_amount_cents, payment_status, status, transaction_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(new_order.user_id)
    .bind(&new_order.shipping_address)
    .bind(&new_order.city)
    .bind(&new_order.postal_code)
    .bind(&new_order.country)
    .bind(new_order.payment_method)
    .bind(new_order.total_amount_cents)
    .bind(new_order.payment_status)
    .bind(new_order.initial_status())
    .bind(&new_order.transaction_id)
    .fetch_one(&mut *tx)
    .await;

    let mut order = match inserted {
      Ok(order) => order,
      Err(e) if is_unique_violation(&e) => {
        return Err(AppError::Conflict(format!(
          "An order already exists for transaction {}",
          new_order.transaction_id.as_deref().unwrap_or_default()
        )));
      }
      Err(e) => return Err(AppError::Sqlx(e)),
    };

    for line in &new_order.lines {
      let decremented = sqlx::query("UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2 AND stock >= $1")
        .bind(line.quantity)
        .bind(line.product_id)
        .execute(&mut *tx)
        .await?;
      if decremented.rows_affected() != 1 {
        error!(product_id = %line.product_id, "Stock changed while the order was being placed.");
        return Err(AppError::Validation(format!("Insufficient stock for {}", line.name)));
      }

      let item: OrderItem = sqlx::query_as(&format!(
        "INSERT INTO order_items (id, order_id, product_id, name, price_cents, quantity, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
        ORDER_ITEM_COLUMNS
      ))
      .bind(Uuid::new_v4())
      .bind(order_id)
      .bind(line.product_id)
      .bind(&line.name)
      .bind(line.price_cents)
      .bind(line.quantity)
      .bind(&line.image_url)
      .fetch_one(&mut *tx)
      .await?;
      order.items.push(item);
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(new_order.user_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(order)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    self.attach_items(orders).await
  }

  async fn all_orders(&self) -> Result<Vec<Order>> {
    let orders = sqlx::query_as(&format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    self.attach_items(orders).await
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
    let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match order {
      Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
    let updated: Option<Order> = sqlx::query_as(&format!(
      "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(&self.pool)
    .await?;
    match updated {
      Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn delete_order(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}
