// storefront/src/models/order.rs

use crate::models::{CartLine, OrderItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(OrderStatus::Pending),
      "processing" => Ok(OrderStatus::Processing),
      "shipped" => Ok(OrderStatus::Shipped),
      "delivered" => Ok(OrderStatus::Delivered),
      "cancelled" => Ok(OrderStatus::Cancelled),
      other => Err(other.to_string()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
  Paid,
  Unpaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
pub enum PaymentMethod {
  Cod,
  Esewa,
}

impl FromStr for PaymentMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "cod" => Ok(PaymentMethod::Cod),
      "esewa" => Ok(PaymentMethod::Esewa),
      other => Err(other.to_string()),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub shipping_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub payment_method: PaymentMethod,
  #[serde(rename = "totalAmount", serialize_with = "crate::models::money::serialize_major")]
  pub total_amount_cents: i64,
  pub payment_status: PaymentStatus,
  pub status: OrderStatus,
  pub transaction_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[sqlx(skip)]
  pub items: Vec<OrderItem>,
}

/// Everything the store needs to place an order in one unit of work.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub shipping_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub payment_method: PaymentMethod,
  pub total_amount_cents: i64,
  pub payment_status: PaymentStatus,
  pub transaction_id: Option<String>,
  pub lines: Vec<CartLine>,
}

impl NewOrder {
  /// Paid orders go straight to processing.
  pub fn initial_status(&self) -> OrderStatus {
    match self.payment_status {
      PaymentStatus::Paid => OrderStatus::Processing,
      PaymentStatus::Unpaid => OrderStatus::Pending,
    }
  }
}
