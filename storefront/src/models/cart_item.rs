// storefront/src/models/cart_item.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub added_at: DateTime<Utc>,
}

/// A cart row joined with the product fields an order snapshot needs.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub cart_item_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  #[serde(rename = "price", serialize_with = "crate::models::money::serialize_major")]
  pub price_cents: i64,
  pub image_url: Option<String>,
  pub stock: i32,
  pub quantity: i32,
}

impl CartLine {
  pub fn line_total_cents(&self) -> i64 {
    self.price_cents * i64::from(self.quantity)
  }
}

pub fn subtotal_cents(lines: &[CartLine]) -> i64 {
  lines.iter().map(CartLine::line_total_cents).sum()
}
