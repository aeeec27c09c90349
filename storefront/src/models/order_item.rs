// storefront/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Product snapshot taken when the order was placed.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  #[serde(rename = "price", serialize_with = "crate::models::money::serialize_major")]
  pub price_cents: i64,
  pub quantity: i32,
  pub image_url: Option<String>,
}
