// storefront/src/web/dto.rs

//! Request and response bodies of the JSON API.

use crate::models::{CartLine, TransactionStatus};
use crate::services::esewa::EsewaForm;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
  pub amount: Option<f64>,
  #[serde(default)]
  pub product_id: String,
  #[serde(default)]
  pub payment_gateway: String,
  pub customer_name: Option<String>,
  pub customer_email: Option<String>,
  pub customer_phone: Option<String>,
  #[serde(default)]
  pub product_name: String,
  /// Echoed by the client for its own records; not persisted.
  pub shipping_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
  pub success: bool,
  pub payment_gateway: String,
  pub form_data: EsewaForm,
  pub form_url: String,
  pub transaction_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentStatusRequest {
  #[serde(default)]
  pub product_id: String,
  pub pidx: Option<String>,
  pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
  pub message: String,
  pub status: TransactionStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub shipping_address: Option<String>,
  pub city: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
  pub payment_method: Option<String>,
  pub total_amount: Option<f64>,
  pub is_paid: Option<bool>,
  pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
  pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
  pub product_id: Option<Uuid>,
  pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
  pub user_id: Uuid,
  pub items: Vec<CartLine>,
  #[serde(serialize_with = "crate::models::money::serialize_major")]
  pub subtotal: i64,
  #[serde(serialize_with = "crate::models::money::serialize_major")]
  pub shipping: i64,
  #[serde(serialize_with = "crate::models::money::serialize_major")]
  pub total: i64,
}
