// checkout/src/dto.rs

//! Wire shapes of the storefront JSON API, as the browser sees them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
  pub shipping_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
  pub amount: f64,
  pub product_id: String,
  pub payment_gateway: String,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub product_name: String,
  pub shipping_details: ShippingDetails,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
  #[serde(default)]
  pub success: bool,
  pub payment_gateway: String,
  /// Hidden inputs for the hosted payment page, signature included.
  pub form_data: BTreeMap<String, String>,
  pub form_url: String,
  pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStatusRequest {
  pub product_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pidx: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
}

impl PaymentStatusRequest {
  pub fn confirm(product_id: &str, pidx: Option<String>) -> Self {
    Self {
      product_id: product_id.to_string(),
      pidx,
      status: None,
    }
  }

  pub fn report_failure(product_id: &str) -> Self {
    Self {
      product_id: product_id.to_string(),
      pidx: None,
      status: Some("FAILED".to_string()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentStatusResponse {
  #[serde(default)]
  pub message: String,
  pub status: RemoteStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub shipping_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub payment_method: String,
  pub total_amount: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_paid: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
  pub id: String,
  pub payment_method: String,
  pub payment_status: String,
  pub status: String,
  pub total_amount: f64,
  #[serde(default)]
  pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedOrder {
  #[serde(default)]
  pub message: String,
  pub order: OrderSummary,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: String,
  pub name: String,
  pub price: f64,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartSummary {
  pub items: Vec<CartLine>,
}

/// Orders above NPR 50 ship free, the rest pay a flat NPR 5.
const FREE_SHIPPING_THRESHOLD_CENTS: i64 = 5_000;
const FLAT_SHIPPING_CENTS: i64 = 500;

impl CartSummary {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Subtotal plus shipping in minor units, priced from the cart as shown.
  pub fn total_cents(&self) -> i64 {
    let subtotal: i64 = self
      .items
      .iter()
      .map(|line| (line.price * 100.0).round() as i64 * i64::from(line.quantity))
      .sum();
    let shipping = if subtotal > FREE_SHIPPING_THRESHOLD_CENTS { 0 } else { FLAT_SHIPPING_CENTS };
    subtotal + shipping
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
  #[serde(default)]
  pub error: Option<String>,
  #[serde(default)]
  pub detail: Option<String>,
}
