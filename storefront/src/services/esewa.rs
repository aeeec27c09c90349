// storefront/src/services/esewa.rs

//! eSewa ePay v2: hosted form fields and the transaction status-check call.

use crate::config::EsewaConfig;
use crate::errors::{AppError, Result};
use crate::models::money::format_major;
use crate::services::signature::{sign_fields, signed_field_names};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Form fields POSTed by the browser to the eSewa payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsewaForm {
  pub amount: String,
  pub failure_url: String,
  pub product_delivery_charge: String,
  pub product_service_charge: String,
  pub product_code: String,
  pub signed_field_names: String,
  pub success_url: String,
  pub tax_amount: String,
  pub total_amount: String,
  pub transaction_uuid: String,
  pub signature: String,
}

impl EsewaForm {
  /// Builds and signs the form for `amount_cents` under correlation id `transaction_uuid`.
  pub fn build(config: &EsewaConfig, amount_cents: i64, transaction_uuid: &str) -> Result<Self> {
    let total_amount = format_major(amount_cents);
    let signed = [
      ("total_amount", total_amount.as_str()),
      ("transaction_uuid", transaction_uuid),
      ("product_code", config.merchant_id.as_str()),
    ];
    let signature = sign_fields(&config.secret, &signed)?;
    Ok(Self {
      amount: total_amount.clone(),
      failure_url: config.failure_url.clone(),
      product_delivery_charge: "0".to_string(),
      product_service_charge: "0".to_string(),
      product_code: config.merchant_id.clone(),
      signed_field_names: signed_field_names(&signed),
      success_url: config.success_url.clone(),
      tax_amount: "0".to_string(),
      total_amount,
      transaction_uuid: transaction_uuid.to_string(),
      signature,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusQuery {
  pub product_code: String,
  pub total_amount: String,
  pub transaction_uuid: String,
}

/// What the gateway says about a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
  Complete,
  /// Any other gateway status (`PENDING`, `NOT_FOUND`, `CANCELED`, ...).
  NotComplete(String),
}

impl GatewayStatus {
  pub fn from_raw(status: &str) -> Self {
    if status == "COMPLETE" {
      GatewayStatus::Complete
    } else {
      GatewayStatus::NotComplete(status.to_string())
    }
  }
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
  /// `Err(AppError::Gateway)` when the gateway could not be asked; that is not a payment failure.
  async fn check_status(&self, query: &StatusQuery) -> Result<GatewayStatus>;
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
  status: String,
  #[serde(default)]
  ref_id: Option<String>,
}

pub struct EsewaClient {
  client: reqwest::Client,
  status_check_url: String,
}

impl EsewaClient {
  pub fn new(config: &EsewaConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent("musicaa-storefront/0.1")
      .timeout(config.timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Could not build gateway HTTP client: {}", e)))?;
    Ok(Self {
      client,
      status_check_url: config.status_check_url.clone(),
    })
  }
}

#[async_trait]
impl GatewayClient for EsewaClient {
  #[instrument(name = "esewa::check_status", skip(self), fields(transaction_uuid = %query.transaction_uuid))]
  async fn check_status(&self, query: &StatusQuery) -> Result<GatewayStatus> {
    let response = self
      .client
      .get(&self.status_check_url)
      .query(query)
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("eSewa status check failed: {}", e)))?;

    let http_status = response.status();
    if !http_status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(%http_status, body = %body, "eSewa status check returned an error response.");
      return Err(AppError::Gateway(format!("eSewa status check returned {}", http_status)));
    }

    let parsed: StatusResponse = response
      .json()
      .await
      .map_err(|e| AppError::Gateway(format!("Unreadable eSewa status response: {}", e)))?;
    info!(gateway_status = %parsed.status, ref_id = ?parsed.ref_id, "eSewa status received.");
    Ok(GatewayStatus::from_raw(&parsed.status))
  }
}
