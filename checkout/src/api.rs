// checkout/src/api.rs

use crate::dto::{
  CartSummary, CreateOrderRequest, CreatedOrder, ErrorBody, InitiatePaymentRequest, InitiatePaymentResponse, OrderSummary,
  PaymentStatusRequest, PaymentStatusResponse,
};
use crate::error::ApiError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{instrument, warn};

/// The storefront endpoints the checkout pages call.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
  async fn cart(&self) -> Result<CartSummary, ApiError>;

  async fn initiate_payment(&self, request: &InitiatePaymentRequest) -> Result<InitiatePaymentResponse, ApiError>;

  async fn payment_status(&self, request: &PaymentStatusRequest) -> Result<PaymentStatusResponse, ApiError>;

  async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderSummary, ApiError>;
}

pub struct HttpStorefrontApi {
  client: reqwest::Client,
  base_url: String,
  user_id: Option<String>,
}

impl HttpStorefrontApi {
  /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
  /// `user_id` is forwarded as `X-User-ID` on cart and order calls.
  pub fn new(base_url: impl Into<String>, user_id: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .user_agent("musicaa-checkout/0.1")
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::Unavailable(format!("Could not build HTTP client: {}", e)))?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      user_id,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.user_id {
      Some(user_id) => builder.header("X-User-ID", user_id),
      None => builder,
    }
  }

  async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    let status = response.status();
    if status.is_client_error() {
      let body: ErrorBody = response.json().await.unwrap_or_default();
      let message = body
        .error
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request rejected").to_string());
      warn!(%status, %message, detail = ?body.detail, "Storefront rejected the request.");
      return Err(ApiError::Rejected {
        status: status.as_u16(),
        message,
      });
    }
    if !status.is_success() {
      warn!(%status, "Storefront answered with a server error.");
      return Err(ApiError::Unavailable(format!("Storefront returned {}", status)));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| ApiError::Unavailable(format!("Unreadable storefront response: {}", e)))
  }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
  #[instrument(name = "api::cart", skip(self))]
  async fn cart(&self) -> Result<CartSummary, ApiError> {
    self.send(self.authed(self.client.get(self.url("/cart")))).await
  }

  #[instrument(name = "api::initiate_payment", skip(self, request), fields(product_id = %request.product_id))]
  async fn initiate_payment(&self, request: &InitiatePaymentRequest) -> Result<InitiatePaymentResponse, ApiError> {
    self
      .send(self.client.post(self.url("/payment/initiate-payment")).json(request))
      .await
  }

  #[instrument(name = "api::payment_status", skip(self, request), fields(product_id = %request.product_id, reported = ?request.status))]
  async fn payment_status(&self, request: &PaymentStatusRequest) -> Result<PaymentStatusResponse, ApiError> {
    self
      .send(self.client.post(self.url("/payment/payment-status")).json(request))
      .await
  }

  #[instrument(name = "api::create_order", skip(self, request), fields(payment_id = ?request.payment_id))]
  async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderSummary, ApiError> {
    let created: CreatedOrder = self
      .send(self.authed(self.client.post(self.url("/orders")).json(request)))
      .await?;
    Ok(created.order)
  }
}
