// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `musicaa_flow::ContextData`.

use crate::models::{CartItem, CartLine, Order, PaymentGateway, PaymentMethod, Product, Transaction, TransactionStatus};
use crate::services::esewa::EsewaForm;
use crate::services::GatewayStatus;
use crate::state::AppState;
use crate::web::dto::{CreateOrderRequest, InitiatePaymentRequest, PaymentStatusRequest};
use uuid::Uuid;

#[derive(Clone)]
pub struct InitiatePaymentCtxData {
  pub app_state: AppState,
  pub request: InitiatePaymentRequest,
  pub gateway: Option<PaymentGateway>,
  /// Amount the client asked for, minor units.
  pub requested_amount_cents: i64,
  /// Amount sent to the gateway. Differs from the request only in the sandbox.
  pub charged_amount_cents: i64,
  pub form: Option<EsewaForm>,
  pub transaction: Option<Transaction>,
}

impl InitiatePaymentCtxData {
  pub fn new(app_state: AppState, request: InitiatePaymentRequest) -> Self {
    Self {
      app_state,
      request,
      gateway: None,
      requested_amount_cents: 0,
      charged_amount_cents: 0,
      form: None,
      transaction: None,
    }
  }
}

#[derive(Clone)]
pub struct PaymentStatusCtxData {
  pub app_state: AppState,
  pub request: PaymentStatusRequest,
  pub transaction: Option<Transaction>,
  pub gateway_status: Option<GatewayStatus>,
  pub outcome: Option<TransactionStatus>,
  pub message: String,
}

impl PaymentStatusCtxData {
  pub fn new(app_state: AppState, request: PaymentStatusRequest) -> Self {
    Self {
      app_state,
      request,
      transaction: None,
      gateway_status: None,
      outcome: None,
      message: String::new(),
    }
  }

  /// The client reported a failure or abandonment.
  pub fn reports_failure(&self) -> bool {
    self.request.status.as_deref() == Some(TransactionStatus::Failed.as_str())
  }

  pub fn stored_status(&self) -> Option<TransactionStatus> {
    self.transaction.as_ref().map(|t| t.status)
  }
}

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub request: CreateOrderRequest,
  pub payment_method: Option<PaymentMethod>,
  pub lines: Vec<CartLine>,
  pub total_amount_cents: i64,
  /// Amount charged on the referenced transaction, for paid orders.
  pub paid_amount_cents: Option<i64>,
  pub order: Option<Order>,
}

impl CreateOrderCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, request: CreateOrderRequest) -> Self {
    Self {
      app_state,
      user_id,
      request,
      payment_method: None,
      lines: Vec::new(),
      total_amount_cents: 0,
      paid_amount_cents: None,
      order: None,
    }
  }

  pub fn is_paid(&self) -> bool {
    self.request.is_paid == Some(true)
  }
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub authenticated_user_id: Uuid,
  pub product_id: Option<Uuid>,
  pub quantity: i32,
  pub product: Option<Product>,
  pub updated_cart_item: Option<CartItem>,
}
