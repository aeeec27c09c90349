// checkout/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use musicaa_checkout::dto::{
  CartLine, CartSummary, CreateOrderRequest, InitiatePaymentRequest, InitiatePaymentResponse, OrderSummary,
  PaymentStatusRequest, PaymentStatusResponse, RemoteStatus,
};
use musicaa_checkout::{ApiError, ShippingForm, CheckoutMethod, StorefrontApi};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::Level;

/// What the fake gateway says when a payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayVerdict {
  Complete,
  NotComplete,
  Unreachable,
}

#[derive(Default)]
struct FakeState {
  cart: Vec<CartLine>,
  transactions: HashMap<String, RemoteStatus>,
  orders: Vec<(CreateOrderRequest, OrderSummary)>,
  initiated: Vec<InitiatePaymentRequest>,
  status_requests: Vec<PaymentStatusRequest>,
}

/// In-memory storefront that follows the server's payment rules closely
/// enough for client-side tests.
pub struct FakeStorefront {
  state: Mutex<FakeState>,
  verdict: Mutex<GatewayVerdict>,
  order_failure: Mutex<Option<ApiError>>,
  order_calls: AtomicUsize,
  /// Delay inside status and order calls so concurrent callers interleave.
  latency: Duration,
}

impl FakeStorefront {
  pub fn new() -> Self {
    Self::with_latency(Duration::ZERO)
  }

  pub fn with_latency(latency: Duration) -> Self {
    Self {
      state: Mutex::new(FakeState::default()),
      verdict: Mutex::new(GatewayVerdict::Complete),
      order_failure: Mutex::new(None),
      order_calls: AtomicUsize::new(0),
      latency,
    }
  }

  pub fn with_cart_line(self, name: &str, price: f64, quantity: i32) -> Self {
    self.state.lock().cart.push(CartLine {
      product_id: format!("prod-{}", name.to_lowercase().replace(' ', "-")),
      name: name.to_string(),
      price,
      quantity,
    });
    self
  }

  pub fn set_verdict(&self, verdict: GatewayVerdict) {
    *self.verdict.lock() = verdict;
  }

  pub fn fail_orders_with(&self, error: ApiError) {
    *self.order_failure.lock() = Some(error);
  }

  pub fn transaction_status(&self, id: &str) -> Option<RemoteStatus> {
    self.state.lock().transactions.get(id).copied()
  }

  pub fn orders(&self) -> Vec<OrderSummary> {
    self.state.lock().orders.iter().map(|(_, order)| order.clone()).collect()
  }

  pub fn order_requests(&self) -> Vec<CreateOrderRequest> {
    self.state.lock().orders.iter().map(|(request, _)| request.clone()).collect()
  }

  pub fn order_calls(&self) -> usize {
    self.order_calls.load(Ordering::SeqCst)
  }

  pub fn initiated(&self) -> Vec<InitiatePaymentRequest> {
    self.state.lock().initiated.clone()
  }

  pub fn status_requests(&self) -> Vec<PaymentStatusRequest> {
    self.state.lock().status_requests.clone()
  }

  async fn pause(&self) {
    if self.latency.is_zero() {
      tokio::task::yield_now().await;
    } else {
      tokio::time::sleep(self.latency).await;
    }
  }
}

fn rejected(status: u16, message: &str) -> ApiError {
  ApiError::Rejected {
    status,
    message: message.to_string(),
  }
}

#[async_trait]
impl StorefrontApi for FakeStorefront {
  async fn cart(&self) -> Result<CartSummary, ApiError> {
    Ok(CartSummary {
      items: self.state.lock().cart.clone(),
    })
  }

  async fn initiate_payment(&self, request: &InitiatePaymentRequest) -> Result<InitiatePaymentResponse, ApiError> {
    if request.payment_gateway != "esewa" {
      return Err(rejected(400, "Unsupported payment gateway"));
    }
    let mut state = self.state.lock();
    if state.transactions.contains_key(&request.product_id) {
      return Err(rejected(409, "Transaction already exists"));
    }
    state.transactions.insert(request.product_id.clone(), RemoteStatus::Pending);
    state.initiated.push(request.clone());
    Ok(InitiatePaymentResponse {
      success: true,
      payment_gateway: "esewa".to_string(),
      form_data: BTreeMap::from([
        ("total_amount".to_string(), format!("{:.2}", request.amount)),
        ("transaction_uuid".to_string(), request.product_id.clone()),
        ("product_code".to_string(), "EPAYTEST".to_string()),
        ("signature".to_string(), "c2lnbmF0dXJl".to_string()),
      ]),
      form_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".to_string(),
      transaction_id: request.product_id.clone(),
    })
  }

  async fn payment_status(&self, request: &PaymentStatusRequest) -> Result<PaymentStatusResponse, ApiError> {
    self.state.lock().status_requests.push(request.clone());
    self.pause().await;

    let mut state = self.state.lock();
    let Some(current) = state.transactions.get(&request.product_id).copied() else {
      return Err(rejected(404, "Transaction not found"));
    };
    let reported_failure = request.status.as_deref() == Some("FAILED");
    let next = if reported_failure {
      RemoteStatus::Failed
    } else {
      match *self.verdict.lock() {
        GatewayVerdict::Complete => RemoteStatus::Completed,
        GatewayVerdict::NotComplete => RemoteStatus::Failed,
        GatewayVerdict::Unreachable => return Err(ApiError::Unavailable("502 Bad Gateway".to_string())),
      }
    };
    let status = if current == RemoteStatus::Pending { next } else { current };
    state.transactions.insert(request.product_id.clone(), status);
    Ok(PaymentStatusResponse {
      message: String::new(),
      status,
    })
  }

  async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderSummary, ApiError> {
    self.order_calls.fetch_add(1, Ordering::SeqCst);
    self.pause().await;
    if let Some(error) = self.order_failure.lock().clone() {
      return Err(error);
    }

    let mut state = self.state.lock();
    let paid = request.is_paid == Some(true);
    if paid {
      let payment_id = request.payment_id.clone().unwrap_or_default();
      if state.transactions.get(&payment_id) != Some(&RemoteStatus::Completed) {
        return Err(rejected(400, "Payment is not completed"));
      }
      if state.orders.iter().any(|(_, o)| o.transaction_id.as_deref() == Some(payment_id.as_str())) {
        return Err(rejected(409, "An order already exists for this transaction"));
      }
    }
    let order = OrderSummary {
      id: format!("order-{}", state.orders.len() + 1),
      payment_method: request.payment_method.clone(),
      payment_status: if paid { "paid" } else { "unpaid" }.to_string(),
      status: if paid { "processing" } else { "pending" }.to_string(),
      total_amount: request.total_amount,
      transaction_id: request.payment_id.clone(),
    };
    state.cart.clear();
    state.orders.push((request.clone(), order.clone()));
    Ok(order)
  }
}

pub fn shipping_form(method: CheckoutMethod) -> ShippingForm {
  ShippingForm {
    shipping_address: "Thamel Marg 12".to_string(),
    city: "Kathmandu".to_string(),
    postal_code: "44600".to_string(),
    country: "Nepal".to_string(),
    payment_method: method,
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
