// storefront/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use musicaa_storefront::config::{AppConfig, EsewaConfig};
use musicaa_storefront::errors::{AppError, Result};
use musicaa_storefront::models::Product;
use musicaa_storefront::services::{GatewayClient, GatewayStatus, StatusQuery};
use musicaa_storefront::state::AppState;
use musicaa_storefront::store::{MemoryStore, Store};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

pub const SANDBOX_SECRET: &str = "8gBm/:&EnhH.1/q";

pub fn esewa_config(merchant_id: &str, reverify_terminal: bool) -> EsewaConfig {
  EsewaConfig {
    merchant_id: merchant_id.to_string(),
    secret: SANDBOX_SECRET.to_string(),
    payment_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".to_string(),
    status_check_url: "http://127.0.0.1:9/status".to_string(),
    success_url: "http://localhost:5173/payment-success".to_string(),
    failure_url: "http://localhost:5173/payment-failure".to_string(),
    reverify_terminal,
    timeout: Duration::from_secs(1),
  }
}

pub fn test_config(merchant_id: &str, reverify_terminal: bool) -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "memory://".to_string(),
    esewa: esewa_config(merchant_id, reverify_terminal),
    seed_db: false,
  }
}

/// Gateway double: answers every status check with whatever was last set.
pub struct StubGateway {
  answer: Mutex<std::result::Result<GatewayStatus, String>>,
  calls: AtomicUsize,
  queries: Mutex<Vec<StatusQuery>>,
}

impl StubGateway {
  pub fn new(status: GatewayStatus) -> Self {
    Self {
      answer: Mutex::new(Ok(status)),
      calls: AtomicUsize::new(0),
      queries: Mutex::new(Vec::new()),
    }
  }

  pub fn set_status(&self, status: GatewayStatus) {
    *self.answer.lock() = Ok(status);
  }

  pub fn set_unreachable(&self, reason: &str) {
    *self.answer.lock() = Err(reason.to_string());
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn last_query(&self) -> Option<StatusQuery> {
    self.queries.lock().last().cloned()
  }
}

#[async_trait]
impl GatewayClient for StubGateway {
  async fn check_status(&self, query: &StatusQuery) -> Result<GatewayStatus> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.queries.lock().push(query.clone());
    self.answer.lock().clone().map_err(AppError::Gateway)
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<StubGateway>,
}

pub fn build_app(merchant_id: &str, reverify_terminal: bool) -> TestApp {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let gateway = Arc::new(StubGateway::new(GatewayStatus::NotComplete("PENDING".to_string())));
  let state = AppState::new(
    Arc::new(test_config(merchant_id, reverify_terminal)),
    store.clone(),
    gateway.clone(),
  );
  TestApp { state, store, gateway }
}

pub fn sandbox_app() -> TestApp {
  build_app("EPAYTEST", true)
}

pub fn production_app() -> TestApp {
  build_app("NP-ES-MUSICAA", true)
}

pub async fn add_product(store: &dyn Store, name: &str, price_cents: i64, stock: i32) -> Product {
  let now = Utc::now();
  let product = Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    description: None,
    category: Some("guitars".to_string()),
    price_cents,
    stock,
    image_url: None,
    created_at: now,
    updated_at: now,
  };
  store.insert_product(&product).await.unwrap();
  product
}

/// A user with one guitar (1500.00) in the cart.
pub async fn user_with_cart(store: &dyn Store) -> (Uuid, Product) {
  let user_id = Uuid::new_v4();
  let product = add_product(store, "Yamaha F310", 150_000, 5).await;
  store.add_cart_item(user_id, product.id, 1).await.unwrap();
  (user_id, product)
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
