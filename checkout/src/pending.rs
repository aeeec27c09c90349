// checkout/src/pending.rs

use crate::error::CheckoutError;
use crate::session::{SessionStore, CURRENT_TRANSACTION_KEY, PENDING_ORDER_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Order details staged before the gateway redirect, consumed on return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
  pub shipping_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub payment_method: String,
  pub total_amount: f64,
  /// Correlation id of the payment, the transaction's `product_id`.
  pub payment_id: String,
}

/// The single `pendingOrder` slot of a browser session.
///
/// One slot per session: two tabs checking out at once overwrite each other.
#[derive(Clone)]
pub struct PendingOrderSlot {
  session: Arc<dyn SessionStore>,
}

impl PendingOrderSlot {
  pub fn new(session: Arc<dyn SessionStore>) -> Self {
    Self { session }
  }

  /// Stages `order` and records its correlation id as the checkout in flight.
  pub fn stage(&self, order: &PendingOrder) -> Result<(), CheckoutError> {
    let json = serde_json::to_string(order)
      .map_err(|e| CheckoutError::Session(format!("Could not serialize pending order: {}", e)))?;
    self.session.set(PENDING_ORDER_KEY, json);
    self.session.set(CURRENT_TRANSACTION_KEY, order.payment_id.clone());
    info!(payment_id = %order.payment_id, "Pending order staged.");
    Ok(())
  }

  pub fn peek(&self) -> Option<PendingOrder> {
    let raw = self.session.get(PENDING_ORDER_KEY)?;
    serde_json::from_str(&raw).ok()
  }

  /// Takes the staged order for `correlation_id` out of the session.
  ///
  /// Removal happens before this returns, so a second caller finds nothing.
  /// A stage for another correlation id stays where it is. An unreadable stage
  /// is discarded.
  pub fn claim(&self, correlation_id: &str) -> Option<PendingOrder> {
    let raw = self.session.take_if(PENDING_ORDER_KEY, &|raw: &str| {
      match serde_json::from_str::<PendingOrder>(raw) {
        Ok(staged) => staged.payment_id == correlation_id,
        Err(_) => true,
      }
    })?;
    match serde_json::from_str(&raw) {
      Ok(order) => Some(order),
      Err(e) => {
        warn!(correlation_id, error = %e, "Discarded unreadable pending order.");
        None
      }
    }
  }

  pub fn current_transaction_id(&self) -> Option<String> {
    self.session.get(CURRENT_TRANSACTION_KEY).filter(|id| !id.trim().is_empty())
  }

  /// Drops the stage and the in-flight correlation id.
  pub fn clear(&self) {
    self.session.remove(PENDING_ORDER_KEY);
    self.session.remove(CURRENT_TRANSACTION_KEY);
  }
}
