// checkout/src/session.rs

//! Per-tab key/value storage that survives the gateway round trip.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Key holding the JSON-serialized [`crate::PendingOrder`].
pub const PENDING_ORDER_KEY: &str = "pendingOrder";
/// Key holding the correlation id of the checkout in flight.
pub const CURRENT_TRANSACTION_KEY: &str = "current_transaction_id";

pub trait SessionStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;

  fn set(&self, key: &str, value: String);

  fn remove(&self, key: &str) -> Option<String>;

  /// Removes and returns the value under `key` only when `accept` holds for it.
  /// Check and removal are one atomic step.
  fn take_if(&self, key: &str, accept: &dyn Fn(&str) -> bool) -> Option<String>;
}

/// Session storage for tests and headless use. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
  entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SessionStore for MemorySessionStore {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.lock().get(key).cloned()
  }

  fn set(&self, key: &str, value: String) {
    self.entries.lock().insert(key.to_string(), value);
  }

  fn remove(&self, key: &str) -> Option<String> {
    self.entries.lock().remove(key)
  }

  fn take_if(&self, key: &str, accept: &dyn Fn(&str) -> bool) -> Option<String> {
    let mut entries = self.entries.lock();
    if entries.get(key).is_some_and(|value| accept(value)) {
      entries.remove(key)
    } else {
      None
    }
  }
}
