// checkout/src/latch.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot guard around "create the paid order".
///
/// Clones share the flag. Acquiring sets it; a committed guard leaves it set
/// for good, a dropped one clears it so a later attempt may run.
#[derive(Debug, Clone, Default)]
pub struct OrderLatch {
  taken: Arc<AtomicBool>,
}

impl OrderLatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_taken(&self) -> bool {
    self.taken.load(Ordering::Acquire)
  }

  /// `None` when another attempt holds the latch or already committed it.
  pub fn try_acquire(&self) -> Option<LatchGuard> {
    self
      .taken
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| LatchGuard {
        taken: Arc::clone(&self.taken),
        committed: false,
      })
  }
}

#[must_use = "dropping the guard releases the latch"]
#[derive(Debug)]
pub struct LatchGuard {
  taken: Arc<AtomicBool>,
  committed: bool,
}

impl LatchGuard {
  /// Keeps the latch set permanently.
  pub fn commit(mut self) {
    self.committed = true;
  }
}

impl Drop for LatchGuard {
  fn drop(&mut self) {
    if !self.committed {
      self.taken.store(false, Ordering::Release);
    }
  }
}
