// checkout/src/failure.rs

use crate::api::StorefrontApi;
use crate::dto::PaymentStatusRequest;
use crate::pending::PendingOrderSlot;
use crate::return_params::ReturnParams;
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
  RetryCheckout,
  Home,
}

impl FailureAction {
  pub fn path(self) -> &'static str {
    match self {
      FailureAction::RetryCheckout => "/checkout",
      FailureAction::Home => "/",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
  /// `None` renders as "Not available".
  pub correlation_id: Option<String>,
  /// The storefront accepted the FAILED report.
  pub reported: bool,
  pub actions: [FailureAction; 2],
}

pub struct FailurePage {
  api: Arc<dyn StorefrontApi>,
  slot: PendingOrderSlot,
}

impl FailurePage {
  pub fn new(api: Arc<dyn StorefrontApi>, session: Arc<dyn SessionStore>) -> Self {
    Self {
      api,
      slot: PendingOrderSlot::new(session),
    }
  }

  /// Reports the payment as FAILED and drops whatever was staged for it.
  ///
  /// A failed report is logged and shown as not reported; the page still renders.
  #[instrument(name = "checkout::failure_page", skip(self, params))]
  pub async fn report(&self, params: &ReturnParams) -> FailureReport {
    let correlation_id = params
      .correlation_id()
      .map(str::to_string)
      .or_else(|| self.slot.current_transaction_id());

    let reported = match &correlation_id {
      Some(id) => match self.api.payment_status(&PaymentStatusRequest::report_failure(id)).await {
        Ok(response) => {
          info!("Failure page ({}): storefront recorded {:?}.", id, response.status);
          true
        }
        Err(e) => {
          warn!("Failure page ({}): could not report failure: {}.", id, e);
          false
        }
      },
      None => {
        warn!("Failure page: no correlation id in the URL or session.");
        false
      }
    };

    self.slot.clear();
    FailureReport {
      correlation_id,
      reported,
      actions: [FailureAction::RetryCheckout, FailureAction::Home],
    }
  }
}
