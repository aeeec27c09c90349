// checkout/src/finalizer.rs

//! Return page after the gateway: confirm the payment, then turn the staged
//! order into a paid order at most once.

use crate::api::StorefrontApi;
use crate::dto::{CreateOrderRequest, OrderSummary, PaymentStatusRequest, RemoteStatus};
use crate::error::{ApiError, CheckoutError};
use crate::latch::{LatchGuard, OrderLatch};
use crate::pending::{PendingOrder, PendingOrderSlot};
use crate::return_params::ReturnParams;
use crate::session::SessionStore;
use musicaa_flow::{ContextData, Pipeline, PipelineControl, StepDef};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
  /// Payment confirmed and the paid order exists.
  Completed { order: OrderSummary },
  /// Payment confirmed but nothing was staged here (replay or direct navigation).
  NoStagedOrder { correlation_id: String },
  /// This page already created, or is creating, the order.
  AlreadyFinalized { correlation_id: String },
  /// The storefront reports the payment as not completed. Show the failure view.
  PaymentFailed { correlation_id: String },
  /// The status call itself failed. Payment state is unknown.
  VerificationError { reference: String },
  /// Payment completed but the order could not be created. Needs a human.
  ReconciliationRequired { correlation_id: String, reason: String },
  /// Nothing in the return URL identifies the payment.
  MissingCorrelationId,
}

impl FinalizeOutcome {
  /// Query string for the failure view, when the outcome routes there.
  pub fn failure_query(&self) -> Option<String> {
    match self {
      FinalizeOutcome::PaymentFailed { correlation_id } => Some(format!("?purchase_order_id={}", correlation_id)),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizerState {
  Idle,
  Verifying,
  FinalizingOrder,
  Done(FinalizeOutcome),
}

pub struct FinalizeCtxData {
  pub api: Arc<dyn StorefrontApi>,
  pub slot: PendingOrderSlot,
  pub latch: OrderLatch,
  pub progress: Arc<Mutex<FinalizerState>>,
  pub params: ReturnParams,
  pub correlation_id: Option<String>,
  pub staged: Option<PendingOrder>,
  pub latch_guard: Option<LatchGuard>,
  pub outcome: Option<FinalizeOutcome>,
}

impl FinalizeCtxData {
  fn finish(&mut self, outcome: FinalizeOutcome) -> PipelineControl {
    self.outcome = Some(outcome);
    PipelineControl::Stop
  }

  fn correlation_id(&self) -> Result<String, CheckoutError> {
    self
      .correlation_id
      .clone()
      .ok_or_else(|| CheckoutError::Internal("Correlation id must be resolved first".to_string()))
  }
}

pub fn build_finalize_pipeline() -> Pipeline<FinalizeCtxData, CheckoutError> {
  let mut p = Pipeline::<FinalizeCtxData, CheckoutError>::new(
    "finalize_order",
    vec![
      StepDef::required("resolve_correlation_id"),
      StepDef::required("confirm_payment"),
      StepDef::required("claim_staged_order"),
      StepDef::required("create_paid_order"),
    ],
  );

  p.on_step("resolve_correlation_id", |ctx_data: ContextData<FinalizeCtxData>| async move {
    let mut guard = ctx_data.write();
    match guard.params.correlation_id().map(str::to_string) {
      Some(id) => {
        guard.correlation_id = Some(id);
        Ok::<_, CheckoutError>(PipelineControl::Continue)
      }
      None => {
        warn!(payload = ?guard.params.payload, "Return URL carries no correlation id.");
        Ok(guard.finish(FinalizeOutcome::MissingCorrelationId))
      }
    }
  });

  p.on_step("confirm_payment", |ctx_data: ContextData<FinalizeCtxData>| async move {
    let (api, request, progress) = {
      let guard = ctx_data.read();
      let request = PaymentStatusRequest::confirm(&guard.correlation_id()?, guard.params.pidx.clone());
      (guard.api.clone(), request, guard.progress.clone())
    };
    *progress.lock() = FinalizerState::Verifying;
    let correlation_id = request.product_id.clone();

    let confirmed = api.payment_status(&request).await;
    let mut guard = ctx_data.write();
    match confirmed {
      Ok(response) if response.status == RemoteStatus::Completed => {
        info!("Finalize ({}): payment confirmed.", correlation_id);
        Ok::<_, CheckoutError>(PipelineControl::Continue)
      }
      Ok(response) => {
        info!("Finalize ({}): payment is {:?}, routing to failure view.", correlation_id, response.status);
        Ok(guard.finish(FinalizeOutcome::PaymentFailed { correlation_id }))
      }
      Err(ApiError::Rejected { status, message }) => {
        warn!("Finalize ({}): status check rejected ({}): {}.", correlation_id, status, message);
        Ok(guard.finish(FinalizeOutcome::PaymentFailed { correlation_id }))
      }
      Err(ApiError::Unavailable(reason)) => {
        error!("Finalize ({}): could not verify payment: {}.", correlation_id, reason);
        let reference = guard.params.support_reference();
        Ok(guard.finish(FinalizeOutcome::VerificationError { reference }))
      }
    }
  });

  // Latch first, then the stage; both are taken before any order request exists.
  p.on_step("claim_staged_order", |ctx_data: ContextData<FinalizeCtxData>| async move {
    let mut guard = ctx_data.write();
    let correlation_id = guard.correlation_id()?;

    let Some(latch_guard) = guard.latch.try_acquire() else {
      info!("Finalize ({}): order creation already ran on this page.", correlation_id);
      return Ok(guard.finish(FinalizeOutcome::AlreadyFinalized { correlation_id }));
    };
    let Some(staged) = guard.slot.claim(&correlation_id) else {
      info!("Finalize ({}): no pending order staged, nothing to create.", correlation_id);
      drop(latch_guard);
      return Ok(guard.finish(FinalizeOutcome::NoStagedOrder { correlation_id }));
    };

    guard.staged = Some(staged);
    guard.latch_guard = Some(latch_guard);
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p.on_step("create_paid_order", |ctx_data: ContextData<FinalizeCtxData>| async move {
    let (api, staged, latch_guard, progress) = {
      let mut guard = ctx_data.write();
      let staged = guard
        .staged
        .take()
        .ok_or_else(|| CheckoutError::Internal("Staged order must be claimed first".to_string()))?;
      (guard.api.clone(), staged, guard.latch_guard.take(), guard.progress.clone())
    };
    *progress.lock() = FinalizerState::FinalizingOrder;

    let request = CreateOrderRequest {
      shipping_address: staged.shipping_address,
      city: staged.city,
      postal_code: staged.postal_code,
      country: staged.country,
      payment_method: staged.payment_method,
      total_amount: staged.total_amount,
      is_paid: Some(true),
      payment_id: Some(staged.payment_id.clone()),
    };
    let created = api.create_order(&request).await;

    let mut guard = ctx_data.write();
    match created {
      Ok(order) => {
        if let Some(latch_guard) = latch_guard {
          latch_guard.commit();
        }
        info!("Finalize ({}): paid order {} created.", staged.payment_id, order.id);
        Ok::<_, CheckoutError>(guard.finish(FinalizeOutcome::Completed { order }))
      }
      Err(e) => {
        // The stage is gone; retrying here could create a second order.
        error!(
          correlation_id = %staged.payment_id,
          error = %e,
          "Payment completed but order creation failed. Manual reconciliation required."
        );
        drop(latch_guard);
        Ok(guard.finish(FinalizeOutcome::ReconciliationRequired {
          correlation_id: staged.payment_id,
          reason: e.to_string(),
        }))
      }
    }
  });

  p
}

/// One instance per rendered return page; invoking it again is harmless.
pub struct ReturnPageFinalizer {
  api: Arc<dyn StorefrontApi>,
  slot: PendingOrderSlot,
  latch: OrderLatch,
  progress: Arc<Mutex<FinalizerState>>,
  pipeline: Pipeline<FinalizeCtxData, CheckoutError>,
}

impl ReturnPageFinalizer {
  pub fn new(api: Arc<dyn StorefrontApi>, session: Arc<dyn SessionStore>) -> Self {
    Self {
      api,
      slot: PendingOrderSlot::new(session),
      latch: OrderLatch::new(),
      progress: Arc::new(Mutex::new(FinalizerState::Idle)),
      pipeline: build_finalize_pipeline(),
    }
  }

  pub fn state(&self) -> FinalizerState {
    self.progress.lock().clone()
  }

  pub fn latch(&self) -> &OrderLatch {
    &self.latch
  }

  #[instrument(name = "checkout::finalize", skip(self, params), fields(correlation_id = ?params.correlation_id()))]
  pub async fn finalize(&self, params: &ReturnParams) -> FinalizeOutcome {
    let ctx = ContextData::new(FinalizeCtxData {
      api: self.api.clone(),
      slot: self.slot.clone(),
      latch: self.latch.clone(),
      progress: self.progress.clone(),
      params: params.clone(),
      correlation_id: None,
      staged: None,
      latch_guard: None,
      outcome: None,
    });

    let outcome = match self.pipeline.run(ctx.clone()).await {
      Ok(_) => ctx.write().outcome.take(),
      Err(e) => {
        error!(error = %e, "Finalize pipeline failed.");
        None
      }
    };
    let outcome = outcome.unwrap_or_else(|| FinalizeOutcome::VerificationError {
      reference: params.support_reference(),
    });
    *self.progress.lock() = FinalizerState::Done(outcome.clone());
    outcome
  }
}
