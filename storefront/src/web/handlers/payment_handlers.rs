// storefront/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use musicaa_flow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{InitiatePaymentCtxData, PaymentStatusCtxData};
use crate::state::AppState;
use crate::web::dto::{InitiatePaymentRequest, InitiatePaymentResponse, PaymentStatusRequest, PaymentStatusResponse};

#[instrument(
    name = "handler::initiate_payment",
    skip(app_state, req_payload),
    fields(product_id = %req_payload.product_id, gateway = %req_payload.payment_gateway)
)]
pub async fn initiate_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(InitiatePaymentCtxData::new(
    app_state.get_ref().clone(),
    req_payload.into_inner(),
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx.read();
      let (form, transaction, gateway) = match (&guard.form, &guard.transaction, guard.gateway) {
        (Some(form), Some(transaction), Some(gateway)) => (form.clone(), transaction, gateway),
        _ => {
          return Err(AppError::Internal(
            "Payment initiation completed without a form or transaction".to_string(),
          ))
        }
      };
      info!("Payment initiated for {}.", transaction.product_id);
      Ok(HttpResponse::Ok().json(InitiatePaymentResponse {
        success: true,
        payment_gateway: gateway.to_string(),
        form_data: form,
        form_url: guard.app_state.config.esewa.payment_url.clone(),
        transaction_id: transaction.product_id.clone(),
      }))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Initiate payment pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(
    name = "handler::payment_status",
    skip(app_state, req_payload),
    fields(product_id = %req_payload.product_id, reported = ?req_payload.status)
)]
pub async fn payment_status_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(PaymentStatusCtxData::new(
    app_state.get_ref().clone(),
    req_payload.into_inner(),
  ));

  // A reported failure stops the pipeline after recording; both outcomes carry a status.
  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) | Ok(PipelineResult::Stopped) => {
      let guard = ctx.read();
      let status = guard
        .outcome
        .ok_or_else(|| AppError::Internal("Payment status pipeline produced no status".to_string()))?;
      Ok(HttpResponse::Ok().json(PaymentStatusResponse {
        message: guard.message.clone(),
        status,
      }))
    }
    Err(app_err) => Err(app_err),
  }
}
