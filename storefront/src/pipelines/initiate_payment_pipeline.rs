// storefront/src/pipelines/initiate_payment_pipeline.rs

use crate::errors::AppError;
use crate::models::money::{cents_from_major, format_major, sandbox_amount, MAX_PAYMENT_CENTS};
use crate::models::{PaymentGateway, Transaction, TransactionStatus};
use crate::pipelines::contexts::InitiatePaymentCtxData;
use crate::services::esewa::EsewaForm;
use chrono::Utc;
use musicaa_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{info, warn};
use uuid::Uuid;

pub fn build_initiate_payment_pipeline() -> Pipeline<InitiatePaymentCtxData, AppError> {
  let mut p = Pipeline::<InitiatePaymentCtxData, AppError>::new(
    "initiate_payment",
    vec![
      StepDef::required("validate_payment_request"),
      StepDef::required("apply_sandbox_amount")
        .skip_when(|ctx: &InitiatePaymentCtxData| !ctx.app_state.config.esewa.is_sandbox()),
      StepDef::required("build_gateway_form"),
      StepDef::required("record_pending_transaction"),
    ],
  );

  p.on_step("validate_payment_request", |ctx_data: ContextData<InitiatePaymentCtxData>| async move {
    let request = ctx_data.read().request.clone();

    let gateway_raw = request.payment_gateway.trim();
    if gateway_raw.is_empty() {
      return Err(AppError::Validation("Payment gateway is required".to_string()));
    }
    let gateway: PaymentGateway = gateway_raw.parse().map_err(AppError::UnsupportedGateway)?;
    if !gateway.supports_initiation() {
      warn!("Initiate Payment: gateway '{}' is recognised but cannot be initiated.", gateway);
      return Err(AppError::UnsupportedGateway(gateway.to_string()));
    }

    let amount_cents = request
      .amount
      .and_then(cents_from_major)
      .filter(|cents| *cents > 0)
      .ok_or_else(|| AppError::Validation("Amount must be a positive number".to_string()))?;
    if amount_cents > MAX_PAYMENT_CENTS {
      return Err(AppError::Validation(format!(
        "Amount exceeds the maximum of {}",
        format_major(MAX_PAYMENT_CENTS)
      )));
    }

    if request.product_id.trim().is_empty() {
      return Err(AppError::Validation("productId is required".to_string()));
    }
    if request.product_name.trim().is_empty() {
      return Err(AppError::Validation("productName is required".to_string()));
    }

    {
      let mut guard = ctx_data.write();
      guard.gateway = Some(gateway);
      guard.requested_amount_cents = amount_cents;
      guard.charged_amount_cents = amount_cents;
    }
    info!(
      "Initiate Payment ({}): request validated. Gateway: {}, amount: {}",
      request.product_id,
      gateway,
      format_major(amount_cents)
    );
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("apply_sandbox_amount", |ctx_data: ContextData<InitiatePaymentCtxData>| async move {
    let mut guard = ctx_data.write();
    let original = guard.requested_amount_cents;
    let charged = sandbox_amount(original)
      .ok_or_else(|| AppError::Validation("Amount is out of range".to_string()))?;
    guard.charged_amount_cents = charged;
    if charged != original {
      info!(
        "Initiate Payment ({}): sandbox merchant, charging {} instead of {}.",
        guard.request.product_id,
        format_major(charged),
        format_major(original)
      );
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("build_gateway_form", |ctx_data: ContextData<InitiatePaymentCtxData>| async move {
    let (config, amount_cents, product_id) = {
      let guard = ctx_data.read();
      (
        guard.app_state.config.clone(),
        guard.charged_amount_cents,
        guard.request.product_id.trim().to_string(),
      )
    };
    let form = EsewaForm::build(&config.esewa, amount_cents, &product_id)?;
    ctx_data.write().form = Some(form);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("record_pending_transaction", |ctx_data: ContextData<InitiatePaymentCtxData>| async move {
    let (store, transaction) = {
      let guard = ctx_data.read();
      let now = Utc::now();
      let transaction = Transaction {
        id: Uuid::new_v4(),
        product_id: guard.request.product_id.trim().to_string(),
        product_name: guard.request.product_name.trim().to_string(),
        amount_cents: guard.charged_amount_cents,
        customer_name: guard.request.customer_name.clone(),
        customer_email: guard.request.customer_email.clone(),
        customer_phone: guard.request.customer_phone.clone(),
        gateway: guard.gateway.unwrap_or(PaymentGateway::Esewa),
        status: TransactionStatus::Pending,
        created_at: now,
        updated_at: now,
      };
      (guard.app_state.store.clone(), transaction)
    };

    store.insert_transaction(&transaction).await?;
    info!(
      "Initiate Payment ({}): PENDING transaction recorded for {}.",
      transaction.product_id,
      format_major(transaction.amount_cents)
    );
    ctx_data.write().transaction = Some(transaction);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p
}

pub fn register_initiate_payment_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register_pipeline(build_initiate_payment_pipeline());
  info!("Initiate Payment pipeline registered.");
}
