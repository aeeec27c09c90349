// storefront/src/pipelines/payment_status_pipeline.rs

use crate::errors::AppError;
use crate::models::money::format_major;
use crate::models::{PaymentGateway, TransactionStatus};
use crate::pipelines::contexts::PaymentStatusCtxData;
use crate::services::{GatewayStatus, StatusQuery};
use musicaa_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{error, info, warn};

fn skip_gateway_query(ctx: &PaymentStatusCtxData) -> bool {
  let terminal = ctx.stored_status().is_some_and(TransactionStatus::is_terminal);
  terminal && !ctx.app_state.config.esewa.reverify_terminal
}

pub fn build_payment_status_pipeline() -> Pipeline<PaymentStatusCtxData, AppError> {
  let mut p = Pipeline::<PaymentStatusCtxData, AppError>::new(
    "payment_status",
    vec![
      StepDef::required("load_transaction"),
      StepDef::required("record_reported_failure").skip_when(|ctx: &PaymentStatusCtxData| !ctx.reports_failure()),
      StepDef::required("query_gateway_status").skip_when(skip_gateway_query),
      StepDef::required("apply_confirmed_status"),
    ],
  );

  p.on_step("load_transaction", |ctx_data: ContextData<PaymentStatusCtxData>| async move {
    let (store, product_id) = {
      let guard = ctx_data.read();
      (guard.app_state.store.clone(), guard.request.product_id.trim().to_string())
    };
    if product_id.is_empty() {
      return Err(AppError::Validation("product_id is required".to_string()));
    }

    let transaction = store.find_transaction(&product_id).await?.ok_or_else(|| {
      warn!("Payment Status ({}): no transaction with this correlation id.", product_id);
      AppError::TransactionNotFound {
        product_id: product_id.clone(),
      }
    })?;
    info!(
      "Payment Status ({}): loaded transaction, stored status {}.",
      product_id, transaction.status
    );
    ctx_data.write().transaction = Some(transaction);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  // Client-reported failures never reach the gateway and can never mark success.
  p.on_step("record_reported_failure", |ctx_data: ContextData<PaymentStatusCtxData>| async move {
    let (store, product_id) = {
      let guard = ctx_data.read();
      (guard.app_state.store.clone(), guard.request.product_id.trim().to_string())
    };

    let change = store
      .transition_transaction(&product_id, TransactionStatus::Failed)
      .await?
      .ok_or_else(|| AppError::TransactionNotFound {
        product_id: product_id.clone(),
      })?;

    let status = change.transaction.status;
    let message = if change.applied {
      info!("Payment Status ({}): client reported failure, marked FAILED.", product_id);
      "Transaction status updated to FAILED".to_string()
    } else {
      warn!(
        "Payment Status ({}): client reported failure for a {} transaction, left unchanged.",
        product_id, status
      );
      format!("Transaction already {}", status)
    };

    let mut guard = ctx_data.write();
    guard.transaction = Some(change.transaction);
    guard.outcome = Some(status);
    guard.message = message;
    Ok::<_, AppError>(PipelineControl::Stop)
  });

  p.on_step("query_gateway_status", |ctx_data: ContextData<PaymentStatusCtxData>| async move {
    let (gateway_client, query, gateway) = {
      let guard = ctx_data.read();
      let transaction = guard
        .transaction
        .as_ref()
        .ok_or_else(|| AppError::Internal("Transaction must be loaded before the gateway query".to_string()))?;
      let query = StatusQuery {
        product_code: guard.app_state.config.esewa.merchant_id.clone(),
        total_amount: format_major(transaction.amount_cents),
        transaction_uuid: transaction.product_id.clone(),
      };
      (guard.app_state.gateway.clone(), query, transaction.gateway)
    };

    if gateway != PaymentGateway::Esewa {
      return Err(AppError::UnsupportedGateway(gateway.to_string()));
    }

    let gateway_status = gateway_client.check_status(&query).await.map_err(|e| {
      error!(
        "Payment Status ({}): gateway status check failed: {}",
        query.transaction_uuid, e
      );
      e
    })?;
    info!(
      "Payment Status ({}): gateway reports {:?}.",
      query.transaction_uuid, gateway_status
    );
    ctx_data.write().gateway_status = Some(gateway_status);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("apply_confirmed_status", |ctx_data: ContextData<PaymentStatusCtxData>| async move {
    let (store, transaction, gateway_status) = {
      let guard = ctx_data.read();
      let transaction = guard
        .transaction
        .clone()
        .ok_or_else(|| AppError::Internal("Transaction must be loaded before applying status".to_string()))?;
      (guard.app_state.store.clone(), transaction, guard.gateway_status.clone())
    };
    let product_id = transaction.product_id.clone();

    let reported = match &gateway_status {
      Some(GatewayStatus::Complete) => Some(TransactionStatus::Completed),
      Some(GatewayStatus::NotComplete(_)) => Some(TransactionStatus::Failed),
      None => None,
    };

    let (final_transaction, applied) = match reported {
      Some(next) if transaction.status.can_transition_to(next) => {
        let change = store
          .transition_transaction(&product_id, next)
          .await?
          .ok_or_else(|| AppError::TransactionNotFound {
            product_id: product_id.clone(),
          })?;
        (change.transaction, change.applied)
      }
      Some(next) => {
        if next != transaction.status {
          warn!(
            "Payment Status ({}): gateway now reports {} but stored status is terminal {}; keeping stored status.",
            product_id, next, transaction.status
          );
        }
        (transaction, false)
      }
      None => (transaction, false),
    };

    let status = final_transaction.status;
    let message = match (applied, status) {
      (true, TransactionStatus::Completed) => "Transaction status updated successfully".to_string(),
      (true, _) => format!("Transaction status updated to {}", status),
      (false, _) => format!("Transaction already {}", status),
    };
    info!("Payment Status ({}): resolved to {}.", product_id, status);

    let mut guard = ctx_data.write();
    guard.transaction = Some(final_transaction);
    guard.outcome = Some(status);
    guard.message = message;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p
}

pub fn register_payment_status_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register_pipeline(build_payment_status_pipeline());
  info!("Payment Status pipeline registered.");
}
