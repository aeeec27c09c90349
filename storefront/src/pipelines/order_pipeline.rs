// storefront/src/pipelines/order_pipeline.rs

use crate::errors::AppError;
use crate::models::cart_item::subtotal_cents;
use crate::models::money::{cents_from_major, format_major, sandbox_amount, shipping_for_subtotal};
use crate::models::{NewOrder, PaymentMethod, PaymentStatus, TransactionStatus};
use crate::pipelines::contexts::CreateOrderCtxData;
use musicaa_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{error, info, warn};

fn required_field(value: &Option<String>) -> Option<String> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub fn build_create_order_pipeline() -> Pipeline<CreateOrderCtxData, AppError> {
  let mut p = Pipeline::<CreateOrderCtxData, AppError>::new(
    "create_order",
    vec![
      StepDef::required("validate_shipping_details"),
      StepDef::required("verify_paid_transaction").skip_when(|ctx: &CreateOrderCtxData| !ctx.is_paid()),
      StepDef::required("load_cart_lines"),
      StepDef::required("check_stock"),
      StepDef::required("persist_order"),
    ],
  );

  p.on_step("validate_shipping_details", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let (user_id, request) = {
      let guard = ctx_data.read();
      (guard.user_id, guard.request.clone())
    };

    let all_present = [
      &request.shipping_address,
      &request.city,
      &request.postal_code,
      &request.country,
      &request.payment_method,
    ]
    .iter()
    .all(|field| required_field(field).is_some());
    if !all_present {
      warn!("Create Order (User {}): missing shipping or payment fields.", user_id);
      return Err(AppError::Validation("Please provide all required fields".to_string()));
    }

    let method: PaymentMethod = request
      .payment_method
      .as_deref()
      .unwrap_or_default()
      .parse()
      .map_err(|raw: String| AppError::Validation(format!("Unknown payment method '{}'", raw)))?;

    if let Some(total) = request.total_amount {
      if !total.is_finite() || total < 0.0 {
        return Err(AppError::Validation("totalAmount must be a non-negative number".to_string()));
      }
    }

    ctx_data.write().payment_method = Some(method);
    info!("Create Order (User {}): shipping details validated, method {:?}.", user_id, method);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  // A paid order needs a payment the gateway confirmed.
  p.on_step("verify_paid_transaction", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let (store, user_id, payment_id) = {
      let guard = ctx_data.read();
      (
        guard.app_state.store.clone(),
        guard.user_id,
        required_field(&guard.request.payment_id),
      )
    };
    let payment_id =
      payment_id.ok_or_else(|| AppError::Validation("paymentId is required for a paid order".to_string()))?;

    let transaction = store
      .find_transaction(&payment_id)
      .await?
      .ok_or_else(|| AppError::Validation(format!("No payment found for {}", payment_id)))?;
    if transaction.status != TransactionStatus::Completed {
      warn!(
        "Create Order (User {}): payment {} is {}, refusing paid order.",
        user_id, payment_id, transaction.status
      );
      return Err(AppError::Validation(format!(
        "Payment {} is not completed",
        payment_id
      )));
    }
    info!("Create Order (User {}): payment {} verified as COMPLETED.", user_id, payment_id);
    ctx_data.write().paid_amount_cents = Some(transaction.amount_cents);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("load_cart_lines", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let (store, user_id) = {
      let guard = ctx_data.read();
      (guard.app_state.store.clone(), guard.user_id)
    };
    let lines = store.cart_lines(user_id).await?;
    if lines.is_empty() {
      warn!("Create Order (User {}): cart is empty.", user_id);
      return Err(AppError::Validation("Cart is empty".to_string()));
    }
    info!("Create Order (User {}): {} cart lines loaded.", user_id, lines.len());
    ctx_data.write().lines = lines;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  // The client's total wins when given; otherwise cart subtotal plus shipping.
  p.after_step("load_cart_lines", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let mut guard = ctx_data.write();
    let subtotal = subtotal_cents(&guard.lines);
    let computed = subtotal + shipping_for_subtotal(subtotal);
    let total = guard
      .request
      .total_amount
      .and_then(cents_from_major)
      .filter(|cents| *cents > 0)
      .unwrap_or(computed);
    guard.total_amount_cents = total;
    info!(
      "Create Order (User {}): total {} (cart subtotal {}).",
      guard.user_id,
      format_major(total),
      format_major(subtotal)
    );
    if let Some(paid) = guard.paid_amount_cents {
      if !paid_amount_matches(paid, total, guard.app_state.config.esewa.is_sandbox()) {
        warn!(
          "Create Order (User {}): payment {:?} charged {} but the order totals {}.",
          guard.user_id,
          guard.request.payment_id,
          format_major(paid),
          format_major(total)
        );
      }
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("check_stock", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let guard = ctx_data.read();
    if let Some(short) = guard.lines.iter().find(|line| line.stock < line.quantity) {
      warn!(
        "Create Order (User {}): insufficient stock for {} (available {}, requested {}).",
        guard.user_id, short.name, short.stock, short.quantity
      );
      return Err(AppError::Validation(format!("Insufficient stock for {}", short.name)));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("persist_order", |ctx_data: ContextData<CreateOrderCtxData>| async move {
    let (store, new_order) = {
      let guard = ctx_data.read();
      let payment_method = guard
        .payment_method
        .ok_or_else(|| AppError::Internal("Payment method must be validated before persisting".to_string()))?;
      let payment_status = if guard.is_paid() {
        PaymentStatus::Paid
      } else {
        PaymentStatus::Unpaid
      };
      let field = |v: &Option<String>| required_field(v).unwrap_or_default();
      let new_order = NewOrder {
        user_id: guard.user_id,
        shipping_address: field(&guard.request.shipping_address),
        city: field(&guard.request.city),
        postal_code: field(&guard.request.postal_code),
        country: field(&guard.request.country),
        payment_method,
        total_amount_cents: guard.total_amount_cents,
        payment_status,
        transaction_id: required_field(&guard.request.payment_id),
        lines: guard.lines.clone(),
      };
      (guard.app_state.store.clone(), new_order)
    };

    let user_id = new_order.user_id;
    let order = store.place_order(new_order).await.map_err(|e| {
      error!("Create Order (User {}): order could not be persisted: {}", user_id, e);
      e
    })?;
    info!(
      "Create Order (User {}): order {} placed, {:?}/{:?}, transaction {:?}.",
      user_id, order.id, order.payment_status, order.status, order.transaction_id
    );
    ctx_data.write().order = Some(order);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p
}

/// The sandbox merchant charges a rounded amount, so compare against that.
pub fn paid_amount_matches(paid_cents: i64, total_cents: i64, sandbox: bool) -> bool {
  if sandbox {
    sandbox_amount(total_cents) == Some(paid_cents)
  } else {
    paid_cents == total_cents
  }
}

pub fn register_create_order_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register_pipeline(build_create_order_pipeline());
  info!("Create Order pipeline registered.");
}

#[cfg(test)]
mod tests {
  use super::paid_amount_matches;

  #[test]
  fn paid_amount_must_equal_order_total() {
    assert!(paid_amount_matches(150_000, 150_000, false));
    assert!(!paid_amount_matches(100_000, 150_000, false));
  }

  #[test]
  fn sandbox_payments_match_the_rounded_total() {
    assert!(paid_amount_matches(120_000, 124_900, true));
    assert!(paid_amount_matches(10_000, 4_500, true));
    assert!(!paid_amount_matches(124_900, 124_900, true));
  }
}
