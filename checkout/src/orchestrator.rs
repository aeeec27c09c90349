// checkout/src/orchestrator.rs

//! Checkout form submission: cash on delivery places the order directly,
//! gateway payments stage the order and redirect to the hosted payment page.

use crate::api::StorefrontApi;
use crate::dto::{CreateOrderRequest, InitiatePaymentRequest, InitiatePaymentResponse, OrderSummary, ShippingDetails};
use crate::error::CheckoutError;
use crate::pending::{PendingOrder, PendingOrderSlot};
use crate::session::SessionStore;
use chrono::Utc;
use musicaa_flow::{ContextData, Pipeline, PipelineControl, PipelineResult, StepDef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMethod {
  #[default]
  Cod,
  Esewa,
}

impl CheckoutMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      CheckoutMethod::Cod => "cod",
      CheckoutMethod::Esewa => "esewa",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingForm {
  pub shipping_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub payment_method: CheckoutMethod,
}

impl ShippingForm {
  fn details(&self) -> ShippingDetails {
    ShippingDetails {
      shipping_address: self.shipping_address.trim().to_string(),
      city: self.city.trim().to_string(),
      postal_code: self.postal_code.trim().to_string(),
      country: self.country.trim().to_string(),
    }
  }
}

/// Signed-in shopper, forwarded to the gateway.
#[derive(Debug, Clone, Default)]
pub struct Customer {
  pub name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
}

/// A POST to the gateway's hosted page. Following it ends the page.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRedirect {
  pub correlation_id: String,
  pub action: String,
  pub fields: BTreeMap<String, String>,
}

impl GatewayRedirect {
  /// A page that POSTs the hidden fields to the gateway as soon as it loads.
  pub fn auto_submit_form_html(&self) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html><body onload=\"document.forms[0].submit()\">\n");
    let _ = writeln!(html, "<form method=\"POST\" action=\"{}\">", escape_html(&self.action));
    for (name, value) in &self.fields {
      let _ = writeln!(
        html,
        "  <input type=\"hidden\" name=\"{}\" value=\"{}\">",
        escape_html(name),
        escape_html(value)
      );
    }
    html.push_str("  <noscript><button type=\"submit\">Continue to payment</button></noscript>\n</form>\n</body></html>\n");
    html
  }
}

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
  /// Editing the form. `error` keeps the message of the last failed submit.
  Collecting { error: Option<String> },
  Submitting,
  Redirecting(GatewayRedirect),
  OrderPlaced(OrderSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
  /// Cash on delivery: continue to the order history.
  OrderPlaced(OrderSummary),
  Redirect(GatewayRedirect),
}

pub struct CheckoutCtxData {
  pub api: Arc<dyn StorefrontApi>,
  pub slot: PendingOrderSlot,
  pub customer: Customer,
  pub form: ShippingForm,
  pub cart_item_count: usize,
  pub total_cents: i64,
  pub correlation_id: Option<String>,
  pub payment: Option<InitiatePaymentResponse>,
  pub order: Option<OrderSummary>,
  pub redirect: Option<GatewayRedirect>,
}

impl CheckoutCtxData {
  fn is_cod(&self) -> bool {
    self.form.payment_method == CheckoutMethod::Cod
  }

  fn total_amount(&self) -> f64 {
    self.total_cents as f64 / 100.0
  }
}

fn not_cod(ctx: &CheckoutCtxData) -> bool {
  !ctx.is_cod()
}

pub fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData, CheckoutError> {
  let mut p = Pipeline::<CheckoutCtxData, CheckoutError>::new(
    "checkout",
    vec![
      StepDef::required("validate_shipping_form"),
      StepDef::required("compute_cart_total"),
      StepDef::required("place_cod_order").skip_when(not_cod),
      StepDef::required("initiate_gateway_payment").skip_when(CheckoutCtxData::is_cod),
      StepDef::required("stage_pending_order").skip_when(CheckoutCtxData::is_cod),
      StepDef::required("prepare_gateway_redirect").skip_when(CheckoutCtxData::is_cod),
    ],
  );

  p.on_step("validate_shipping_form", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let details = ctx_data.read().form.details();
    let complete = [&details.shipping_address, &details.city, &details.postal_code, &details.country]
      .iter()
      .all(|field| !field.is_empty());
    if !complete {
      return Err(CheckoutError::Validation("Please fill in all required fields".to_string()));
    }
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p.on_step("compute_cart_total", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let api = ctx_data.read().api.clone();
    let cart = api.cart().await?;
    if cart.is_empty() {
      return Err(CheckoutError::Validation("Your cart is empty".to_string()));
    }
    let mut guard = ctx_data.write();
    guard.cart_item_count = cart.items.len();
    guard.total_cents = cart.total_cents();
    info!("Checkout: {} cart lines, total {:.2}.", guard.cart_item_count, guard.total_amount());
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p.on_step("place_cod_order", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (api, request) = {
      let guard = ctx_data.read();
      let details = guard.form.details();
      let request = CreateOrderRequest {
        shipping_address: details.shipping_address,
        city: details.city,
        postal_code: details.postal_code,
        country: details.country,
        payment_method: CheckoutMethod::Cod.as_str().to_string(),
        total_amount: guard.total_amount(),
        is_paid: None,
        payment_id: None,
      };
      (guard.api.clone(), request)
    };
    let order = api.create_order(&request).await?;
    info!("Checkout: cash-on-delivery order {} placed.", order.id);
    ctx_data.write().order = Some(order);
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p.on_step("initiate_gateway_payment", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let correlation_id = format!("ORDER_{}", Utc::now().timestamp_millis());
    let (api, request) = {
      let guard = ctx_data.read();
      let request = InitiatePaymentRequest {
        amount: guard.total_amount(),
        product_id: correlation_id.clone(),
        payment_gateway: guard.form.payment_method.as_str().to_string(),
        customer_name: guard.customer.name.clone().unwrap_or_else(|| "Customer".to_string()),
        customer_email: guard.customer.email.clone().unwrap_or_default(),
        customer_phone: guard.customer.phone.clone().unwrap_or_default(),
        product_name: format!("Order Items ({} items)", guard.cart_item_count),
        shipping_details: guard.form.details(),
      };
      (guard.api.clone(), request)
    };
    let payment = api.initiate_payment(&request).await?;
    info!("Checkout ({}): payment initiated with {}.", correlation_id, payment.payment_gateway);
    let mut guard = ctx_data.write();
    guard.correlation_id = Some(correlation_id);
    guard.payment = Some(payment);
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p.on_step("stage_pending_order", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let guard = ctx_data.read();
    let payment_id = guard
      .correlation_id
      .clone()
      .ok_or_else(|| CheckoutError::Internal("Payment must be initiated before staging".to_string()))?;
    let details = guard.form.details();
    guard.slot.stage(&PendingOrder {
      shipping_address: details.shipping_address,
      city: details.city,
      postal_code: details.postal_code,
      country: details.country,
      payment_method: guard.form.payment_method.as_str().to_string(),
      total_amount: guard.total_amount(),
      payment_id,
    })?;
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p.on_step("prepare_gateway_redirect", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let mut guard = ctx_data.write();
    let usable = guard
      .payment
      .as_ref()
      .filter(|payment| payment.payment_gateway == CheckoutMethod::Esewa.as_str() && !payment.form_data.is_empty())
      .cloned();
    let (Some(payment), Some(correlation_id)) = (usable, guard.correlation_id.clone()) else {
      warn!("Checkout: gateway answered without usable form data, dropping the stage.");
      guard.slot.clear();
      return Err(CheckoutError::Internal("Payment data not received".to_string()));
    };
    guard.redirect = Some(GatewayRedirect {
      correlation_id,
      action: payment.form_url,
      fields: payment.form_data,
    });
    Ok::<_, CheckoutError>(PipelineControl::Continue)
  });

  p
}

pub struct CheckoutOrchestrator {
  api: Arc<dyn StorefrontApi>,
  slot: PendingOrderSlot,
  customer: Customer,
  pipeline: Pipeline<CheckoutCtxData, CheckoutError>,
  state: CheckoutState,
}

impl CheckoutOrchestrator {
  pub fn new(api: Arc<dyn StorefrontApi>, session: Arc<dyn SessionStore>, customer: Customer) -> Self {
    Self {
      api,
      slot: PendingOrderSlot::new(session),
      customer,
      pipeline: build_checkout_pipeline(),
      state: CheckoutState::Collecting { error: None },
    }
  }

  pub fn state(&self) -> &CheckoutState {
    &self.state
  }

  /// Submits the form. On error the orchestrator is back in `Collecting`
  /// with the message kept; redirect and placed order are final.
  #[instrument(name = "checkout::submit", skip(self, form), fields(method = form.payment_method.as_str()))]
  pub async fn submit(&mut self, form: ShippingForm) -> Result<CheckoutOutcome, CheckoutError> {
    match &self.state {
      CheckoutState::Submitting => return Err(CheckoutError::InvalidState("being submitted")),
      CheckoutState::Redirecting(_) => return Err(CheckoutError::InvalidState("redirecting to the gateway")),
      CheckoutState::OrderPlaced(_) => return Err(CheckoutError::InvalidState("placed")),
      CheckoutState::Collecting { .. } => {}
    }
    self.state = CheckoutState::Submitting;

    let ctx = ContextData::new(CheckoutCtxData {
      api: self.api.clone(),
      slot: self.slot.clone(),
      customer: self.customer.clone(),
      form,
      cart_item_count: 0,
      total_cents: 0,
      correlation_id: None,
      payment: None,
      order: None,
      redirect: None,
    });

    let outcome = match self.pipeline.run(ctx.clone()).await {
      Ok(PipelineResult::Completed) => {
        let guard = ctx.read();
        match (&guard.order, &guard.redirect) {
          (Some(order), _) => Ok(CheckoutOutcome::OrderPlaced(order.clone())),
          (None, Some(redirect)) => Ok(CheckoutOutcome::Redirect(redirect.clone())),
          (None, None) => Err(CheckoutError::Internal("Checkout finished without an order or redirect".to_string())),
        }
      }
      Ok(PipelineResult::Stopped) => Err(CheckoutError::Internal("Checkout was stopped early".to_string())),
      Err(e) => Err(e),
    };

    match outcome {
      Ok(CheckoutOutcome::OrderPlaced(order)) => {
        self.state = CheckoutState::OrderPlaced(order.clone());
        Ok(CheckoutOutcome::OrderPlaced(order))
      }
      Ok(CheckoutOutcome::Redirect(redirect)) => {
        self.state = CheckoutState::Redirecting(redirect.clone());
        Ok(CheckoutOutcome::Redirect(redirect))
      }
      Err(e) => {
        warn!(error = %e, "Checkout submission failed.");
        self.state = CheckoutState::Collecting {
          error: Some(e.user_message()),
        };
        Err(e)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn redirect_page_escapes_and_posts_every_field() {
    let redirect = GatewayRedirect {
      correlation_id: "ORDER_1".into(),
      action: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".into(),
      fields: BTreeMap::from([
        ("total_amount".to_string(), "1500.00".to_string()),
        ("signature".to_string(), "a+b/c=\"x\"".to_string()),
      ]),
    };
    let html = redirect.auto_submit_form_html();
    assert!(html.contains("<form method=\"POST\" action=\"https://rc-epay.esewa.com.np/api/epay/main/v2/form\">"));
    assert!(html.contains("name=\"total_amount\" value=\"1500.00\""));
    assert!(html.contains("value=\"a+b/c=&quot;x&quot;\""));
    assert!(html.contains("document.forms[0].submit()"));
  }

  #[test]
  fn form_details_are_trimmed() {
    let form = ShippingForm {
      shipping_address: "  Lakeside 4 ".into(),
      city: "Pokhara".into(),
      postal_code: "33700".into(),
      country: " Nepal".into(),
      payment_method: CheckoutMethod::Cod,
    };
    let details = form.details();
    assert_eq!(details.shipping_address, "Lakeside 4");
    assert_eq!(details.country, "Nepal");
  }
}
