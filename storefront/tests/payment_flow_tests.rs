// storefront/tests/payment_flow_tests.rs
mod common;

use common::*;
use musicaa_flow::{ContextData, PipelineResult};
use musicaa_storefront::errors::AppError;
use musicaa_storefront::models::{OrderStatus, PaymentStatus, TransactionStatus};
use musicaa_storefront::pipelines::contexts::{CreateOrderCtxData, InitiatePaymentCtxData, PaymentStatusCtxData};
use musicaa_storefront::services::signature::sign_message;
use musicaa_storefront::services::GatewayStatus;
use musicaa_storefront::store::Store;
use musicaa_storefront::web::dto::{CreateOrderRequest, InitiatePaymentRequest, PaymentStatusRequest};
use uuid::Uuid;

fn esewa_request(product_id: &str, amount: f64) -> InitiatePaymentRequest {
  InitiatePaymentRequest {
    amount: Some(amount),
    product_id: product_id.to_string(),
    payment_gateway: "esewa".to_string(),
    customer_name: Some("Asha".to_string()),
    customer_email: Some("asha@example.com".to_string()),
    customer_phone: Some("9800000000".to_string()),
    product_name: "Musicaa order".to_string(),
    shipping_details: None,
  }
}

fn status_request(product_id: &str, status: Option<&str>) -> PaymentStatusRequest {
  PaymentStatusRequest {
    product_id: product_id.to_string(),
    pidx: None,
    status: status.map(str::to_string),
  }
}

fn shipping_request(payment_method: &str) -> CreateOrderRequest {
  CreateOrderRequest {
    shipping_address: Some("Thamel Marg 12".to_string()),
    city: Some("Kathmandu".to_string()),
    postal_code: Some("44600".to_string()),
    country: Some("Nepal".to_string()),
    payment_method: Some(payment_method.to_string()),
    total_amount: None,
    is_paid: Some(false),
    payment_id: None,
  }
}

async fn initiate(app: &TestApp, request: InitiatePaymentRequest) -> Result<ContextData<InitiatePaymentCtxData>, AppError> {
  let ctx = ContextData::new(InitiatePaymentCtxData::new(app.state.clone(), request));
  let result = app.state.flows.run(ctx.clone()).await?;
  assert_eq!(result, PipelineResult::Completed);
  Ok(ctx)
}

async fn check_status(app: &TestApp, request: PaymentStatusRequest) -> Result<(TransactionStatus, String), AppError> {
  let ctx = ContextData::new(PaymentStatusCtxData::new(app.state.clone(), request));
  app.state.flows.run(ctx.clone()).await?;
  let guard = ctx.read();
  Ok((guard.outcome.expect("status pipeline sets an outcome"), guard.message.clone()))
}

async fn create_order(app: &TestApp, user_id: Uuid, request: CreateOrderRequest) -> Result<musicaa_storefront::models::Order, AppError> {
  let ctx = ContextData::new(CreateOrderCtxData::new(app.state.clone(), user_id, request));
  let result = app.state.flows.run(ctx.clone()).await?;
  assert_eq!(result, PipelineResult::Completed);
  let order = ctx.read().order.clone().expect("order pipeline stores the order");
  Ok(order)
}

// --- initiate payment ---

#[tokio::test]
async fn initiate_signs_two_decimal_amount_and_records_pending() {
  let app = production_app();
  let ctx = initiate(&app, esewa_request("ORDER_1700000000000", 1500.0)).await.unwrap();

  let form = ctx.read().form.clone().unwrap();
  assert_eq!(form.total_amount, "1500.00");
  assert_eq!(form.transaction_uuid, "ORDER_1700000000000");
  assert_eq!(form.product_code, "NP-ES-MUSICAA");
  assert_eq!(form.signed_field_names, "total_amount,transaction_uuid,product_code");
  let expected = sign_message(
    SANDBOX_SECRET,
    "total_amount=1500.00,transaction_uuid=ORDER_1700000000000,product_code=NP-ES-MUSICAA",
  )
  .unwrap();
  assert_eq!(form.signature, expected);

  let stored = app.store.find_transaction("ORDER_1700000000000").await.unwrap().unwrap();
  assert_eq!(stored.status, TransactionStatus::Pending);
  assert_eq!(stored.amount_cents, 150_000);
  assert_eq!(stored.product_name, "Musicaa order");
}

#[tokio::test]
async fn sandbox_merchant_charges_rounded_amount() {
  let app = sandbox_app();
  let ctx = initiate(&app, esewa_request("ORDER_1", 1249.0)).await.unwrap();
  let guard = ctx.read();
  assert_eq!(guard.requested_amount_cents, 124_900);
  assert_eq!(guard.charged_amount_cents, 120_000);
  let form = guard.form.clone().unwrap();
  assert_eq!(form.total_amount, "1200.00");
  assert_eq!(
    form.signature,
    sign_message(
      SANDBOX_SECRET,
      "total_amount=1200.00,transaction_uuid=ORDER_1,product_code=EPAYTEST"
    )
    .unwrap()
  );
  drop(guard);

  let small = initiate(&app, esewa_request("ORDER_2", 45.0)).await.unwrap();
  assert_eq!(small.read().charged_amount_cents, 10_000);
}

#[tokio::test]
async fn unknown_gateway_is_rejected_without_side_effects() {
  let app = production_app();
  let mut request = esewa_request("ORDER_X", 1500.0);
  request.payment_gateway = "bitcoin".to_string();
  let err = initiate(&app, request).await.err().expect("initiation should fail");
  assert!(matches!(err, AppError::UnsupportedGateway(ref g) if g == "bitcoin"));
  assert!(app.store.find_transaction("ORDER_X").await.unwrap().is_none());

  let mut paypal = esewa_request("ORDER_Y", 1500.0);
  paypal.payment_gateway = "paypal".to_string();
  assert!(matches!(initiate(&app, paypal).await, Err(AppError::UnsupportedGateway(_))));
}

#[tokio::test]
async fn non_positive_amount_is_a_validation_error() {
  let app = production_app();
  for amount in [0.0, -10.0, f64::NAN] {
    let err = initiate(&app, esewa_request("ORDER_Z", amount)).await.err().expect("initiation should fail");
    assert!(matches!(err, AppError::Validation(_)), "amount {} gave {:?}", amount, err);
  }
  let mut missing = esewa_request("ORDER_Z", 10.0);
  missing.amount = None;
  assert!(matches!(initiate(&app, missing).await, Err(AppError::Validation(_))));
  assert!(app.store.find_transaction("ORDER_Z").await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_amount_is_rejected_before_rounding() {
  let app = sandbox_app();
  for amount in [92233720368547758.07, 1e300, 10_000_000.01] {
    let err = initiate(&app, esewa_request("ORDER_HUGE", amount))
      .await
      .err()
      .expect("initiation should fail");
    assert!(matches!(err, AppError::Validation(_)), "amount {} gave {:?}", amount, err);
  }
  assert!(app.store.find_transaction("ORDER_HUGE").await.unwrap().is_none());

  let ctx = initiate(&app, esewa_request("ORDER_CAP", 10_000_000.0)).await.unwrap();
  assert_eq!(ctx.read().charged_amount_cents, 1_000_000_000);
}

#[tokio::test]
async fn reused_correlation_id_conflicts() {
  let app = production_app();
  initiate(&app, esewa_request("ORDER_DUP", 1500.0)).await.unwrap();
  let err = initiate(&app, esewa_request("ORDER_DUP", 99.0)).await.err().expect("initiation should fail");
  assert!(matches!(err, AppError::Conflict(_)));
  let stored = app.store.find_transaction("ORDER_DUP").await.unwrap().unwrap();
  assert_eq!(stored.amount_cents, 150_000);
}

// --- payment status ---

#[tokio::test]
async fn unknown_transaction_is_not_found_and_creates_nothing() {
  let app = production_app();
  let err = check_status(&app, status_request("ORDER_GHOST", Some("FAILED"))).await.unwrap_err();
  assert!(matches!(err, AppError::TransactionNotFound { ref product_id } if product_id == "ORDER_GHOST"));
  let err = check_status(&app, status_request("ORDER_GHOST", None)).await.unwrap_err();
  assert!(matches!(err, AppError::TransactionNotFound { .. }));
  assert!(app.store.find_transaction("ORDER_GHOST").await.unwrap().is_none());
  assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn reported_failure_marks_failed_without_asking_gateway() {
  let app = production_app();
  initiate(&app, esewa_request("ORDER_F", 1500.0)).await.unwrap();

  let (status, message) = check_status(&app, status_request("ORDER_F", Some("FAILED"))).await.unwrap();
  assert_eq!(status, TransactionStatus::Failed);
  assert_eq!(message, "Transaction status updated to FAILED");
  assert_eq!(app.gateway.calls(), 0);
  assert_eq!(
    app.store.find_transaction("ORDER_F").await.unwrap().unwrap().status,
    TransactionStatus::Failed
  );
}

#[tokio::test]
async fn reported_failure_cannot_undo_completion() {
  let app = production_app();
  initiate(&app, esewa_request("ORDER_C", 1500.0)).await.unwrap();
  app.gateway.set_status(GatewayStatus::Complete);
  check_status(&app, status_request("ORDER_C", None)).await.unwrap();

  let (status, message) = check_status(&app, status_request("ORDER_C", Some("FAILED"))).await.unwrap();
  assert_eq!(status, TransactionStatus::Completed);
  assert_eq!(message, "Transaction already COMPLETED");
}

#[tokio::test]
async fn gateway_complete_marks_completed_and_queries_stored_amount() {
  let app = sandbox_app();
  initiate(&app, esewa_request("ORDER_OK", 1249.0)).await.unwrap();
  app.gateway.set_status(GatewayStatus::Complete);

  let (status, message) = check_status(&app, status_request("ORDER_OK", None)).await.unwrap();
  assert_eq!(status, TransactionStatus::Completed);
  assert_eq!(message, "Transaction status updated successfully");

  let query = app.gateway.last_query().unwrap();
  assert_eq!(query.product_code, "EPAYTEST");
  assert_eq!(query.total_amount, "1200.00");
  assert_eq!(query.transaction_uuid, "ORDER_OK");
}

#[tokio::test]
async fn gateway_not_complete_marks_failed() {
  let app = production_app();
  initiate(&app, esewa_request("ORDER_NC", 1500.0)).await.unwrap();
  app.gateway.set_status(GatewayStatus::NotComplete("CANCELED".to_string()));

  let (status, _) = check_status(&app, status_request("ORDER_NC", None)).await.unwrap();
  assert_eq!(status, TransactionStatus::Failed);
}

#[tokio::test]
async fn repeated_checks_are_idempotent_once_terminal() {
  let app = production_app();
  initiate(&app, esewa_request("ORDER_IDEM", 1500.0)).await.unwrap();
  app.gateway.set_status(GatewayStatus::Complete);
  check_status(&app, status_request("ORDER_IDEM", None)).await.unwrap();

  app.gateway.set_status(GatewayStatus::NotComplete("NOT_FOUND".to_string()));
  let (status, message) = check_status(&app, status_request("ORDER_IDEM", None)).await.unwrap();
  assert_eq!(status, TransactionStatus::Completed);
  assert_eq!(message, "Transaction already COMPLETED");
  assert_eq!(app.gateway.calls(), 2);
}

#[tokio::test]
async fn terminal_transactions_skip_gateway_when_reverify_is_off() {
  let app = build_app("NP-ES-MUSICAA", false);
  initiate(&app, esewa_request("ORDER_NR", 1500.0)).await.unwrap();
  app.gateway.set_status(GatewayStatus::Complete);
  check_status(&app, status_request("ORDER_NR", None)).await.unwrap();
  assert_eq!(app.gateway.calls(), 1);

  let (status, _) = check_status(&app, status_request("ORDER_NR", None)).await.unwrap();
  assert_eq!(status, TransactionStatus::Completed);
  assert_eq!(app.gateway.calls(), 1);
}

#[tokio::test]
async fn unreachable_gateway_leaves_transaction_pending() {
  let app = production_app();
  initiate(&app, esewa_request("ORDER_NET", 1500.0)).await.unwrap();
  app.gateway.set_unreachable("connection refused");

  let err = check_status(&app, status_request("ORDER_NET", None)).await.unwrap_err();
  assert!(matches!(err, AppError::Gateway(_)));
  assert_eq!(
    app.store.find_transaction("ORDER_NET").await.unwrap().unwrap().status,
    TransactionStatus::Pending
  );
}

// --- orders ---

#[tokio::test]
async fn cod_order_is_unpaid_pending_and_clears_cart() {
  let app = production_app();
  let (user_id, product) = user_with_cart(app.store.as_ref()).await;

  let order = create_order(&app, user_id, shipping_request("cod")).await.unwrap();
  assert_eq!(order.payment_status, PaymentStatus::Unpaid);
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.total_amount_cents, 150_000);
  assert_eq!(order.items.len(), 1);
  assert_eq!(order.items[0].product_id, product.id);
  assert!(app.store.cart_lines(user_id).await.unwrap().is_empty());
  assert_eq!(app.store.find_product(product.id).await.unwrap().unwrap().stock, 4);
}

#[tokio::test]
async fn shipping_is_added_to_small_carts() {
  let app = production_app();
  let user_id = Uuid::new_v4();
  let strings = add_product(app.store.as_ref(), "Guitar strings", 4_500, 10).await;
  app.store.add_cart_item(user_id, strings.id, 1).await.unwrap();

  let order = create_order(&app, user_id, shipping_request("cod")).await.unwrap();
  assert_eq!(order.total_amount_cents, 5_000);
}

#[tokio::test]
async fn client_total_is_kept_when_positive() {
  let app = production_app();
  let (user_id, _) = user_with_cart(app.store.as_ref()).await;
  let mut request = shipping_request("cod");
  request.total_amount = Some(1234.5);
  let order = create_order(&app, user_id, request).await.unwrap();
  assert_eq!(order.total_amount_cents, 123_450);
}

#[tokio::test]
async fn paid_order_requires_completed_transaction() {
  let app = production_app();
  let (user_id, _) = user_with_cart(app.store.as_ref()).await;
  initiate(&app, esewa_request("ORDER_PAY", 1500.0)).await.unwrap();

  let mut request = shipping_request("esewa");
  request.is_paid = Some(true);
  request.payment_id = Some("ORDER_PAY".to_string());
  let err = create_order(&app, user_id, request.clone()).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
  assert_eq!(app.store.order_count(), 0);

  app.gateway.set_status(GatewayStatus::Complete);
  check_status(&app, status_request("ORDER_PAY", None)).await.unwrap();

  let order = create_order(&app, user_id, request).await.unwrap();
  assert_eq!(order.payment_status, PaymentStatus::Paid);
  assert_eq!(order.status, OrderStatus::Processing);
  assert_eq!(order.transaction_id.as_deref(), Some("ORDER_PAY"));
}

#[tokio::test]
async fn paid_order_without_payment_id_is_rejected() {
  let app = production_app();
  let (user_id, _) = user_with_cart(app.store.as_ref()).await;
  let mut request = shipping_request("esewa");
  request.is_paid = Some(true);
  assert!(matches!(
    create_order(&app, user_id, request).await,
    Err(AppError::Validation(_))
  ));
}

#[tokio::test]
async fn second_order_for_same_transaction_conflicts() {
  let app = production_app();
  let (user_id, product) = user_with_cart(app.store.as_ref()).await;
  initiate(&app, esewa_request("ORDER_ONCE", 1500.0)).await.unwrap();
  app.gateway.set_status(GatewayStatus::Complete);
  check_status(&app, status_request("ORDER_ONCE", None)).await.unwrap();

  let mut request = shipping_request("esewa");
  request.is_paid = Some(true);
  request.payment_id = Some("ORDER_ONCE".to_string());
  create_order(&app, user_id, request.clone()).await.unwrap();

  app.store.add_cart_item(user_id, product.id, 1).await.unwrap();
  let err = create_order(&app, user_id, request).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));
  assert_eq!(app.store.order_count(), 1);
}

#[tokio::test]
async fn missing_shipping_fields_are_rejected() {
  let app = production_app();
  let (user_id, _) = user_with_cart(app.store.as_ref()).await;
  let mut request = shipping_request("cod");
  request.city = Some("   ".to_string());
  let err = create_order(&app, user_id, request).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m == "Please provide all required fields"));
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() {
  let app = production_app();
  let err = create_order(&app, Uuid::new_v4(), shipping_request("cod")).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m == "Cart is empty"));
}

#[tokio::test]
async fn stock_sold_out_by_another_order_is_rejected() {
  let app = production_app();
  let pedal = add_product(app.store.as_ref(), "Fuzz pedal", 900_000, 2).await;
  let first = Uuid::new_v4();
  let second = Uuid::new_v4();
  app.store.add_cart_item(first, pedal.id, 2).await.unwrap();
  app.store.add_cart_item(second, pedal.id, 2).await.unwrap();

  create_order(&app, first, shipping_request("cod")).await.unwrap();
  let err = create_order(&app, second, shipping_request("cod")).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("Insufficient stock")));
  assert_eq!(app.store.cart_lines(second).await.unwrap().len(), 1);
}
