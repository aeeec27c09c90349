// storefront/tests/http_api_tests.rs
mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::*;
use musicaa_storefront::services::GatewayStatus;
use musicaa_storefront::store::Store;
use musicaa_storefront::web::configure_app_routes;
use serde_json::{json, Value};
use uuid::Uuid;

macro_rules! init_service {
  ($app:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($app.state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

#[actix_web::test]
async fn health_check_answers_ok() {
  let app = sandbox_app();
  let service = init_service!(app);
  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn initiate_payment_returns_signed_form() {
  let app = production_app();
  let service = init_service!(app);
  let req = test::TestRequest::post()
    .uri("/api/payment/initiate-payment")
    .set_json(json!({
      "amount": 1500,
      "productId": "ORDER_1700000000000",
      "paymentGateway": "esewa",
      "productName": "Musicaa order",
      "customerName": "Asha"
    }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["paymentGateway"], "esewa");
  assert_eq!(body["transactionId"], "ORDER_1700000000000");
  assert_eq!(body["formUrl"], "https://rc-epay.esewa.com.np/api/epay/main/v2/form");
  assert_eq!(body["formData"]["total_amount"], "1500.00");
  assert_eq!(body["formData"]["signed_field_names"], "total_amount,transaction_uuid,product_code");
  assert!(body["formData"]["signature"].as_str().is_some_and(|s| !s.is_empty()));
}

#[actix_web::test]
async fn initiate_payment_rejects_unknown_gateway_with_400() {
  let app = production_app();
  let service = init_service!(app);
  let req = test::TestRequest::post()
    .uri("/api/payment/initiate-payment")
    .set_json(json!({
      "amount": 1500,
      "productId": "ORDER_2",
      "paymentGateway": "bitcoin",
      "productName": "Musicaa order"
    }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().is_some());
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
  let app = production_app();
  let service = init_service!(app);
  let req = test::TestRequest::post()
    .uri("/api/payment/initiate-payment")
    .insert_header(("Content-Type", "application/json"))
    .set_payload("{not json")
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_status_for_unknown_transaction_is_404() {
  let app = production_app();
  let service = init_service!(app);
  let req = test::TestRequest::post()
    .uri("/api/payment/payment-status")
    .set_json(json!({ "product_id": "ORDER_GHOST", "status": "FAILED" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Transaction not found");
}

#[actix_web::test]
async fn payment_status_reports_completion() {
  let app = production_app();
  let service = init_service!(app);
  let initiate = test::TestRequest::post()
    .uri("/api/payment/initiate-payment")
    .set_json(json!({
      "amount": 1500,
      "productId": "ORDER_3",
      "paymentGateway": "esewa",
      "productName": "Musicaa order"
    }))
    .to_request();
  assert_eq!(test::call_service(&service, initiate).await.status(), StatusCode::OK);

  app.gateway.set_status(GatewayStatus::Complete);
  let req = test::TestRequest::post()
    .uri("/api/payment/payment-status")
    .set_json(json!({ "product_id": "ORDER_3" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "COMPLETED");
  assert_eq!(body["message"], "Transaction status updated successfully");
}

#[actix_web::test]
async fn gateway_outage_is_502() {
  let app = production_app();
  let service = init_service!(app);
  let initiate = test::TestRequest::post()
    .uri("/api/payment/initiate-payment")
    .set_json(json!({
      "amount": 200,
      "productId": "ORDER_4",
      "paymentGateway": "esewa",
      "productName": "Musicaa order"
    }))
    .to_request();
  assert_eq!(test::call_service(&service, initiate).await.status(), StatusCode::OK);

  app.gateway.set_unreachable("timed out");
  let req = test::TestRequest::post()
    .uri("/api/payment/payment-status")
    .set_json(json!({ "product_id": "ORDER_4" }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn orders_require_identity_header() {
  let app = production_app();
  let service = init_service!(app);
  let req = test::TestRequest::post()
    .uri("/api/orders")
    .set_json(json!({ "paymentMethod": "cod" }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn cod_order_round_trip_through_cart() {
  let app = production_app();
  let service = init_service!(app);
  let user_id = Uuid::new_v4();
  let product = add_product(app.store.as_ref(), "Cajon", 800_000, 3).await;

  let add = test::TestRequest::post()
    .uri("/api/cart/add")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "productId": product.id, "quantity": 2 }))
    .to_request();
  assert_eq!(test::call_service(&service, add).await.status(), StatusCode::OK);

  let cart = test::TestRequest::get()
    .uri("/api/cart")
    .insert_header(("X-User-ID", user_id.to_string()))
    .to_request();
  let cart: Value = test::call_and_read_body_json(&service, cart).await;
  assert_eq!(cart["total"], 16000.0);
  assert_eq!(cart["shipping"], 0.0);

  let order = test::TestRequest::post()
    .uri("/api/orders")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({
      "shippingAddress": "Lakeside 4",
      "city": "Pokhara",
      "postalCode": "33700",
      "country": "Nepal",
      "paymentMethod": "cod",
      "isPaid": false
    }))
    .to_request();
  let resp = test::call_service(&service, order).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["order"]["paymentStatus"], "unpaid");
  assert_eq!(body["order"]["status"], "pending");
  assert_eq!(body["order"]["totalAmount"], 16000.0);

  let mine = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header(("X-User-ID", user_id.to_string()))
    .to_request();
  let mine: Value = test::call_and_read_body_json(&service, mine).await;
  assert_eq!(mine.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn order_admin_routes_need_admin_role() {
  let app = production_app();
  let service = init_service!(app);
  let (user_id, _) = user_with_cart(app.store.as_ref()).await;

  let customer_list = test::TestRequest::get()
    .uri("/api/orders/all")
    .insert_header(("X-User-ID", user_id.to_string()))
    .to_request();
  assert_eq!(test::call_service(&service, customer_list).await.status(), StatusCode::FORBIDDEN);

  let admin_list = test::TestRequest::get()
    .uri("/api/orders/all")
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .insert_header(("X-User-Role", "admin"))
    .to_request();
  assert_eq!(test::call_service(&service, admin_list).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn admin_moves_order_through_statuses() {
  let app = production_app();
  let service = init_service!(app);
  let (user_id, _) = user_with_cart(app.store.as_ref()).await;
  let create = test::TestRequest::post()
    .uri("/api/orders")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({
      "shippingAddress": "Lakeside 4",
      "city": "Pokhara",
      "postalCode": "33700",
      "country": "Nepal",
      "paymentMethod": "cod"
    }))
    .to_request();
  let created: Value = test::call_and_read_body_json(&service, create).await;
  let order_id = created["order"]["id"].as_str().unwrap().to_string();

  let bad = test::TestRequest::put()
    .uri(&format!("/api/orders/{}/status", order_id))
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .insert_header(("X-User-Role", "admin"))
    .set_json(json!({ "status": "teleported" }))
    .to_request();
  assert_eq!(test::call_service(&service, bad).await.status(), StatusCode::BAD_REQUEST);

  let ship = test::TestRequest::put()
    .uri(&format!("/api/orders/{}/status", order_id))
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .insert_header(("X-User-Role", "admin"))
    .set_json(json!({ "status": "shipped" }))
    .to_request();
  let shipped: Value = test::call_and_read_body_json(&service, ship).await;
  assert_eq!(shipped["order"]["status"], "shipped");

  let other_user = test::TestRequest::get()
    .uri(&format!("/api/orders/{}", order_id))
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .to_request();
  assert_eq!(test::call_service(&service, other_user).await.status(), StatusCode::FORBIDDEN);

  let delete = test::TestRequest::delete()
    .uri(&format!("/api/orders/{}", order_id))
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .insert_header(("X-User-Role", "admin"))
    .to_request();
  assert_eq!(test::call_service(&service, delete).await.status(), StatusCode::OK);
  assert!(app.store.find_order(order_id.parse().unwrap()).await.unwrap().is_none());
}
