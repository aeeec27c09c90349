// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use musicaa_flow::{ContextData, PipelineResult};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderStatus};
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::state::AppState;
use crate::web::dto::{CreateOrderRequest, UpdateOrderStatusRequest};
use crate::web::extractors::AuthenticatedUser;

#[instrument(
    name = "handler::create_order",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, is_paid = ?req_payload.is_paid, payment_id = ?req_payload.payment_id)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(CreateOrderCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    req_payload.into_inner(),
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let order = ctx
        .read()
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order pipeline completed without an order".to_string()))?;
      info!("Order {} placed for user {}.", order.id, auth_user.user_id);
      Ok(HttpResponse::Created().json(json!({
        "message": "Order placed successfully",
        "order": order
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Create Order pipeline for user {} was stopped by a handler.", auth_user.user_id);
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::list_my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.orders_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::list_all_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_all_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let orders = app_state.store.all_orders().await?;
  Ok(HttpResponse::Ok().json(orders))
}

async fn load_order(app_state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
  app_state
    .store
    .find_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

#[instrument(name = "handler::get_order", skip(app_state, path, auth_user), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = load_order(&app_state, path.into_inner()).await?;
  if order.user_id != auth_user.user_id && !auth_user.is_admin() {
    warn!("User {} tried to read order {} owned by someone else.", auth_user.user_id, order.id);
    return Err(AppError::Forbidden("Not authorized to view this order".to_string()));
  }
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(
    name = "handler::update_order_status",
    skip(app_state, path, req_payload, auth_user),
    fields(order_id = %path.as_ref(), status = %req_payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateOrderStatusRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let status: OrderStatus = req_payload
    .status
    .parse()
    .map_err(|_| AppError::Validation("Invalid status".to_string()))?;
  let order = app_state
    .store
    .update_order_status(path.into_inner(), status)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  info!("Order {} moved to {:?}.", order.id, order.status);
  Ok(HttpResponse::Ok().json(json!({
    "message": "Order status updated",
    "order": order
  })))
}

#[instrument(name = "handler::delete_order", skip(app_state, path, auth_user), fields(order_id = %path.as_ref()))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let order_id = path.into_inner();
  if !app_state.store.delete_order(order_id).await? {
    return Err(AppError::NotFound("Order not found".to_string()));
  }
  info!("Order {} deleted by admin {}.", order_id, auth_user.user_id);
  Ok(HttpResponse::Ok().json(json!({ "message": "Order deleted" })))
}
