// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use musicaa_flow::{ContextData, PipelineResult};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::cart_item::subtotal_cents;
use crate::models::money::shipping_for_subtotal;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::state::AppState;
use crate::web::dto::{AddToCartRequest, CartView};
use crate::web::extractors::AuthenticatedUser;

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, product_id = ?req_payload.product_id, quantity = ?req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let request = req_payload.into_inner();
  let ctx = ContextData::new(AddToCartCtxData {
    app_state: app_state.get_ref().clone(),
    authenticated_user_id: auth_user.user_id,
    product_id: request.product_id,
    quantity: request.quantity.unwrap_or(0),
    product: None,
    updated_cart_item: None,
  });

  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx.read();
      let item = guard
        .updated_cart_item
        .as_ref()
        .ok_or_else(|| AppError::Internal("Cart update completed, but item details are unavailable.".to_string()))?;
      info!("Cart item {} now at quantity {}.", item.id, item.quantity);
      Ok(HttpResponse::Ok().json(json!({
        "message": "Item added to cart",
        "cartItem": item
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Add to Cart pipeline for user {} was stopped by a handler.", auth_user.user_id);
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let items = app_state.store.cart_lines(auth_user.user_id).await?;
  let subtotal = subtotal_cents(&items);
  let shipping = if items.is_empty() { 0 } else { shipping_for_subtotal(subtotal) };
  Ok(HttpResponse::Ok().json(CartView {
    user_id: auth_user.user_id,
    items,
    subtotal,
    shipping,
    total: subtotal + shipping,
  }))
}
