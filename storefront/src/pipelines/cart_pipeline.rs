// storefront/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::AddToCartCtxData;
use musicaa_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{info, warn};

pub fn build_add_to_cart_pipeline() -> Pipeline<AddToCartCtxData, AppError> {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(
    "add_to_cart",
    vec![
      StepDef::required("validate_cart_input"),
      StepDef::required("fetch_product_for_cart"),
      StepDef::required("check_product_stock_for_cart"),
      StepDef::required("add_or_update_cart_item"),
    ],
  );

  p.on_step("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let guard = ctx_data.read();
    if guard.product_id.is_none() || guard.quantity < 1 {
      warn!(
        "Add to Cart Pipeline: invalid input (product {:?}, quantity {}).",
        guard.product_id, guard.quantity
      );
      return Err(AppError::Validation("Invalid product or quantity".to_string()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("fetch_product_for_cart", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let (store, product_id) = {
      let guard = ctx_data.read();
      (guard.app_state.store.clone(), guard.product_id)
    };
    let product_id = product_id.ok_or_else(|| AppError::Validation("Invalid product or quantity".to_string()))?;
    let product = store.find_product(product_id).await?.ok_or_else(|| {
      warn!("Add to Cart Pipeline: product {} not found.", product_id);
      AppError::NotFound("Product not found".to_string())
    })?;
    ctx_data.write().product = Some(product);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on_step("check_product_stock_for_cart", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let guard = ctx_data.read();
    let available = guard.product.as_ref().map(|p| p.stock).unwrap_or(0);
    if available < guard.quantity {
      warn!(
        "Add to Cart Pipeline: insufficient stock. Available: {}, Requested: {}.",
        available, guard.quantity
      );
      return Err(AppError::Validation("Insufficient stock".to_string()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  // The store re-checks the combined quantity against stock.
  p.on_step("add_or_update_cart_item", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let (store, user_id, product_id, quantity) = {
      let guard = ctx_data.read();
      (
        guard.app_state.store.clone(),
        guard.authenticated_user_id,
        guard.product_id,
        guard.quantity,
      )
    };
    let product_id = product_id.ok_or_else(|| AppError::Validation("Invalid product or quantity".to_string()))?;
    let item = store.add_cart_item(user_id, product_id, quantity).await?;
    info!(
      "Add to Cart Pipeline: user {} now has {} x product {}.",
      user_id, item.quantity, product_id
    );
    ctx_data.write().updated_cart_item = Some(item);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p
}

pub fn register_add_to_cart_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register_pipeline(build_add_to_cart_pipeline());
  info!("Add to Cart pipeline registered.");
}
