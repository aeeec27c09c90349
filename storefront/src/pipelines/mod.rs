// storefront/src/pipelines/mod.rs

//! Pipelines behind the payment, order and cart endpoints.

use crate::errors::AppError;
use musicaa_flow::FlowRegistry;

pub mod contexts;

pub mod cart_pipeline;
pub mod initiate_payment_pipeline;
pub mod order_pipeline;
pub mod payment_status_pipeline;

/// Registers every pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) {
  initiate_payment_pipeline::register_initiate_payment_pipeline(flows);
  payment_status_pipeline::register_payment_status_pipeline(flows);
  order_pipeline::register_create_order_pipeline(flows);
  cart_pipeline::register_add_to_cart_pipeline(flows);
  tracing::info!("All application pipelines registered.");
}
