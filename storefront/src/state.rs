// storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::GatewayClient;
use crate::store::Store;
use musicaa_flow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub gateway: Arc<dyn GatewayClient>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Builds the state and registers every pipeline on a fresh registry.
  pub fn new(config: Arc<AppConfig>, store: Arc<dyn Store>, gateway: Arc<dyn GatewayClient>) -> Self {
    let state = Self {
      store,
      gateway,
      flows: Arc::new(FlowRegistry::new()),
      config,
    };
    crate::pipelines::register_all_pipelines(&state.flows);
    state
  }
}
