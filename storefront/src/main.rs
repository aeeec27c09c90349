// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use musicaa_storefront::config::AppConfig;
use musicaa_storefront::services::{EsewaClient, GatewayClient};
use musicaa_storefront::state::AppState;
use musicaa_storefront::store::{MemoryStore, PgStore, Store};
use musicaa_storefront::{seed, web};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Musicaa storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let store: Arc<dyn Store> = if app_config.uses_memory_store() {
    tracing::warn!("DATABASE_URL selects the in-memory store; data is lost on restart.");
    Arc::new(MemoryStore::new())
  } else {
    match PgStore::connect(&app_config.database_url).await {
      Ok(store) => Arc::new(store),
      Err(e) => {
        tracing::error!(error = %e, "Failed to connect to the database.");
        return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()));
      }
    }
  };

  if app_config.seed_db {
    if let Err(e) = seed::seed_catalogue(store.as_ref()).await {
      tracing::error!(error = %e, "Failed to seed database.");
    }
  }

  let gateway: Arc<dyn GatewayClient> = match EsewaClient::new(&app_config.esewa) {
    Ok(client) => Arc::new(client),
    Err(e) => return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
  };

  let app_state = AppState::new(app_config.clone(), store, gateway);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
