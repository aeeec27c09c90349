// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Merchant code eSewa issues for its sandbox.
pub const ESEWA_SANDBOX_MERCHANT: &str = "EPAYTEST";

#[derive(Clone)]
pub struct EsewaConfig {
  pub merchant_id: String,
  pub secret: String,
  pub payment_url: String,
  pub status_check_url: String,
  pub success_url: String,
  pub failure_url: String,
  /// Query the gateway again for transactions that are already terminal.
  pub reverify_terminal: bool,
  pub timeout: Duration,
}

impl EsewaConfig {
  pub fn is_sandbox(&self) -> bool {
    self.merchant_id == ESEWA_SANDBOX_MERCHANT
  }
}

impl std::fmt::Debug for EsewaConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EsewaConfig")
      .field("merchant_id", &self.merchant_id)
      .field("secret", &"[REDACTED]")
      .field("payment_url", &self.payment_url)
      .field("status_check_url", &self.status_check_url)
      .field("success_url", &self.success_url)
      .field("failure_url", &self.failure_url)
      .field("reverify_terminal", &self.reverify_terminal)
      .field("timeout", &self.timeout)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub esewa: EsewaConfig,
  pub seed_db: bool,
}

impl AppConfig {
  pub fn uses_memory_store(&self) -> bool {
    self.database_url.starts_with("memory://")
  }

  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env =
      |var_name: &str| lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)));
    let get_or = |var_name: &str, default: &str| lookup(var_name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = get_or("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let merchant_id = get_env("ESEWA_MERCHANT_ID")?;
    let secret = get_env("ESEWA_SECRET")?;
    if secret.trim().is_empty() {
      return Err(AppError::Config("ESEWA_SECRET must not be empty".to_string()));
    }
    let payment_url = get_or("ESEWA_PAYMENT_URL", "https://rc-epay.esewa.com.np/api/epay/main/v2/form");
    let status_check_url = get_or(
      "ESEWA_PAYMENT_STATUS_CHECK_URL",
      "https://rc.esewa.com.np/api/epay/transaction/status/",
    );
    let success_url = get_env("SUCCESS_URL")?;
    let failure_url = get_env("FAILURE_URL")?;
    let reverify_terminal = get_or("ESEWA_REVERIFY_TERMINAL", "true")
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid ESEWA_REVERIFY_TERMINAL value: {}", e)))?;
    let timeout_secs = get_or("GATEWAY_TIMEOUT_SECS", "10")
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid GATEWAY_TIMEOUT_SECS: {}", e)))?;

    let seed_db = get_or("SEED_DB", "false")
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    let config = Self {
      server_host,
      server_port,
      database_url,
      esewa: EsewaConfig {
        merchant_id,
        secret,
        payment_url,
        status_check_url,
        success_url,
        failure_url,
        reverify_terminal,
        timeout: Duration::from_secs(timeout_secs),
      },
      seed_db,
    };
    tracing::info!(esewa = ?config.esewa, "Application configuration loaded successfully.");
    Ok(config)
  }
}
