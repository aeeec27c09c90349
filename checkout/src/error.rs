// checkout/src/error.rs

use musicaa_flow::FlowError;
use thiserror::Error;

/// Failure talking to the storefront API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// The storefront answered with a 4xx. The request itself was refused.
  #[error("Request rejected ({status}): {message}")]
  Rejected { status: u16, message: String },

  /// Network failure, timeout, 5xx or an unreadable body.
  #[error("Storefront unavailable: {0}")]
  Unavailable(String),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("{0}")]
  Validation(String),

  #[error(transparent)]
  Api(#[from] ApiError),

  #[error("Session storage error: {0}")]
  Session(String),

  #[error("A checkout is already {0}")]
  InvalidState(&'static str),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal error: {0}")]
  Internal(String),
}

impl CheckoutError {
  /// Text shown next to the form when the shopper goes back to editing.
  pub fn user_message(&self) -> String {
    match self {
      CheckoutError::Validation(m) => m.clone(),
      CheckoutError::Api(ApiError::Rejected { message, .. }) => message.clone(),
      _ => "Failed to process checkout".to_string(),
    }
  }
}
