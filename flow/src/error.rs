// flow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the engine itself rather than by step handlers.
///
/// Application error types used with [`crate::Pipeline`] must implement
/// `From<FlowError>` so these can surface through `Pipeline::run`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step '{step_name}' is not defined in pipeline '{pipeline}'")]
  StepNotFound { pipeline: String, step_name: String },

  #[error("Required step '{step_name}' in pipeline '{pipeline}' has no handlers")]
  HandlerMissing { pipeline: String, step_name: String },

  #[error("Handler failed. Source: {source}")]
  HandlerFailed {
    #[source]
    source: AnyhowError,
  },

  #[error("No pipeline registered for context type {type_name}")]
  NotRegistered { type_name: String },

  #[error("Context passed to the registry was not a ContextData<{expected_type}>")]
  TypeMismatch { expected_type: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerFailed { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
