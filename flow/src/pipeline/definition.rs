// flow/src/pipeline/definition.rs

use crate::core::handler::Handler;
use crate::core::step::StepDef;
use crate::error::FlowError;
use std::collections::HashMap;

/// Handlers attached to one step, grouped by phase.
pub(crate) struct StepHooks<TData: 'static + Send + Sync, Err> {
  pub(crate) before: Vec<Handler<TData, Err>>,
  pub(crate) on: Vec<Handler<TData, Err>>,
  pub(crate) after: Vec<Handler<TData, Err>>,
}

impl<TData: 'static + Send + Sync, Err> Default for StepHooks<TData, Err> {
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<TData: 'static + Send + Sync, Err> StepHooks<TData, Err> {
  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

/// An ordered set of named steps over `ContextData<TData>`.
///
/// Step-name mistakes (unknown or duplicate names) are setup bugs and panic
/// at construction time rather than surfacing on every request.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) hooks: HashMap<String, StepHooks<TData, Err>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(name: impl Into<String>, steps: Vec<StepDef<TData>>) -> Self {
    let name = name.into();
    let mut seen = std::collections::HashSet::new();
    for step in &steps {
      if !seen.insert(step.name.as_str()) {
        panic!("Pipeline '{}' setup error: duplicate step '{}'.", name, step.name);
      }
    }
    Self {
      name,
      steps,
      hooks: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  fn position_of(&self, step_name: &str) -> usize {
    match self.steps.iter().position(|s| s.name == step_name) {
      Some(idx) => idx,
      None => panic!(
        "Pipeline '{}' setup error: step '{}' not found.",
        self.name, step_name
      ),
    }
  }

  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    self.position_of(step_name);
  }
}
