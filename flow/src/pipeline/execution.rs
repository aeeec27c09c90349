// flow/src/pipeline/execution.rs

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes every step in order against `ctx_data`.
  ///
  /// A step whose skip condition holds is passed over. A required step with
  /// no handlers fails with [`FlowError::HandlerMissing`]. The first handler
  /// error aborts the run and is returned unchanged.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    let span = info_span!("pipeline_run", pipeline = %self.name, num_steps = self.steps.len());
    self.run_steps(ctx_data).instrument(span).await
  }

  async fn run_steps(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      // Guard dropped before any handler runs.
      let skip = {
        let data = ctx_data.read();
        step_def.should_skip(&data)
      };
      if skip {
        event!(Level::DEBUG, step_name, "Step skipped by condition.");
        continue;
      }

      let hooks = match self.hooks.get(step_name) {
        Some(hooks) if !hooks.is_empty() => hooks,
        _ if step_def.optional => {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(Level::ERROR, step_name, "Required step has no handlers.");
          return Err(Err::from(FlowError::HandlerMissing {
            pipeline: self.name.clone(),
            step_name: step_name.to_string(),
          }));
        }
      };

      let step_span = info_span!("pipeline_step", step_name, step_index = step_idx);
      let control = async {
        for (phase, handlers) in [("before", &hooks.before), ("on", &hooks.on), ("after", &hooks.after)] {
          if let PipelineControl::Stop = run_phase(phase, handlers, &ctx_data).await? {
            return Ok::<_, Err>(PipelineControl::Stop);
          }
        }
        Ok(PipelineControl::Continue)
      }
      .instrument(step_span)
      .await?;

      if control == PipelineControl::Stop {
        event!(Level::INFO, step_name, "Pipeline stopped.");
        return Ok(PipelineResult::Stopped);
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => {
        event!(Level::DEBUG, phase, handler_idx, "Handler requested stop.");
        return Ok(PipelineControl::Stop);
      }
      Err(e) => {
        event!(Level::ERROR, phase, handler_idx, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}
