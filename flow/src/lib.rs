// flow/src/lib.rs

//! Step pipelines for the Musicaa storefront.
//!
//! A [`Pipeline`] is an ordered list of named steps operating on a shared
//! [`ContextData`]. Each step can carry `before`, `on` and `after` handlers,
//! can be optional, and can be skipped by a predicate over the context.
//! Any handler may stop the run early with [`PipelineControl::Stop`].
//!
//! The [`FlowRegistry`] keeps one pipeline per context type so that HTTP
//! handlers only need to build a context and call `registry.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{Handler, HandlerFuture};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
