//! Sequential table-driven pipeline execution framework.
//!
//! ## Architecture
//!
//! ```text
//! Pipeline → Steps
//!
//! - Pipeline: ordered list of steps built from an ExecutionPlan
//! - Step: atomic unit of work over a shared context
//! ```
//!
//! Each step's filesystem output is the exact input to the next, so
//! execution is strictly sequential: the executor runs steps in plan order
//! and aborts on the first error. There are no retries and no partial
//! success; a failed step leaves its work uncommitted.
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineBuilder, PipelineExecutor};
//!
//! let plan = ExecutionPlan::new(vec![Box::new(StepA), Box::new(StepB)]);
//! let pipeline = PipelineBuilder::from_plan(plan);
//! let metrics = PipelineExecutor::execute(pipeline, ctx).await?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod executor;
mod metrics;
mod step;

pub use executor::{ExecutionPlan, Pipeline, PipelineBuilder, PipelineExecutor};
pub use metrics::{PipelineMetrics, StepMetrics};
pub use step::{BoxedStep, BuildStep};
