//! Generic step trait for pipeline execution.

use crate::errors::BakeResult;
use async_trait::async_trait;

/// Trait for steps that can be executed in a pipeline.
///
/// Implement this trait to define custom step types for your pipeline.
/// Steps run with a shared context, which is cloned per step.
#[async_trait]
pub trait BuildStep<Ctx>: Send + Sync {
    /// Execute the step with the shared pipeline context.
    async fn run(self: Box<Self>, ctx: Ctx) -> BakeResult<()>;

    /// Get human-readable step name for logging.
    fn name(&self) -> &str;
}

pub type BoxedStep<Ctx> = Box<dyn BuildStep<Ctx>>;
