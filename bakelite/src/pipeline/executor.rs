//! Pipeline execution loop.
//!
//! Provides a table-driven pipeline executor that runs an ordered list of
//! steps against a shared context and records per-step timing.

use super::metrics::{PipelineMetrics, StepMetrics};
use super::step::BoxedStep;
use crate::errors::BakeResult;
use std::time::Instant;

pub struct ExecutionPlan<Ctx> {
    steps: Vec<BoxedStep<Ctx>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(steps: Vec<BoxedStep<Ctx>>) -> Self {
        Self { steps }
    }

    pub fn steps(self) -> Vec<BoxedStep<Ctx>> {
        self.steps
    }
}

pub struct Pipeline<Ctx> {
    steps: Vec<BoxedStep<Ctx>>,
}

impl<Ctx> Pipeline<Ctx> {
    pub fn new(steps: Vec<BoxedStep<Ctx>>) -> Self {
        Self { steps }
    }
}

pub struct PipelineBuilder;

impl PipelineBuilder {
    pub fn from_plan<Ctx>(plan: ExecutionPlan<Ctx>) -> Pipeline<Ctx> {
        Pipeline::new(plan.steps())
    }
}

/// Pipeline executor framework.
///
/// This provides the generic infrastructure for executing a table-driven
/// pipeline. The actual work is provided by step implementations.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a pipeline.
    ///
    /// Iterates through steps in order and stops at the first failure,
    /// surfacing that step's error unchanged.
    ///
    /// Generic over:
    /// - `Ctx`: Shared pipeline context (use interior mutability for writes)
    pub async fn execute<Ctx>(pipeline: Pipeline<Ctx>, ctx: Ctx) -> BakeResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut step_metrics = Vec::new();

        for (index, step) in pipeline.steps.into_iter().enumerate() {
            let name = step.name().to_string();
            let step_start = Instant::now();

            tracing::debug!(step = %name, index, "Executing pipeline step");
            step.run(ctx.clone()).await?;

            step_metrics.push(StepMetrics {
                index,
                name,
                duration_ms: step_start.elapsed().as_millis(),
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            steps: step_metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BakeError;
    use crate::pipeline::BuildStep;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Record(&'static str);

    #[async_trait]
    impl BuildStep<Log> for Record {
        async fn run(self: Box<Self>, ctx: Log) -> BakeResult<()> {
            ctx.lock().push(self.0);
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct Fail;

    #[async_trait]
    impl BuildStep<Log> for Fail {
        async fn run(self: Box<Self>, _ctx: Log) -> BakeResult<()> {
            Err(BakeError::Internal("boom".into()))
        }

        fn name(&self) -> &str {
            "fail"
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_plan_order() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let plan = ExecutionPlan::new(vec![
            Box::new(Record("one")) as BoxedStep<Log>,
            Box::new(Record("two")),
            Box::new(Record("three")),
        ]);

        let metrics = PipelineExecutor::execute(PipelineBuilder::from_plan(plan), log.clone())
            .await
            .unwrap();

        assert_eq!(*log.lock(), vec!["one", "two", "three"]);
        assert_eq!(metrics.steps.len(), 3);
        assert!(metrics.step_duration_ms("two").is_some());
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let plan = ExecutionPlan::new(vec![
            Box::new(Record("one")) as BoxedStep<Log>,
            Box::new(Fail),
            Box::new(Record("never")),
        ]);

        let err = PipelineExecutor::execute(PipelineBuilder::from_plan(plan), log.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, BakeError::Internal(_)));
        assert_eq!(*log.lock(), vec!["one"]);
    }
}
