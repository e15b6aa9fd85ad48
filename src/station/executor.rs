use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::scheduler::Step;

/// Result of running one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran for its full duration.
    Done,
    /// Cancellation interrupted the wait.
    Interrupted,
}

/// Performs the work behind a single recipe step.
///
/// A step executor must return promptly with [`StepOutcome::Interrupted`]
/// once `cancel` fires. Errors are per-recipe faults: the station logs them,
/// fails the recipe and moves on.
#[async_trait]
pub trait StepExecutor: Send + Sync + std::fmt::Debug {
    async fn execute(
        &self,
        step: &Step,
        wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome>;
}

/// Simulates a step by waiting out its (scaled) duration.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor;

#[async_trait]
impl StepExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        step: &Step,
        wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome> {
        tracing::trace!(
            step = %step.description,
            wait_ms = wait.as_millis() as u64,
            "Cooking step"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(StepOutcome::Interrupted),
            _ = tokio::time::sleep(wait) => Ok(StepOutcome::Done),
        }
    }
}
