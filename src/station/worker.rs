use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{KitchenError, Result};
use crate::progress::{ProgressEvent, ProgressPublisher, RecipeProgress};
use crate::scheduler::{Recipe, RecipeQueue};
use crate::station::executor::{StepExecutor, StepOutcome};
use crate::station::roster::Roster;

/// Everything a station shares with the kitchen that spawned it.
#[derive(Debug, Clone)]
pub struct StationContext {
    pub queue: Arc<RecipeQueue>,
    /// Desired pool size. Stations numbered above it retire.
    pub roster: Arc<Roster>,
    pub cancel: CancellationToken,
    pub simulation_speed: f64,
    pub publisher: ProgressPublisher,
    pub executor: Arc<dyn StepExecutor>,
}

/// Why a station stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationExit {
    /// The queue ran dry.
    Exhausted,
    /// The run was cancelled.
    Cancelled,
    /// The pool shrank below this station's ordinal.
    Retired,
}

impl std::fmt::Display for StationExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StationExit::Exhausted => write!(f, "exhausted"),
            StationExit::Cancelled => write!(f, "cancelled"),
            StationExit::Retired => write!(f, "retired"),
        }
    }
}

/// Summary returned by a station when it terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationReport {
    pub ordinal: usize,
    pub exit: StationExit,
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StationReport {
    fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            exit: StationExit::Exhausted,
            completed: 0,
            cancelled: 0,
            failed: 0,
            skipped: 0,
        }
    }
}

enum RecipeOutcome {
    Completed,
    Cancelled,
}

/// One kitchen station: pulls recipes off the shared queue and cooks them
/// one at a time until the queue is empty, the run is cancelled, or the
/// pool shrinks below its ordinal.
#[derive(Debug)]
pub struct Station {
    ordinal: usize,
    ctx: StationContext,
}

impl Station {
    pub fn new(ordinal: usize, ctx: StationContext) -> Self {
        Self { ordinal, ctx }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Station main loop.
    ///
    /// Cancellation is checked before every dequeue, again before a record
    /// is created, and before and during every step. A station above the
    /// desired pool size finishes whatever it is cooking, then retires before
    /// it takes another recipe, leaving the backlog to the remaining stations.
    pub async fn run(self) -> StationReport {
        let mut report = StationReport::new(self.ordinal);
        tracing::info!(station = self.ordinal, "Station opened");

        report.exit = loop {
            if self.ctx.cancel.is_cancelled() {
                break StationExit::Cancelled;
            }

            if self.ctx.roster.should_retire(self.ordinal) {
                self.ctx
                    .publisher
                    .publish(ProgressEvent::Retracted { station: self.ordinal })
                    .await;
                tracing::info!(station = self.ordinal, "Pool shrank, station retired");
                break StationExit::Retired;
            }

            let Some(recipe) = self.ctx.queue.try_dequeue() else {
                break StationExit::Exhausted;
            };

            if self.ctx.cancel.is_cancelled() {
                tracing::debug!(
                    station = self.ordinal,
                    recipe = %recipe.name,
                    "Run cancelled before recipe started"
                );
                break StationExit::Cancelled;
            }

            if let Err(e) = Self::claim(&recipe) {
                tracing::warn!(station = self.ordinal, error = %e, "Skipping recipe");
                report.skipped += 1;
                continue;
            }

            let mut progress = RecipeProgress::new(recipe.name.clone(), self.ordinal);
            progress.start(recipe.steps[0].description.clone());
            self.ctx
                .publisher
                .publish(ProgressEvent::created(&progress))
                .await;
            tracing::info!(
                station = self.ordinal,
                recipe = %recipe.name,
                run_id = %progress.run_id,
                steps = recipe.steps.len(),
                "Cooking recipe"
            );

            match self.cook(&recipe, &mut progress).await {
                Ok(RecipeOutcome::Completed) => {
                    recipe.mark_completed();
                    progress.complete();
                    self.ctx
                        .publisher
                        .publish(ProgressEvent::completed(&progress))
                        .await;
                    report.completed += 1;
                    tracing::info!(
                        station = self.ordinal,
                        recipe = %recipe.name,
                        "Recipe completed"
                    );
                }
                Ok(RecipeOutcome::Cancelled) => {
                    progress.cancel();
                    self.ctx
                        .publisher
                        .publish(ProgressEvent::cancelled(&progress))
                        .await;
                    report.cancelled += 1;
                    tracing::info!(
                        station = self.ordinal,
                        recipe = %recipe.name,
                        percent = progress.percent,
                        "Recipe cancelled"
                    );
                }
                Err(e) => {
                    progress.fail(e.to_string());
                    self.ctx
                        .publisher
                        .publish(ProgressEvent::failed(&progress))
                        .await;
                    report.failed += 1;
                    tracing::error!(
                        station = self.ordinal,
                        recipe = %recipe.name,
                        error = %e,
                        "Recipe failed"
                    );
                }
            }
        };

        if report.exit != StationExit::Retired {
            self.ctx.roster.sign_off(self.ordinal);
        }
        tracing::info!(
            station = self.ordinal,
            exit = %report.exit,
            completed = report.completed,
            "Station closed"
        );
        report
    }

    /// Validate a freshly dequeued recipe and mark it active for this run.
    fn claim(recipe: &Recipe) -> Result<()> {
        if let Some(reason) = recipe.validation_error() {
            return Err(KitchenError::InvalidRecipe {
                recipe: recipe.name.clone(),
                reason: reason.to_string(),
            });
        }
        if !recipe.try_activate() {
            return Err(KitchenError::RecipeAlreadyActive(recipe.name.clone()));
        }
        Ok(())
    }

    async fn cook(
        &self,
        recipe: &Recipe,
        progress: &mut RecipeProgress,
    ) -> Result<RecipeOutcome> {
        let total = recipe.steps.len();

        for (index, step) in recipe.steps.iter().enumerate() {
            if self.ctx.cancel.is_cancelled() {
                return Ok(RecipeOutcome::Cancelled);
            }

            let wait = step
                .wait_duration(self.ctx.simulation_speed)
                .map_err(|e| KitchenError::StepFailed {
                    recipe: recipe.name.clone(),
                    step: index + 1,
                    reason: format!("{}s cannot be scheduled: {}", step.duration_secs, e),
                })?;
            match self
                .ctx
                .executor
                .execute(step, wait, &self.ctx.cancel)
                .await?
            {
                StepOutcome::Interrupted => return Ok(RecipeOutcome::Cancelled),
                StepOutcome::Done => {}
            }

            if !recipe.complete_step(index) {
                return Err(KitchenError::StepFailed {
                    recipe: recipe.name.clone(),
                    step: index + 1,
                    reason: "an earlier step is still open".to_string(),
                });
            }

            let current = recipe
                .steps
                .get(index + 1)
                .unwrap_or(step)
                .description
                .clone();
            progress.advance(index + 1, total, current);
            self.ctx
                .publisher
                .publish(ProgressEvent::updated(progress))
                .await;
        }

        Ok(RecipeOutcome::Completed)
    }
}
