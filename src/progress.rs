//! Progress tracking for recipe runs.
//!
//! Stations own the [`RecipeProgress`] of the recipe they are cooking and are
//! its only writer. Every change is published as an immutable
//! [`ProgressEvent`]; observers fold the stream into a [`ProgressBoard`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl ProgressStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProgressStatus::Completed | ProgressStatus::Cancelled | ProgressStatus::Failed
        )
    }

    /// Statuses only move forward: Pending -> InProgress -> terminal.
    pub fn can_transition_to(self, next: ProgressStatus) -> bool {
        match (self, next) {
            (ProgressStatus::Pending, ProgressStatus::InProgress) => true,
            (ProgressStatus::InProgress, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStatus::Pending => write!(f, "pending"),
            ProgressStatus::InProgress => write!(f, "in progress"),
            ProgressStatus::Completed => write!(f, "completed"),
            ProgressStatus::Cancelled => write!(f, "cancelled"),
            ProgressStatus::Failed => write!(f, "failed"),
        }
    }
}

/// State of one recipe run as seen by observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeProgress {
    pub run_id: Uuid,
    pub recipe_name: String,
    pub station: usize,
    pub percent: f64,
    pub status: ProgressStatus,
    pub current_step: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RecipeProgress {
    pub fn new(recipe_name: impl Into<String>, station: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            recipe_name: recipe_name.into(),
            station,
            percent: 0.0,
            status: ProgressStatus::Pending,
            current_step: String::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn start(&mut self, first_step: impl Into<String>) -> bool {
        if !self.transition(ProgressStatus::InProgress) {
            return false;
        }
        self.current_step = first_step.into();
        self.started_at = Some(Utc::now());
        true
    }

    /// Record `completed` of `total` steps done. Percent never goes backwards.
    pub fn advance(
        &mut self,
        completed: usize,
        total: usize,
        current_step: impl Into<String>,
    ) -> bool {
        if self.status != ProgressStatus::InProgress {
            return false;
        }
        let percent = percent_of(completed, total);
        if percent < self.percent {
            return false;
        }
        self.percent = percent;
        self.current_step = current_step.into();
        true
    }

    pub fn complete(&mut self) -> bool {
        if !self.transition(ProgressStatus::Completed) {
            return false;
        }
        self.percent = 100.0;
        true
    }

    pub fn cancel(&mut self) -> bool {
        self.transition(ProgressStatus::Cancelled)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if !self.transition(ProgressStatus::Failed) {
            return false;
        }
        self.error = Some(reason.into());
        true
    }

    fn transition(&mut self, next: ProgressStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        true
    }
}

/// Percentage of `completed` out of `total`, 0 when there is nothing to do.
pub fn percent_of(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed.min(total) as f64 / total as f64) * 100.0
}

/// Immutable progress update published by a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Created {
        run_id: Uuid,
        recipe: String,
        station: usize,
        current_step: String,
    },
    Updated {
        run_id: Uuid,
        recipe: String,
        percent: f64,
        current_step: String,
    },
    Completed {
        run_id: Uuid,
        recipe: String,
    },
    Cancelled {
        run_id: Uuid,
        recipe: String,
        percent: f64,
    },
    Failed {
        run_id: Uuid,
        recipe: String,
        reason: String,
    },
    /// A station left the pool after a shrink. It had no recipe in hand,
    /// so nothing it started is affected.
    Retracted { station: usize },
}

impl ProgressEvent {
    pub fn created(progress: &RecipeProgress) -> Self {
        ProgressEvent::Created {
            run_id: progress.run_id,
            recipe: progress.recipe_name.clone(),
            station: progress.station,
            current_step: progress.current_step.clone(),
        }
    }

    pub fn updated(progress: &RecipeProgress) -> Self {
        ProgressEvent::Updated {
            run_id: progress.run_id,
            recipe: progress.recipe_name.clone(),
            percent: progress.percent,
            current_step: progress.current_step.clone(),
        }
    }

    pub fn completed(progress: &RecipeProgress) -> Self {
        ProgressEvent::Completed {
            run_id: progress.run_id,
            recipe: progress.recipe_name.clone(),
        }
    }

    pub fn cancelled(progress: &RecipeProgress) -> Self {
        ProgressEvent::Cancelled {
            run_id: progress.run_id,
            recipe: progress.recipe_name.clone(),
            percent: progress.percent,
        }
    }

    pub fn failed(progress: &RecipeProgress) -> Self {
        ProgressEvent::Failed {
            run_id: progress.run_id,
            recipe: progress.recipe_name.clone(),
            reason: progress.error.clone().unwrap_or_default(),
        }
    }

    /// Recipe the event is about. Station-level events have none.
    pub fn recipe(&self) -> Option<&str> {
        match self {
            ProgressEvent::Created { recipe, .. }
            | ProgressEvent::Updated { recipe, .. }
            | ProgressEvent::Completed { recipe, .. }
            | ProgressEvent::Cancelled { recipe, .. }
            | ProgressEvent::Failed { recipe, .. } => Some(recipe),
            ProgressEvent::Retracted { .. } => None,
        }
    }

    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            ProgressEvent::Created { run_id, .. }
            | ProgressEvent::Updated { run_id, .. }
            | ProgressEvent::Completed { run_id, .. }
            | ProgressEvent::Cancelled { run_id, .. }
            | ProgressEvent::Failed { run_id, .. } => Some(*run_id),
            ProgressEvent::Retracted { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Created { .. } => "created",
            ProgressEvent::Updated { .. } => "updated",
            ProgressEvent::Completed { .. } => "completed",
            ProgressEvent::Cancelled { .. } => "cancelled",
            ProgressEvent::Failed { .. } => "failed",
            ProgressEvent::Retracted { .. } => "retracted",
        }
    }
}

/// Ordered collection of progress records built by applying events.
#[derive(Debug, Clone, Default)]
pub struct ProgressBoard {
    records: Vec<RecipeProgress>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the board. Returns false if the event did not
    /// match a record or would move a record backwards.
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        match event {
            ProgressEvent::Created {
                run_id,
                recipe,
                station,
                current_step,
            } => {
                if self.get(run_id).is_some() {
                    return false;
                }
                let mut record = RecipeProgress::new(recipe.clone(), *station);
                record.run_id = *run_id;
                record.start(current_step.clone());
                self.records.push(record);
                true
            }
            ProgressEvent::Updated {
                run_id,
                percent,
                current_step,
                ..
            } => self.with_record(run_id, |r| {
                if r.status != ProgressStatus::InProgress || *percent < r.percent {
                    return false;
                }
                r.percent = *percent;
                r.current_step = current_step.clone();
                true
            }),
            ProgressEvent::Completed { run_id, .. } => self.with_record(run_id, |r| r.complete()),
            ProgressEvent::Cancelled { run_id, .. } => self.with_record(run_id, |r| r.cancel()),
            ProgressEvent::Failed { run_id, reason, .. } => {
                self.with_record(run_id, |r| r.fail(reason.clone()))
            }
            // Retiring stations hold no record, so there is nothing to fold in.
            ProgressEvent::Retracted { .. } => false,
        }
    }

    pub fn get(&self, run_id: &Uuid) -> Option<&RecipeProgress> {
        self.records.iter().find(|r| r.run_id == *run_id)
    }

    pub fn records(&self) -> &[RecipeProgress] {
        &self.records
    }

    pub fn count(&self, status: ProgressStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// True when at least one record is tracked and every record is completed.
    pub fn is_all_complete(&self) -> bool {
        !self.records.is_empty()
            && self
                .records
                .iter()
                .all(|r| r.status == ProgressStatus::Completed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn with_record(&mut self, run_id: &Uuid, f: impl FnOnce(&mut RecipeProgress) -> bool) -> bool {
        match self.records.iter_mut().find(|r| r.run_id == *run_id) {
            Some(record) => f(record),
            None => false,
        }
    }
}

/// Fan-out for progress events: the kitchen's own board plus the observer channel.
#[derive(Debug, Clone)]
pub struct ProgressPublisher {
    board: Arc<RwLock<ProgressBoard>>,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressPublisher {
    pub fn new(
        board: Arc<RwLock<ProgressBoard>>,
        tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Self {
        Self { board, tx }
    }

    /// Apply the event to the board and forward it to observers.
    ///
    /// The board lock is held across the send so observers receive events in
    /// the same order the board applied them.
    pub async fn publish(&self, event: ProgressEvent) {
        let mut board = self.board.write().await;
        if !board.apply(&event) {
            tracing::debug!(
                event = event.kind(),
                recipe = event.recipe(),
                "Event did not change the board"
            );
        }
        if self.tx.send(event).is_err() {
            tracing::trace!("Progress observer dropped, event not delivered");
        }
    }
}
