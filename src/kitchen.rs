use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{validate_pool_size, validate_simulation_speed, KitchenConfig};
use crate::error::Result;
use crate::progress::{ProgressBoard, ProgressEvent, ProgressPublisher, RecipeProgress};
use crate::scheduler::{Recipe, RecipeQueue};
use crate::station::{
    Roster, SimulatedExecutor, Station, StationContext, StationReport, StepExecutor,
};

/// State owned by a running kitchen. Dropped on `stop()`.
struct KitchenRun {
    ctx: StationContext,
    stations: Vec<JoinHandle<StationReport>>,
}

/// Pool orchestrator: owns the recipe queue, the desired station count,
/// the cancellation token and the running stations.
///
/// A kitchen is either idle or running one batch of recipes. Progress is
/// published on the channel returned by [`Kitchen::new`] and mirrored into
/// an internal board that backs [`Kitchen::is_all_complete`].
pub struct Kitchen {
    board: Arc<RwLock<ProgressBoard>>,
    events_tx: mpsc::UnboundedSender<ProgressEvent>,
    executor: Arc<dyn StepExecutor>,
    live: Arc<watch::Sender<usize>>,
    run: Option<KitchenRun>,
}

impl Kitchen {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        Self::with_executor(Arc::new(SimulatedExecutor))
    }

    pub fn with_executor(
        executor: Arc<dyn StepExecutor>,
    ) -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (live, _) = watch::channel(0);

        let kitchen = Self {
            board: Arc::new(RwLock::new(ProgressBoard::new())),
            events_tx,
            executor,
            live: Arc::new(live),
            run: None,
        };

        (kitchen, events_rx)
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Desired number of stations, or `None` while idle.
    pub fn pool_size(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.ctx.roster.desired())
    }

    /// Number of stations that have not terminated yet.
    pub fn live_stations(&self) -> usize {
        *self.live.borrow()
    }

    /// Start cooking `recipes` with `pool_size` stations.
    ///
    /// Starting an already running kitchen is a no-op. A kitchen stays
    /// running after its backlog drains, so call [`Kitchen::stop`] before
    /// starting the next batch. Configuration errors are returned before any
    /// station is spawned.
    pub fn start(
        &mut self,
        recipes: Vec<Arc<Recipe>>,
        pool_size: usize,
        simulation_speed: f64,
    ) -> Result<()> {
        if self.run.is_some() {
            tracing::warn!("Kitchen already running, ignoring start request");
            return Ok(());
        }
        validate_pool_size(pool_size)?;
        validate_simulation_speed(simulation_speed)?;

        let recipe_count = recipes.len();
        let ctx = StationContext {
            queue: Arc::new(RecipeQueue::new(recipes)),
            roster: Arc::new(Roster::staffed(pool_size)),
            cancel: CancellationToken::new(),
            simulation_speed,
            publisher: ProgressPublisher::new(self.board.clone(), self.events_tx.clone()),
            executor: self.executor.clone(),
        };

        let stations = (1..=pool_size)
            .map(|ordinal| spawn_station(&self.live, &ctx, ordinal))
            .collect();
        self.run = Some(KitchenRun { ctx, stations });

        tracing::info!(
            recipes = recipe_count,
            pool_size,
            simulation_speed,
            "Kitchen started"
        );
        Ok(())
    }

    pub fn start_with_config(
        &mut self,
        recipes: Vec<Arc<Recipe>>,
        config: &KitchenConfig,
    ) -> Result<()> {
        self.start(recipes, config.pool_size, config.simulation_speed)
    }

    /// Change the number of stations while running.
    ///
    /// Growing spawns the missing stations right away. Shrinking only lowers
    /// the desired size: stations above it finish their current recipe and
    /// then retire on their own.
    pub fn resize(&mut self, new_size: usize) -> Result<()> {
        validate_pool_size(new_size)?;

        let Some(run) = self.run.as_mut() else {
            tracing::warn!(new_size, "Kitchen is idle, ignoring resize request");
            return Ok(());
        };

        let (current, hired) = run.ctx.roster.resize(new_size);
        if new_size < current {
            tracing::info!(from = current, to = new_size, "Shrinking station pool");
        } else if new_size > current {
            tracing::info!(
                from = current,
                to = new_size,
                hired = hired.len(),
                "Growing station pool"
            );
        }
        for ordinal in hired {
            run.stations.push(spawn_station(&self.live, &run.ctx, ordinal));
        }
        Ok(())
    }

    /// Cancel the run, wait for every station and return to idle.
    ///
    /// All progress state is discarded. Returns one report per station that
    /// took part in the run, ordered by ordinal.
    pub async fn stop(&mut self) -> Vec<StationReport> {
        let Some(run) = self.run.take() else {
            return Vec::new();
        };

        tracing::info!("Stopping kitchen");
        run.ctx.cancel.cancel();

        let mut reports = Vec::with_capacity(run.stations.len());
        for handle in run.stations {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "Station task ended abnormally"),
            }
        }
        reports.sort_by_key(|r| r.ordinal);

        self.board.write().await.clear();
        tracing::info!(stations = reports.len(), "Kitchen stopped");
        reports
    }

    /// True iff every tracked progress record is completed.
    pub async fn is_all_complete(&self) -> bool {
        self.board.read().await.is_all_complete()
    }

    /// Copy of every tracked progress record, in creation order.
    pub async fn snapshot(&self) -> Vec<RecipeProgress> {
        self.board.read().await.records().to_vec()
    }

    /// Resolve once every station of the current run has terminated.
    /// Returns immediately while idle.
    ///
    /// The kitchen is still running afterwards; [`Kitchen::stop`] collects
    /// the station reports and returns it to idle.
    pub async fn wait_finished(&self) {
        if self.run.is_none() {
            return;
        }
        let mut live = self.live.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = live.wait_for(|count| *count == 0).await;
    }
}

fn spawn_station(
    live: &Arc<watch::Sender<usize>>,
    ctx: &StationContext,
    ordinal: usize,
) -> JoinHandle<StationReport> {
    let station = Station::new(ordinal, ctx.clone());
    let guard = LiveGuard::enter(live.clone());
    tokio::spawn(async move {
        let _guard = guard;
        station.run().await
    })
}

impl Drop for Kitchen {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.ctx.cancel.cancel();
        }
    }
}

/// Counts a station as live for as long as its task exists.
struct LiveGuard(Arc<watch::Sender<usize>>);

impl LiveGuard {
    fn enter(live: Arc<watch::Sender<usize>>) -> Self {
        live.send_modify(|count| *count += 1);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}
