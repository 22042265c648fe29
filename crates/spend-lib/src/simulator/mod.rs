//! Live cost simulation for running experiments
//!
//! This module provides:
//! - One cancellable ticking task per running experiment, emitting
//!   [`LiveCostUpdate`] snapshots to a subscriber
//! - Tracking of the latest cost per experiment and the total current spend
//! - Budget threshold alerts with deduplication (see [`BudgetMonitor`])

mod budget;
mod tick;

pub use budget::{
    budget_percentage, BudgetAlert, BudgetAlertKind, BudgetMonitor, BudgetThresholds,
    DEFAULT_ALERT_RETENTION, DEFAULT_DEDUP_WINDOW,
};
pub use tick::{
    base_throughput, compute_tick, current_epoch, sample_throughput, sample_utilization,
    SimulationProfile, TickOutcome,
};

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, SpendError};
use crate::models::{ExperimentRecord, LiveCostUpdate};
use crate::observability::SpendMetrics;

/// Default tick period (1 second)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Receives live cost updates from a simulation stream
pub trait UpdateSink: Send + Sync + 'static {
    fn on_update(&self, update: LiveCostUpdate);
}

impl<F> UpdateSink for F
where
    F: Fn(LiveCostUpdate) + Send + Sync + 'static,
{
    fn on_update(&self, update: LiveCostUpdate) {
        self(update)
    }
}

/// Configuration for the live simulator
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Period between ticks of one experiment (default: 1 second)
    pub tick_interval: Duration,
    /// Window in which repeated alerts of one kind are suppressed (default: 5 minutes)
    pub alert_dedup_window: Duration,
    /// Age after which recorded alerts are purged (default: 1 hour)
    pub alert_retention: Duration,
    /// Budget alert thresholds in percent of budget
    pub thresholds: BudgetThresholds,
    /// Seed for reproducible telemetry noise
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            alert_dedup_window: DEFAULT_DEDUP_WINDOW,
            alert_retention: DEFAULT_ALERT_RETENTION,
            thresholds: BudgetThresholds::default(),
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(SpendError::ZeroTickInterval);
        }
        Ok(())
    }
}

/// Latest cost of one experiment and the stream allowed to update it
#[derive(Debug, Clone, Copy)]
struct CostState {
    cost: f64,
    generation: u64,
}

/// Cancellation handle of one ticking task
struct SimulationHandle {
    generation: u64,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    fn cancel(self) {
        // The task may already have exited; a closed channel is fine
        let _ = self.stop_tx.send(());
        drop(self.task);
    }
}

/// Simulates live cost, progress and telemetry for running experiments
pub struct LiveSimulator {
    config: SimulatorConfig,
    profiles: HashMap<String, SimulationProfile>,
    costs: Arc<DashMap<String, CostState>>,
    active: Mutex<HashMap<String, SimulationHandle>>,
    next_generation: AtomicU64,
    budget: BudgetMonitor,
    metrics: SpendMetrics,
}

impl LiveSimulator {
    /// Create a simulator tracking `running`, each starting at its recorded cost
    pub fn new(running: &[ExperimentRecord], config: SimulatorConfig) -> Result<Self> {
        config.validate()?;

        let profiles = running
            .iter()
            .map(|record| (record.id.clone(), SimulationProfile::from(record)))
            .collect();

        let costs = DashMap::new();
        for record in running {
            costs.insert(
                record.id.clone(),
                CostState {
                    cost: record.total_cost,
                    generation: 0,
                },
            );
        }

        let budget = BudgetMonitor::new(config.thresholds)
            .with_dedup_window(config.alert_dedup_window)
            .with_retention(config.alert_retention);

        Ok(Self {
            config,
            profiles,
            costs: Arc::new(costs),
            active: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            budget,
            metrics: SpendMetrics::new(),
        })
    }

    fn active(&self) -> MutexGuard<'_, HashMap<String, SimulationHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Ids of the running experiments this simulator knows about
    pub fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.profiles.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Begin periodic emission for `experiment_id`, replacing any active stream
    ///
    /// Unknown experiments are ignored. Must be called from within a tokio
    /// runtime; without one the call is a no-op.
    pub fn start_simulation<S>(&self, experiment_id: &str, cost_per_hour: f64, on_update: S)
    where
        S: UpdateSink,
    {
        let Some(profile) = self.profiles.get(experiment_id).cloned() else {
            debug!(experiment_id = %experiment_id, "Ignoring start for unknown experiment");
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(experiment_id = %experiment_id, "No async runtime, simulation not started");
            return;
        };

        let cost_per_hour = if cost_per_hour.is_finite() && cost_per_hour >= 0.0 {
            cost_per_hour
        } else {
            warn!(
                experiment_id = %experiment_id,
                cost_per_hour = cost_per_hour,
                "Invalid hourly cost, simulating at zero"
            );
            0.0
        };

        let mut active = self.active();
        if let Some(previous) = active.remove(experiment_id) {
            debug!(
                experiment_id = %experiment_id,
                generation = previous.generation,
                "Replacing active simulation"
            );
            previous.cancel();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let base_cost = {
            let mut state = self
                .costs
                .entry(experiment_id.to_string())
                .or_insert(CostState {
                    cost: 0.0,
                    generation,
                });
            state.generation = generation;
            state.cost
        };

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ generation),
            None => StdRng::from_os_rng(),
        };

        let stream = SimulationStream {
            profile,
            base_cost,
            cost_per_hour,
            generation,
            tick_interval: self.config.tick_interval,
            costs: Arc::clone(&self.costs),
            rng,
            sink: on_update,
            metrics: self.metrics.clone(),
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = runtime.spawn(stream.run(stop_rx));

        active.insert(
            experiment_id.to_string(),
            SimulationHandle {
                generation,
                stop_tx,
                task,
            },
        );
        self.metrics.set_active_simulations(active.len() as i64);

        info!(
            experiment_id = %experiment_id,
            cost_per_hour = cost_per_hour,
            base_cost = base_cost,
            "Started live cost simulation"
        );
    }

    /// Cancel the stream for `experiment_id`; safe to call when none is active
    pub fn stop_simulation(&self, experiment_id: &str) {
        let mut active = self.active();
        if let Some(handle) = active.remove(experiment_id) {
            handle.cancel();
            debug!(experiment_id = %experiment_id, "Stopped live cost simulation");
        }
        self.metrics.set_active_simulations(active.len() as i64);
    }

    /// Cancel every active stream
    pub fn stop_all_simulations(&self) {
        let mut active = self.active();
        let stopped = active.len();
        for (_, handle) in active.drain() {
            handle.cancel();
        }
        self.metrics.set_active_simulations(0);

        if stopped > 0 {
            info!(stopped = stopped, "Stopped all live cost simulations");
        }
    }

    pub fn is_active(&self, experiment_id: &str) -> bool {
        self.active().contains_key(experiment_id)
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    /// Latest computed cost for an experiment, or 0 if unknown
    pub fn current_cost(&self, experiment_id: &str) -> f64 {
        self.costs
            .get(experiment_id)
            .map(|state| state.cost)
            .unwrap_or(0.0)
    }

    /// Sum of the latest cost of every tracked experiment
    pub fn total_current_spend(&self) -> f64 {
        self.costs.iter().map(|entry| entry.value().cost).sum()
    }

    /// Stop emission and report the last known cost
    pub fn complete_experiment<F>(&self, experiment_id: &str, on_complete: F)
    where
        F: FnOnce(f64),
    {
        self.stop_simulation(experiment_id);
        let final_cost = self.current_cost(experiment_id);

        if catch_unwind(AssertUnwindSafe(|| on_complete(final_cost))).is_err() {
            warn!(experiment_id = %experiment_id, "Completion callback panicked");
            self.metrics.inc_callback_panics();
        }
    }

    /// Evaluate spend against the monthly budget, alerting at most once per
    /// kind within the dedup window
    pub fn check_budget_alerts<F>(
        &self,
        current_spend: f64,
        monthly_budget: f64,
        on_alert: F,
    ) -> Option<BudgetAlert>
    where
        F: FnOnce(&BudgetAlert),
    {
        self.budget
            .check_budget_alerts(current_spend, monthly_budget, on_alert)
    }

    /// Recorded alerts, most recent first
    pub fn alerts(&self) -> Vec<BudgetAlert> {
        self.budget.alerts()
    }

    /// Purge alerts older than the retention window
    pub fn clear_old_alerts(&self) -> usize {
        self.budget.clear_old_alerts()
    }

    pub fn budget(&self) -> &BudgetMonitor {
        &self.budget
    }
}

impl Drop for LiveSimulator {
    fn drop(&mut self) {
        self.stop_all_simulations();
    }
}

/// State owned by one ticking task
struct SimulationStream<S> {
    profile: SimulationProfile,
    base_cost: f64,
    cost_per_hour: f64,
    generation: u64,
    tick_interval: Duration,
    costs: Arc<DashMap<String, CostState>>,
    rng: StdRng,
    sink: S,
    metrics: SpendMetrics,
}

impl<S: UpdateSink> SimulationStream<S> {
    async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) {
        let started = Instant::now();
        let mut ticker = interval_at(started + self.tick_interval, self.tick_interval);
        // Late ticks are dropped, never queued
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let elapsed_hours = started.elapsed().as_secs_f64() / 3600.0;
                    self.tick(elapsed_hours);
                }
            }
        }

        debug!(
            experiment_id = %self.profile.experiment_id,
            generation = self.generation,
            "Simulation stream ended"
        );
    }

    fn tick(&mut self, elapsed_hours: f64) {
        let tick_start = std::time::Instant::now();

        let outcome = compute_tick(
            &self.profile,
            self.base_cost,
            self.cost_per_hour,
            elapsed_hours,
            &mut self.rng,
        );

        // Only the current stream for this id may publish its cost
        if let Some(mut state) = self.costs.get_mut(&self.profile.experiment_id) {
            if state.generation == self.generation {
                state.cost = outcome.raw_cost;
            }
        }

        let sink = &self.sink;
        let update = outcome.update;
        if catch_unwind(AssertUnwindSafe(|| sink.on_update(update))).is_err() {
            warn!(
                experiment_id = %self.profile.experiment_id,
                "Live update callback panicked"
            );
            self.metrics.inc_callback_panics();
        }

        self.metrics.inc_ticks_emitted();
        self.metrics
            .set_current_spend(self.costs.iter().map(|e| e.value().cost).sum());
        self.metrics
            .observe_tick_latency(tick_start.elapsed().as_secs_f64());
    }
}
