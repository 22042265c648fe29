//! Observability infrastructure for the spend simulator
//!
//! Provides:
//! - Prometheus metrics (tick latency, active simulations, spend, alerts)
//! - Structured logging of simulation and budget events with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SpendMetricsInner> = OnceLock::new();

struct SpendMetricsInner {
    tick_latency_seconds: Histogram,
    ticks_emitted: IntCounter,
    active_simulations: IntGauge,
    current_spend_dollars: Gauge,
    budget_used_percent: Gauge,
    alerts_emitted: IntCounterVec,
    callback_panics: IntCounter,
}

impl SpendMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "gpu_spend_tick_latency_seconds",
                "Time spent computing and delivering one simulation tick",
                TICK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            ticks_emitted: register_int_counter!(
                "gpu_spend_ticks_emitted_total",
                "Total number of live cost updates emitted"
            )
            .expect("Failed to register ticks_emitted"),

            active_simulations: register_int_gauge!(
                "gpu_spend_active_simulations",
                "Number of experiments currently being simulated"
            )
            .expect("Failed to register active_simulations"),

            current_spend_dollars: register_gauge!(
                "gpu_spend_current_spend_dollars",
                "Sum of the latest cost of all tracked experiments"
            )
            .expect("Failed to register current_spend_dollars"),

            budget_used_percent: register_gauge!(
                "gpu_spend_budget_used_percent",
                "Share of the monthly budget used at the last budget check"
            )
            .expect("Failed to register budget_used_percent"),

            alerts_emitted: register_int_counter_vec!(
                "gpu_spend_budget_alerts_total",
                "Budget alerts recorded, by kind",
                &["kind"]
            )
            .expect("Failed to register budget_alerts"),

            callback_panics: register_int_counter!(
                "gpu_spend_callback_panics_total",
                "Subscriber callbacks that panicked and were isolated"
            )
            .expect("Failed to register callback_panics"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics
///
/// Multiple handles share the same underlying metrics.
#[derive(Clone)]
pub struct SpendMetrics {
    _private: (),
}

impl Default for SpendMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpendMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpendMetrics").finish()
    }
}

impl SpendMetrics {
    /// Create a metrics handle (registers the metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SpendMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SpendMetricsInner {
        GLOBAL_METRICS.get_or_init(SpendMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn inc_ticks_emitted(&self) {
        self.inner().ticks_emitted.inc();
    }

    pub fn set_active_simulations(&self, count: i64) {
        self.inner().active_simulations.set(count);
    }

    pub fn set_current_spend(&self, dollars: f64) {
        self.inner().current_spend_dollars.set(dollars);
    }

    pub fn set_budget_used_percent(&self, percent: f64) {
        self.inner().budget_used_percent.set(percent);
    }

    pub fn inc_alerts(&self, kind: &str) {
        self.inner().alerts_emitted.with_label_values(&[kind]).inc();
    }

    pub fn inc_callback_panics(&self) {
        self.inner().callback_panics.inc();
    }
}

/// Structured logger for dashboard events
///
/// Emits consistent `event = "..."` records for simulation lifecycle and
/// budget notifications.
#[derive(Clone)]
pub struct StructuredLogger {
    session: String,
}

impl StructuredLogger {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Log dashboard startup
    pub fn log_startup(&self, version: &str, running_experiments: usize, monthly_budget: f64) {
        info!(
            event = "dashboard_started",
            session = %self.session,
            version = %version,
            running_experiments = running_experiments,
            monthly_budget = monthly_budget,
            "GPU spend dashboard started"
        );
    }

    /// Log dashboard shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            session = %self.session,
            reason = %reason,
            "GPU spend dashboard shutting down"
        );
    }

    /// Log a simulation stream starting
    pub fn log_simulation_started(&self, experiment_id: &str, cost_per_hour: f64, base_cost: f64) {
        info!(
            event = "simulation_started",
            session = %self.session,
            experiment_id = %experiment_id,
            cost_per_hour = cost_per_hour,
            base_cost = base_cost,
            "Live cost simulation started"
        );
    }

    /// Log a recorded budget alert
    pub fn log_budget_alert(&self, kind: &str, message: &str, current_spend: f64, budget: f64) {
        match kind {
            "critical" | "exceeded" => {
                warn!(
                    event = "budget_alert",
                    session = %self.session,
                    kind = %kind,
                    current_spend = current_spend,
                    monthly_budget = budget,
                    "{}",
                    message
                );
            }
            _ => {
                info!(
                    event = "budget_alert",
                    session = %self.session,
                    kind = %kind,
                    current_spend = current_spend,
                    monthly_budget = budget,
                    "{}",
                    message
                );
            }
        }
    }

    /// Log an experiment completing with its final cost
    pub fn log_experiment_completed(&self, experiment_id: &str, final_cost: f64) {
        info!(
            event = "experiment_completed",
            session = %self.session,
            experiment_id = %experiment_id,
            final_cost = final_cost,
            "Experiment completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_metrics_creation() {
        // Metrics live in the global Prometheus registry; repeated handles share them
        let metrics = SpendMetrics::new();
        let again = SpendMetrics::new();

        metrics.observe_tick_latency(0.0001);
        metrics.inc_ticks_emitted();
        metrics.set_active_simulations(3);
        again.set_current_spend(1234.5);
        again.set_budget_used_percent(42.0);
        metrics.inc_alerts("warning");
        metrics.inc_callback_panics();

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "gpu_spend_ticks_emitted_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("session-1");
        assert_eq!(logger.session(), "session-1");
        logger.log_budget_alert("warning", "You've used 80% of your monthly GPU budget", 40_000.0, 50_000.0);
    }
}
