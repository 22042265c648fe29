//! Live dashboard: simulated running costs with budget alerts

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use spend_lib::dashboard::{BudgetLevel, DashboardState};
use spend_lib::format::{format_currency, format_percent, EfficiencyRating};
use spend_lib::generator::ExperimentCatalog;
use spend_lib::health::{components, HealthRegistry};
use spend_lib::models::{ExperimentRecord, LiveCostUpdate};
use spend_lib::observability::{SpendMetrics, StructuredLogger};
use spend_lib::simulator::{budget_percentage, BudgetAlert, BudgetThresholds, LiveSimulator};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::api;
use crate::config::DashboardConfig;
use crate::output::{self, color_alert, color_budget_bar, color_utilization, OutputFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ticks between purges of expired alerts
const ALERT_PURGE_EVERY: u64 = 60;

#[derive(Debug, Default)]
pub struct LiveOptions {
    /// Stop after this many seconds; run until Ctrl-C when unset
    pub duration_secs: Option<u64>,
    /// Overrides the configured monthly budget
    pub budget: Option<f64>,
}

#[derive(Tabled)]
struct LiveRow {
    #[tabled(rename = "Experiment")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Epoch")]
    epoch: String,
    #[tabled(rename = "GPU Util")]
    utilization: String,
    #[tabled(rename = "Throughput")]
    throughput: String,
    #[tabled(rename = "ETA")]
    eta: String,
}

/// Final state of a live session, for JSON output
#[derive(Serialize)]
struct LiveSummary<'a> {
    base_spend: f64,
    running_spend: f64,
    current_total_spend: f64,
    monthly_budget: f64,
    budget_used_percent: f64,
    updates: Vec<&'a LiveCostUpdate>,
    alerts: Vec<BudgetAlert>,
}

/// Everything the render loop needs for one session
struct LiveSession<'a> {
    catalog: &'a ExperimentCatalog,
    simulator: Arc<LiveSimulator>,
    state: DashboardState,
    thresholds: BudgetThresholds,
    health: HealthRegistry,
    logger: StructuredLogger,
    format: OutputFormat,
    ticks: u64,
    /// Experiments that reached their planned duration
    completed: HashSet<String>,
}

pub async fn run_live(
    catalog: &ExperimentCatalog,
    config: &DashboardConfig,
    options: LiveOptions,
    format: OutputFormat,
) -> Result<()> {
    let budget = options.budget.unwrap_or(config.monthly_budget);
    let simulator_config = config.simulator_config()?;
    let thresholds = simulator_config.thresholds;

    let simulator = Arc::new(
        LiveSimulator::new(catalog.running(), simulator_config)
            .context("Failed to create live simulator")?,
    );
    let state = DashboardState::new(catalog.total_spend(), budget)
        .context("Failed to initialize dashboard")?;

    let logger = StructuredLogger::new(format!("live-{}", Utc::now().timestamp_millis()));
    logger.log_startup(VERSION, catalog.running().len(), budget);

    let health = HealthRegistry::new();
    health.register(components::SIMULATOR).await;
    health.register(components::BUDGET_MONITOR).await;

    let api_handle = config.metrics_port.map(|port| {
        let app_state = Arc::new(api::AppState::new(health.clone(), SpendMetrics::new()));
        tokio::spawn(api::serve(port, app_state))
    });

    let mut session = LiveSession {
        catalog,
        simulator,
        state,
        thresholds,
        health,
        logger,
        format,
        ticks: 0,
        completed: HashSet::new(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<LiveCostUpdate>();
    session.start_streams(&tx);
    drop(tx);

    session.report_simulator_health().await;
    session.health.set_ready(true).await;
    session.render_header();

    let deadline = options
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let stop_at_deadline = async move {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(stop_at_deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let reason = loop {
        tokio::select! {
            _ = &mut ctrl_c => break "interrupted",
            _ = &mut stop_at_deadline => break "duration elapsed",
            update = rx.recv() => match update {
                Some(update) => session.on_update(update).await,
                None => break "no active simulations",
            },
        }
    };

    session.shutdown(reason).await;
    session.render_summary()?;

    if let Some(handle) = api_handle {
        handle.abort();
    }

    info!(reason = %reason, ticks = session.ticks, "Live dashboard stopped");
    Ok(())
}

impl<'a> LiveSession<'a> {
    /// Start one stream per simulated experiment, forwarding ticks to `tx`
    fn start_streams(&self, tx: &mpsc::UnboundedSender<LiveCostUpdate>) {
        for id in self.simulator.running_ids() {
            let Some(record) = self.catalog.get_running(&id) else {
                continue;
            };
            let tx = tx.clone();
            let base_cost = self.simulator.current_cost(&id);
            self.simulator.start_simulation(&id, record.cost_per_hour, move |update: LiveCostUpdate| {
                // The receiver is gone only during shutdown
                let _ = tx.send(update);
            });
            self.logger.log_simulation_started(&id, record.cost_per_hour, base_cost);
        }
    }

    /// Completed experiments are no longer expected to stream
    async fn report_simulator_health(&self) {
        let expected = self
            .simulator
            .running_ids()
            .len()
            .saturating_sub(self.completed.len());
        self.health
            .report_simulations(self.simulator.active_count(), expected)
            .await;
    }

    async fn shutdown(&self, reason: &str) {
        self.simulator.stop_all_simulations();
        self.health.report_simulations_stopped(reason).await;
        self.logger.log_shutdown(reason);
    }

    async fn on_update(&mut self, update: LiveCostUpdate) {
        self.ticks += 1;
        let catalog: &'a ExperimentCatalog = self.catalog;
        let record = catalog.get_running(&update.experiment_id);
        self.state.apply(update.clone());

        let spend = self.state.current_total_spend();
        let budget = self.state.monthly_budget();
        let logger = &self.logger;
        let alert = self.simulator.check_budget_alerts(spend, budget, |alert| {
            logger.log_budget_alert(alert.kind.as_str(), &alert.message, alert.current_spend, alert.budget_limit);
        });
        self.health
            .report_budget(budget_percentage(spend, budget), &self.thresholds)
            .await;

        if self.ticks % ALERT_PURGE_EVERY == 0 {
            self.simulator.clear_old_alerts();
        }

        self.render_update(&update, record, alert.as_ref());

        if let Some(record) = record {
            if update.elapsed_hours >= record.duration_hours {
                self.complete(record).await;
            }
        }
    }

    async fn complete(&mut self, record: &ExperimentRecord) {
        let logger = &self.logger;
        self.simulator.complete_experiment(&record.id, |final_cost| {
            logger.log_experiment_completed(&record.id, final_cost);
        });
        self.completed.insert(record.id.clone());
        self.report_simulator_health().await;
        debug!(experiment_id = %record.id, "Experiment reached its planned duration");
    }

    fn render_header(&self) {
        if self.format != OutputFormat::Table {
            return;
        }

        output::print_heading("GPU Spend Intelligence", '=');
        println!(
            "Total spend (30 days):  {}",
            format_currency(self.state.base_spend()).bold()
        );
        println!(
            "Running experiments:    {}",
            self.catalog.running().len().to_string().cyan()
        );

        if let Some(avg_cost) = self.catalog.average_completed_cost() {
            println!("Avg cost per run:       {}", format_currency(avg_cost));
        }
        if let Some(avg_util) = self.catalog.average_completed_utilization() {
            let rating = EfficiencyRating::from_utilization(avg_util);
            println!(
                "Avg GPU utilization:    {} ({} efficiency)",
                color_utilization(avg_util),
                rating.label()
            );
        }

        self.render_budget();
        println!();
    }

    fn render_budget(&self) {
        let used = self.state.budget_used();
        let level = self.state.budget_level(&self.thresholds);
        println!(
            "Budget: {} ({} used)",
            format_currency(self.state.monthly_budget()),
            format_percent(used)
        );
        println!("{}", color_budget_bar(used, level));
    }

    fn render_update(
        &self,
        update: &LiveCostUpdate,
        record: Option<&ExperimentRecord>,
        alert: Option<&BudgetAlert>,
    ) {
        match self.format {
            OutputFormat::Json => {
                if let Ok(line) = serde_json::to_string(update) {
                    println!("{}", line);
                }
                if let Some(alert) = alert {
                    if let Ok(line) = serde_json::to_string(alert) {
                        println!("{}", line);
                    }
                }
            }
            OutputFormat::Table => {
                let name = record.map(|r| r.name.as_str()).unwrap_or(&update.experiment_id);
                println!(
                    "{} {:<32} {:>12}  epoch {}/{}  {}  {}  ETA {}  | total {}",
                    "●".green(),
                    name,
                    format_currency(update.current_cost).bold(),
                    update.current_epoch,
                    update.total_epochs,
                    color_utilization(update.gpu_utilization),
                    update.throughput.dimmed(),
                    update.estimated_time_remaining,
                    format_currency(self.state.current_total_spend())
                );

                if let Some(alert) = alert {
                    output::print_warning(&color_alert(alert.kind, &alert.message));
                    if self.state.budget_level(&self.thresholds) != BudgetLevel::Normal {
                        self.render_budget();
                    }
                }
            }
        }
    }

    fn render_summary(&self) -> Result<()> {
        let alerts = self.simulator.alerts();

        match self.format {
            OutputFormat::Json => output::print_json(&LiveSummary {
                base_spend: self.state.base_spend(),
                running_spend: self.state.running_spend(),
                current_total_spend: self.state.current_total_spend(),
                monthly_budget: self.state.monthly_budget(),
                budget_used_percent: self.state.budget_used(),
                updates: self.state.updates().collect(),
                alerts,
            }),
            OutputFormat::Table => {
                let names: HashMap<&str, &ExperimentRecord> = self
                    .catalog
                    .running()
                    .iter()
                    .map(|r| (r.id.as_str(), r))
                    .collect();

                println!();
                output::print_heading("Live Training Costs", '-');
                output::print_table(
                    self.state
                        .updates()
                        .map(|u| {
                            let record = names.get(u.experiment_id.as_str());
                            LiveRow {
                                name: record.map_or_else(|| u.experiment_id.clone(), |r| r.name.clone()),
                                model: record.map_or_else(String::new, |r| r.model_name.clone()),
                                cost: format_currency(u.current_cost),
                                epoch: format!("{}/{}", u.current_epoch, u.total_epochs),
                                utilization: color_utilization(u.gpu_utilization),
                                throughput: u.throughput.clone(),
                                eta: u.estimated_time_remaining.clone(),
                            }
                        })
                        .collect(),
                );

                println!(
                    "Current total spend:    {}",
                    format_currency(self.state.current_total_spend()).bold()
                );
                self.render_budget();

                if alerts.is_empty() {
                    output::print_info("No budget alerts");
                } else {
                    println!();
                    output::print_heading("Budget Alerts", '-');
                    for alert in &alerts {
                        println!(
                            "{}  {}",
                            alert.timestamp.format("%H:%M:%S").to_string().dimmed(),
                            color_alert(alert.kind, &alert.message)
                        );
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spend_lib::generator::ExperimentGenerator;
    use spend_lib::health::ComponentStatus;
    use spend_lib::simulator::SimulatorConfig;

    fn catalog() -> ExperimentCatalog {
        ExperimentCatalog::generate(&mut ExperimentGenerator::with_seed(42))
    }

    async fn session(catalog: &ExperimentCatalog) -> LiveSession<'_> {
        let config = SimulatorConfig {
            seed: Some(7),
            ..SimulatorConfig::default()
        };
        let thresholds = config.thresholds;
        let health = HealthRegistry::new();
        health.register(components::SIMULATOR).await;

        LiveSession {
            catalog,
            simulator: Arc::new(LiveSimulator::new(catalog.running(), config).unwrap()),
            state: DashboardState::new(catalog.total_spend(), 50_000.0).unwrap(),
            thresholds,
            health,
            logger: StructuredLogger::new("live-test"),
            format: OutputFormat::Json,
            ticks: 0,
            completed: HashSet::new(),
        }
    }

    async fn simulator_status(session: &LiveSession<'_>) -> ComponentStatus {
        session.health.health().await.components[components::SIMULATOR].status
    }

    #[tokio::test]
    async fn test_streams_start_for_every_running_experiment() {
        let catalog = catalog();
        let session = session(&catalog).await;
        let (tx, _rx) = mpsc::unbounded_channel();

        session.start_streams(&tx);
        for record in catalog.running() {
            assert!(session.simulator.is_active(&record.id));
        }
        session.report_simulator_health().await;
        assert_eq!(simulator_status(&session).await, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_completion_and_shutdown_keep_simulator_healthy() {
        let catalog = catalog();
        let mut session = session(&catalog).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        session.start_streams(&tx);

        let running = catalog.running();
        session.complete(&running[0]).await;
        assert_eq!(session.simulator.active_count(), running.len() - 1);
        assert_eq!(simulator_status(&session).await, ComponentStatus::Healthy);

        // A stream lost without completing still degrades the simulator
        session.simulator.stop_simulation(&running[1].id);
        session.report_simulator_health().await;
        assert_eq!(simulator_status(&session).await, ComponentStatus::Degraded);

        session.shutdown("duration elapsed").await;
        assert_eq!(session.simulator.active_count(), 0);
        assert_eq!(simulator_status(&session).await, ComponentStatus::Healthy);
    }
}
