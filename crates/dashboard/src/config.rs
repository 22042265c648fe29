//! Dashboard configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spend_lib::simulator::{BudgetThresholds, SimulatorConfig};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment overrides, e.g. `GPU_SPEND_MONTHLY_BUDGET`
pub const ENV_PREFIX: &str = "GPU_SPEND";

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Monthly GPU budget in USD
    #[serde(default = "default_monthly_budget")]
    pub monthly_budget: f64,

    /// Period between live updates of one experiment
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Window in which repeated alerts of one kind are suppressed
    #[serde(default = "default_alert_dedup_secs")]
    pub alert_dedup_secs: u64,

    /// Age after which recorded alerts are purged
    #[serde(default = "default_alert_retention_secs")]
    pub alert_retention_secs: u64,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    #[serde(default = "default_exceeded_threshold")]
    pub exceeded_threshold: f64,

    /// Seed for reproducible data; random when unset
    #[serde(default)]
    pub seed: Option<u64>,

    /// Port for /healthz, /readyz and /metrics; no server when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_monthly_budget() -> f64 {
    50_000.0
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_alert_dedup_secs() -> u64 {
    300
}

fn default_alert_retention_secs() -> u64 {
    3600
}

fn default_warning_threshold() -> f64 {
    75.0
}

fn default_critical_threshold() -> f64 {
    90.0
}

fn default_exceeded_threshold() -> f64 {
    100.0
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            monthly_budget: default_monthly_budget(),
            tick_interval_ms: default_tick_interval_ms(),
            alert_dedup_secs: default_alert_dedup_secs(),
            alert_retention_secs: default_alert_retention_secs(),
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
            exceeded_threshold: default_exceeded_threshold(),
            seed: None,
            metrics_port: None,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from an optional file, overridden by environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(
            path,
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        )
    }

    fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn thresholds(&self) -> Result<BudgetThresholds> {
        BudgetThresholds::new(
            self.warning_threshold,
            self.critical_threshold,
            self.exceeded_threshold,
        )
        .context("Invalid budget thresholds")
    }

    /// Simulator settings derived from this configuration
    pub fn simulator_config(&self) -> Result<SimulatorConfig> {
        let config = SimulatorConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            alert_dedup_window: Duration::from_secs(self.alert_dedup_secs),
            alert_retention: Duration::from_secs(self.alert_retention_secs),
            thresholds: self.thresholds()?,
            seed: self.seed,
        };
        config.validate().context("Invalid simulator settings")?;
        Ok(config)
    }
}
