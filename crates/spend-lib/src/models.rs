//! Core data models for GPU spend tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cloud provider hosting the GPUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Gcp, Provider::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "gcp" => Ok(Provider::Gcp),
            "azure" => Ok(Provider::Azure),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Lifecycle status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl ExperimentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperimentStatus::Queued => "queued",
            ExperimentStatus::Running => "running",
            ExperimentStatus::Completed => "completed",
            ExperimentStatus::Failed => "failed",
        }
    }

    /// Finished experiments carry an end time
    pub fn is_finished(&self) -> bool {
        matches!(self, ExperimentStatus::Completed | ExperimentStatus::Failed)
    }
}

impl std::fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExperimentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(ExperimentStatus::Queued),
            "running" => Ok(ExperimentStatus::Running),
            "completed" => Ok(ExperimentStatus::Completed),
            "failed" => Ok(ExperimentStatus::Failed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// A single ML training experiment with its cost and performance profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: String,
    pub name: String,
    pub model_name: String,
    pub status: ExperimentStatus,
    pub gpu_type: String,
    pub provider: Provider,
    pub num_gpus: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_hours: f64,
    pub total_cost: f64,
    pub cost_per_hour: f64,

    pub initial_accuracy: f64,
    pub final_accuracy: f64,
    pub accuracy_gain: f64,

    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub dataset_size: String,

    pub researcher: String,
    pub team: String,
    pub project: String,

    pub compute_cost: f64,
    pub storage_cost: f64,
    pub network_cost: f64,

    pub avg_gpu_utilization: f64,
    pub cost_per_accuracy_point: f64,
    pub roi: f64,
}

impl ExperimentRecord {
    pub fn is_running(&self) -> bool {
        self.status == ExperimentStatus::Running
    }
}

/// Per-epoch progress of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: u32,
    /// Cumulative cost up to and including this epoch
    pub cost: f64,
    pub accuracy: f64,
    pub loss: f64,
    /// Wall time of the epoch in minutes
    pub duration_minutes: f64,
    pub gpu_utilization: f64,
}

/// Ephemeral per-tick snapshot for one running experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveCostUpdate {
    pub experiment_id: String,
    pub current_cost: f64,
    /// Hours since this simulation stream started
    pub elapsed_hours: f64,
    pub estimated_time_remaining: String,
    pub current_epoch: u32,
    pub total_epochs: u32,
    pub gpu_utilization: f64,
    pub throughput: String,
}

/// Daily cost point for trend display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCostData {
    pub date: chrono::NaiveDate,
    pub total_cost: f64,
    pub experiments: u32,
    pub avg_utilization: f64,
}

/// Confidence band of a cost projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionConfidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for ProjectionConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionConfidence::High => write!(f, "high"),
            ProjectionConfidence::Medium => write!(f, "medium"),
            ProjectionConfidence::Low => write!(f, "low"),
        }
    }
}

/// Projected daily cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProjection {
    pub date: chrono::NaiveDate,
    pub projected_cost: f64,
    pub confidence: ProjectionConfidence,
}

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
