//! Synthetic experiment record generation
//!
//! Every field is an independent random draw; derived fields (cost
//! breakdown, final accuracy, ROI) are computed from the rounded draws so a
//! record is always internally consistent.

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{round_to, EpochMetrics, ExperimentRecord, ExperimentStatus, Provider};

/// Historical experiments generated at startup
pub const HISTORICAL_EXPERIMENTS: usize = 60;

/// Days covered by the historical experiments
pub const HISTORY_WINDOW_DAYS: u32 = 30;

/// Share of finished experiments that end up failed
const FAILURE_RATE: f64 = 0.15;

const STORAGE_COST_RATIO: f64 = 0.05;
const NETWORK_COST_RATIO: f64 = 0.03;

pub const RESEARCHERS: &[&str] = &[
    "Sarah Chen",
    "Marcus Rodriguez",
    "Aisha Patel",
    "James Kim",
    "Elena Volkov",
    "David Okonkwo",
    "Mei Zhang",
    "Lucas Silva",
];

pub const TEAMS: &[&str] = &["Research", "Applied AI", "Platform", "Foundations"];

pub const PROJECTS: &[&str] = &[
    "LLM Fine-tuning",
    "Vision Models",
    "Multimodal Research",
    "RLHF Pipeline",
    "Alignment Research",
    "Safety Testing",
];

pub const MODEL_NAMES: &[&str] = &[
    "llama-3-70b-instruct",
    "llama-3.1-8b-base",
    "mistral-7b-v0.3",
    "mixtral-8x7b-instruct",
    "phi-3-medium-4k",
    "qwen-2.5-72b",
    "deepseek-v2-lite",
    "gemma-2-27b",
    "yi-34b-chat",
    "falcon-180b",
];

const GPU_TYPES: &[&str] = &["H100 80GB", "A100 80GB", "A100 40GB", "L4 24GB", "A10G 24GB"];
const GPU_COUNTS: &[u32] = &[1, 2, 4, 8];
const BATCH_SIZES: &[u32] = &[16, 32, 64, 128];
const DATASET_SIZES: &[&str] = &["50K", "100K", "500K", "1M", "5M"];

/// Fixed profile of an experiment that is currently running
struct RunningProfile {
    id: u32,
    name: &'static str,
    model_name: &'static str,
    gpu_type: &'static str,
    num_gpus: u32,
    duration_hours: f64,
    total_cost: f64,
    researcher: &'static str,
    team: &'static str,
    project: &'static str,
}

const RUNNING_PROFILES: &[RunningProfile] = &[
    RunningProfile {
        id: 1001,
        name: "llama-3-70b-dpo-training",
        model_name: "llama-3-70b-instruct",
        gpu_type: "H100 80GB",
        num_gpus: 8,
        duration_hours: 12.5,
        total_cost: 810.0,
        researcher: "Sarah Chen",
        team: "Research",
        project: "RLHF Pipeline",
    },
    RunningProfile {
        id: 1002,
        name: "mistral-7b-finetune-medical",
        model_name: "mistral-7b-v0.3",
        gpu_type: "A100 80GB",
        num_gpus: 2,
        duration_hours: 8.2,
        total_cost: 67.28,
        researcher: "Marcus Rodriguez",
        team: "Applied AI",
        project: "LLM Fine-tuning",
    },
    RunningProfile {
        id: 1003,
        name: "phi-3-medium-code-gen",
        model_name: "phi-3-medium-4k",
        gpu_type: "A100 40GB",
        num_gpus: 1,
        duration_hours: 5.7,
        total_cost: 17.67,
        researcher: "Aisha Patel",
        team: "Platform",
        project: "LLM Fine-tuning",
    },
];

/// Hourly rate for a GPU profile at a provider
pub fn hourly_rate(gpu_type: &str, num_gpus: u32, provider: Provider) -> f64 {
    let base = if gpu_type.contains("H100") {
        8.0
    } else if gpu_type.contains("A100 80GB") {
        4.0
    } else if gpu_type.contains("A100 40GB") {
        3.0
    } else {
        1.2
    };

    let provider_multiplier = match provider {
        Provider::Azure => 1.1,
        Provider::Aws => 1.05,
        Provider::Gcp => 1.0,
    };

    base * num_gpus as f64 * provider_multiplier
}

/// Format an experiment id: 7 -> "exp-00007"
pub fn experiment_id(id: u32) -> String {
    format!("exp-{:05}", id)
}

/// Seedable generator of synthetic experiment records
pub struct ExperimentGenerator {
    rng: StdRng,
    now: DateTime<Utc>,
}

impl ExperimentGenerator {
    pub fn new(rng: StdRng, now: DateTime<Utc>) -> Self {
        Self { rng, now }
    }

    /// Deterministic generator anchored at the current time
    pub fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), Utc::now())
    }

    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng(), Utc::now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.random_range(0..items.len())]
    }

    /// A random start time `days_ago` days back, never in the future
    fn start_time(&mut self, days_ago: u32) -> DateTime<Utc> {
        let hour = self.rng.random_range(0..24);
        let minute = self.rng.random_range(0..60);

        let start = self
            .now
            .date_naive()
            .checked_sub_days(Days::new(days_ago as u64))
            .zip(NaiveTime::from_hms_opt(hour, minute, 0))
            .map(|(date, time)| date.and_time(time).and_utc())
            .unwrap_or(self.now);

        start.min(self.now)
    }

    /// Generate one experiment started `days_ago` days back
    pub fn experiment(&mut self, id: u32, days_ago: u32) -> ExperimentRecord {
        let gpu_type = self.pick(GPU_TYPES);
        let provider = self.pick(&Provider::ALL);
        let num_gpus = self.pick(GPU_COUNTS);
        let cost_per_hour = hourly_rate(gpu_type, num_gpus, provider);

        let duration_hours = round_to(self.rng.random_range(2.0..50.0), 2);

        let status = if days_ago == 0 {
            self.pick(&[ExperimentStatus::Running, ExperimentStatus::Queued])
        } else if self.rng.random_bool(FAILURE_RATE) {
            ExperimentStatus::Failed
        } else {
            ExperimentStatus::Completed
        };

        let initial_accuracy = round_to(self.rng.random_range(65.0..85.0), 1);
        let accuracy_gain = round_to(self.rng.random_range(1.0..9.0), 1);

        let avg_gpu_utilization = if status == ExperimentStatus::Failed {
            self.rng.random_range(15.0..45.0)
        } else {
            self.rng.random_range(55.0..90.0)
        };

        let start_time = self.start_time(days_ago);
        let end_time = status
            .is_finished()
            .then(|| start_time + Duration::seconds((duration_hours * 3600.0) as i64));

        let model_name = self.pick(MODEL_NAMES);
        let family = model_name.split('-').next().unwrap_or(model_name);
        let learning_rate = self.rng.random_range(0.00001..0.00051);

        let mut record = ExperimentRecord {
            id: experiment_id(id),
            name: format!("{}-finetune-{}", family, id),
            model_name: model_name.to_string(),
            status,
            gpu_type: gpu_type.to_string(),
            provider,
            num_gpus,
            start_time,
            end_time,
            duration_hours,
            total_cost: 0.0,
            cost_per_hour: round_to(cost_per_hour, 2),
            initial_accuracy,
            final_accuracy: 0.0,
            accuracy_gain,
            epochs: self.rng.random_range(5..25),
            batch_size: self.pick(BATCH_SIZES),
            learning_rate: significant_digits(learning_rate, 3),
            dataset_size: self.pick(DATASET_SIZES).to_string(),
            researcher: self.pick(RESEARCHERS).to_string(),
            team: self.pick(TEAMS).to_string(),
            project: self.pick(PROJECTS).to_string(),
            compute_cost: 0.0,
            storage_cost: 0.0,
            network_cost: 0.0,
            avg_gpu_utilization: round_to(avg_gpu_utilization, 1),
            cost_per_accuracy_point: 0.0,
            roi: 0.0,
        };

        apply_compute_cost(&mut record, cost_per_hour * duration_hours);
        record
    }

    /// Historical experiments spread evenly over the history window
    pub fn historical(&mut self, count: usize) -> Vec<ExperimentRecord> {
        (0..count)
            .map(|i| {
                let days_ago =
                    ((i as f64 / count as f64) * HISTORY_WINDOW_DAYS as f64).floor() as u32;
                self.experiment(i as u32 + 1, days_ago)
            })
            .collect()
    }

    /// The fixed set of experiments that are currently running
    pub fn running(&mut self) -> Vec<ExperimentRecord> {
        RUNNING_PROFILES
            .iter()
            .map(|profile| {
                let mut record = self.experiment(profile.id, 0);
                let cost_per_hour =
                    hourly_rate(profile.gpu_type, profile.num_gpus, record.provider);

                record.status = ExperimentStatus::Running;
                record.name = profile.name.to_string();
                record.model_name = profile.model_name.to_string();
                record.gpu_type = profile.gpu_type.to_string();
                record.num_gpus = profile.num_gpus;
                record.duration_hours = profile.duration_hours;
                record.cost_per_hour = round_to(cost_per_hour, 2);
                record.researcher = profile.researcher.to_string();
                record.team = profile.team.to_string();
                record.project = profile.project.to_string();
                record.end_time = None;

                // Accrued hours so far follow from the fixed cost at the current rate
                let accrued_hours = profile.total_cost / cost_per_hour;
                record.start_time =
                    self.now - Duration::seconds((accrued_hours * 3600.0) as i64);

                apply_total_cost(&mut record, profile.total_cost);
                record
            })
            .collect()
    }

    /// Per-epoch cost, accuracy and loss curve for a record
    pub fn epoch_metrics(&mut self, record: &ExperimentRecord) -> Vec<EpochMetrics> {
        let total_epochs = record.epochs.max(1);
        let cost_per_epoch = record.total_cost / total_epochs as f64;
        let accuracy_per_epoch = record.accuracy_gain / total_epochs as f64;
        let minutes_per_epoch = record.duration_hours * 60.0 / total_epochs as f64;

        (1..=total_epochs)
            .map(|epoch| {
                let progress = epoch as f64 / total_epochs as f64;
                let accuracy_noise = 1.0 + self.rng.random_range(-0.1..0.1);
                let duration_noise = 1.0 + self.rng.random_range(-0.15..0.15);
                let loss_noise = self.rng.random_range(0.0..0.1);
                let utilization_noise = self.rng.random_range(-5.0..5.0);

                EpochMetrics {
                    epoch,
                    cost: round_to(cost_per_epoch * epoch as f64, 2),
                    accuracy: round_to(
                        record.initial_accuracy
                            + accuracy_per_epoch * epoch as f64 * accuracy_noise,
                        2,
                    ),
                    loss: round_to(2.5 * (-progress * 2.0).exp() + loss_noise, 4),
                    duration_minutes: round_to(minutes_per_epoch * duration_noise, 1),
                    gpu_utilization: round_to(
                        (record.avg_gpu_utilization + utilization_noise).clamp(0.0, 100.0),
                        1,
                    ),
                }
            })
            .collect()
    }
}

/// Fill the cost breakdown and cost-derived metrics from a compute cost
fn apply_compute_cost(record: &mut ExperimentRecord, compute_cost: f64) {
    record.compute_cost = round_to(compute_cost, 2);
    record.storage_cost = round_to(record.compute_cost * STORAGE_COST_RATIO, 2);
    record.network_cost = round_to(record.compute_cost * NETWORK_COST_RATIO, 2);
    record.total_cost = round_to(
        record.compute_cost + record.storage_cost + record.network_cost,
        2,
    );
    apply_derived_metrics(record);
}

/// Split a fixed total cost into its breakdown and refresh derived metrics
fn apply_total_cost(record: &mut ExperimentRecord, total_cost: f64) {
    let compute_cost = total_cost / (1.0 + STORAGE_COST_RATIO + NETWORK_COST_RATIO);
    record.compute_cost = round_to(compute_cost, 2);
    record.storage_cost = round_to(record.compute_cost * STORAGE_COST_RATIO, 2);
    record.network_cost = round_to(total_cost - record.compute_cost - record.storage_cost, 2);
    record.total_cost = total_cost;
    apply_derived_metrics(record);
}

fn apply_derived_metrics(record: &mut ExperimentRecord) {
    record.final_accuracy = round_to(record.initial_accuracy + record.accuracy_gain, 1);
    record.cost_per_accuracy_point = round_to(record.total_cost / record.accuracy_gain, 2);
    record.roi = round_to(
        crate::format::calculate_roi(record.accuracy_gain, record.total_cost),
        2,
    );
}

fn significant_digits(value: f64, digits: usize) -> f64 {
    format!("{:.*e}", digits.saturating_sub(1), value)
        .parse()
        .unwrap_or(value)
}
