//! Per-tick snapshot computation
//!
//! Pure functions of elapsed time and a random source, kept apart from the
//! scheduling so the cost/progress arithmetic can be tested directly.

use rand::Rng;

use crate::format::{format_eta, group_thousands};
use crate::models::{round_to, ExperimentRecord, LiveCostUpdate};

/// Maximum utilization deviation per sample, in percentage points
const UTILIZATION_NOISE: f64 = 5.0;

/// Maximum relative throughput deviation per sample
const THROUGHPUT_NOISE: f64 = 0.1;

/// Base throughput in tokens/sec by parameter-count tier
const THROUGHPUT_TIERS: &[(&str, f64)] = &[("70b", 120.0), ("34b", 280.0), ("13b", 450.0), ("7b", 850.0)];

/// Throughput for models that match no tier
const DEFAULT_THROUGHPUT: f64 = 1200.0;

/// The parts of a running experiment the ticker needs
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProfile {
    pub experiment_id: String,
    pub model_name: String,
    pub duration_hours: f64,
    pub total_epochs: u32,
    pub base_utilization: f64,
}

impl From<&ExperimentRecord> for SimulationProfile {
    fn from(record: &ExperimentRecord) -> Self {
        Self {
            experiment_id: record.id.clone(),
            model_name: record.model_name.clone(),
            duration_hours: record.duration_hours,
            total_epochs: record.epochs.max(1),
            base_utilization: record.avg_gpu_utilization,
        }
    }
}

/// Result of one tick: the published snapshot and the unrounded cost
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub update: LiveCostUpdate,
    pub raw_cost: f64,
}

/// Compute the snapshot for `elapsed_hours` into a simulation stream
pub fn compute_tick<R: Rng>(
    profile: &SimulationProfile,
    base_cost: f64,
    cost_per_hour: f64,
    elapsed_hours: f64,
    rng: &mut R,
) -> TickOutcome {
    let elapsed_hours = elapsed_hours.max(0.0);
    let raw_cost = base_cost + cost_per_hour * elapsed_hours;

    let current_epoch = current_epoch(profile, elapsed_hours);
    let remaining_hours = (profile.duration_hours - elapsed_hours).max(0.0);
    let utilization = sample_utilization(profile.base_utilization, rng);
    let throughput = sample_throughput(&profile.model_name, rng);

    TickOutcome {
        update: LiveCostUpdate {
            experiment_id: profile.experiment_id.clone(),
            current_cost: round_to(raw_cost, 2),
            elapsed_hours: round_to(elapsed_hours, 2),
            estimated_time_remaining: format_eta(remaining_hours),
            current_epoch,
            total_epochs: profile.total_epochs,
            gpu_utilization: round_to(utilization, 1),
            throughput,
        },
        raw_cost,
    }
}

/// Epoch reached after `elapsed_hours`, within `[1, total_epochs]`
pub fn current_epoch(profile: &SimulationProfile, elapsed_hours: f64) -> u32 {
    let total = profile.total_epochs.max(1);
    let progress = if profile.duration_hours > 0.0 {
        (elapsed_hours / profile.duration_hours).clamp(0.0, 1.0)
    } else {
        1.0
    };

    ((progress * total as f64).floor() as u32 + 1).min(total)
}

/// Base utilization plus independent uniform noise, clamped to `[0, 100]`
pub fn sample_utilization<R: Rng>(base: f64, rng: &mut R) -> f64 {
    let noise = rng.random_range(-UTILIZATION_NOISE..=UTILIZATION_NOISE);
    (base + noise).clamp(0.0, 100.0)
}

/// Base throughput for a model identifier
pub fn base_throughput(model_name: &str) -> f64 {
    let model = model_name.to_ascii_lowercase();
    THROUGHPUT_TIERS
        .iter()
        .find(|(tier, _)| model.contains(tier))
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_THROUGHPUT)
}

/// Perturbed throughput rendered as "1,234 tokens/sec"
pub fn sample_throughput<R: Rng>(model_name: &str, rng: &mut R) -> String {
    let variance = rng.random_range(-THROUGHPUT_NOISE..=THROUGHPUT_NOISE);
    let rate = (base_throughput(model_name) * (1.0 + variance)).round() as u64;
    format!("{} tokens/sec", group_thousands(rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn profile() -> SimulationProfile {
        SimulationProfile {
            experiment_id: "exp-01001".to_string(),
            model_name: "llama-3-70b-instruct".to_string(),
            duration_hours: 12.5,
            total_epochs: 10,
            base_utilization: 97.0,
        }
    }

    #[test]
    fn test_cost_is_monotonic_across_ticks() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = profile();
        let mut previous = f64::MIN;

        for second in 0..20_000u32 {
            let elapsed = second as f64 * 3.0 / 3600.0;
            let outcome = compute_tick(&profile, 810.0, 67.2, elapsed, &mut rng);
            assert!(outcome.update.current_cost >= previous);
            previous = outcome.update.current_cost;
        }
    }

    #[test]
    fn test_epoch_bounded_and_non_decreasing() {
        let profile = profile();
        let mut previous = 0;

        for step in 0..=200u32 {
            let elapsed = step as f64 * 0.1;
            let epoch = current_epoch(&profile, elapsed);
            assert!(epoch >= 1 && epoch <= profile.total_epochs);
            assert!(epoch >= previous);
            previous = epoch;
        }

        assert_eq!(current_epoch(&profile, 0.0), 1);
        assert_eq!(current_epoch(&profile, 100.0), 10);
    }

    #[test]
    fn test_epoch_with_zero_duration() {
        let mut profile = profile();
        profile.duration_hours = 0.0;
        assert_eq!(current_epoch(&profile, 0.0), profile.total_epochs);
    }

    #[test]
    fn test_utilization_clamped() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let high = sample_utilization(98.0, &mut rng);
            let low = sample_utilization(2.0, &mut rng);
            assert!((0.0..=100.0).contains(&high));
            assert!((0.0..=100.0).contains(&low));
        }
    }

    #[test]
    fn test_throughput_tiers() {
        assert_eq!(base_throughput("llama-3-70b-instruct"), 120.0);
        assert_eq!(base_throughput("yi-34b-chat"), 280.0);
        assert_eq!(base_throughput("llama-2-13b"), 450.0);
        assert_eq!(base_throughput("mistral-7b-v0.3"), 850.0);
        assert_eq!(base_throughput("phi-3-medium-4k"), 1200.0);
    }

    #[test]
    fn test_throughput_within_ten_percent() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let sample = sample_throughput("phi-3-medium-4k", &mut rng);
            let value: u64 = sample
                .trim_end_matches(" tokens/sec")
                .replace(',', "")
                .parse()
                .unwrap();
            assert!((1080..=1320).contains(&value), "{}", sample);
        }
    }

    #[test]
    fn test_tick_snapshot_fields() {
        let mut rng = StdRng::seed_from_u64(4);
        let outcome = compute_tick(&profile(), 100.0, 10.0, 0.5, &mut rng);

        assert_eq!(outcome.update.current_cost, 105.0);
        assert_eq!(outcome.update.elapsed_hours, 0.5);
        assert_eq!(outcome.update.estimated_time_remaining, "12h");
        assert_eq!(outcome.update.total_epochs, 10);
        assert_eq!(outcome.update.current_epoch, 1);
        assert!(outcome.update.throughput.ends_with("tokens/sec"));
    }
}
