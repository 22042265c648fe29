//! Synthetic experiment data
//!
//! This module provides:
//! - Seedable generation of historical and running experiment records
//! - The read-only experiment catalog and its queries
//! - Daily spend history and cost projections for trend display

mod experiments;
mod history;

pub use experiments::{
    experiment_id, hourly_rate, ExperimentGenerator, HISTORICAL_EXPERIMENTS, HISTORY_WINDOW_DAYS,
    MODEL_NAMES, PROJECTS, RESEARCHERS, TEAMS,
};
pub use history::{generate_cost_projection, generate_historical_data};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::aggregate::{self, SpendBreakdown};
use crate::error::{Result, SpendError};
use crate::models::{EpochMetrics, ExperimentRecord, ExperimentStatus};

/// Immutable collection of historical and running experiments
#[derive(Debug, Clone)]
pub struct ExperimentCatalog {
    experiments: Vec<ExperimentRecord>,
    running: Vec<ExperimentRecord>,
    generated_at: DateTime<Utc>,
}

impl ExperimentCatalog {
    /// Generate the standard catalog (60 historical, 3 running)
    pub fn generate(generator: &mut ExperimentGenerator) -> Self {
        let experiments = generator.historical(HISTORICAL_EXPERIMENTS);
        let running = generator.running();

        debug!(
            historical = experiments.len(),
            running = running.len(),
            "Generated experiment catalog"
        );

        Self {
            experiments,
            running,
            generated_at: generator.now(),
        }
    }

    /// Seeded catalog when `seed` is set, otherwise OS-random
    pub fn from_seed(seed: Option<u64>) -> Self {
        let mut generator = match seed {
            Some(seed) => ExperimentGenerator::with_seed(seed),
            None => ExperimentGenerator::from_os_rng(),
        };
        Self::generate(&mut generator)
    }

    /// Build a catalog from explicit records
    pub fn from_records(experiments: Vec<ExperimentRecord>, running: Vec<ExperimentRecord>) -> Self {
        Self {
            experiments,
            running,
            generated_at: Utc::now(),
        }
    }

    /// Historical experiments
    pub fn experiments(&self) -> &[ExperimentRecord] {
        &self.experiments
    }

    /// Experiments currently running
    pub fn running(&self) -> &[ExperimentRecord] {
        &self.running
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Look up any experiment, historical or running
    pub fn get(&self, id: &str) -> Option<&ExperimentRecord> {
        self.experiments
            .iter()
            .chain(self.running.iter())
            .find(|e| e.id == id)
    }

    /// Look up a running experiment
    pub fn get_running(&self, id: &str) -> Option<&ExperimentRecord> {
        self.running.iter().find(|e| e.id == id)
    }

    pub fn by_status(&self, status: ExperimentStatus) -> Vec<&ExperimentRecord> {
        self.experiments.iter().filter(|e| e.status == status).collect()
    }

    pub fn by_researcher(&self, researcher: &str) -> Vec<&ExperimentRecord> {
        self.experiments
            .iter()
            .filter(|e| e.researcher == researcher)
            .collect()
    }

    pub fn by_team(&self, team: &str) -> Vec<&ExperimentRecord> {
        self.experiments.iter().filter(|e| e.team == team).collect()
    }

    /// Total spend of historical experiments
    pub fn total_spend(&self) -> f64 {
        aggregate::sum(self.experiments.iter().map(|e| e.total_cost))
    }

    fn completed(&self) -> impl Iterator<Item = &ExperimentRecord> {
        self.experiments
            .iter()
            .filter(|e| e.status == ExperimentStatus::Completed)
    }

    /// Mean ROI of completed experiments
    pub fn average_roi(&self) -> Option<f64> {
        aggregate::average(self.completed().map(|e| e.roi))
    }

    /// Mean cost of completed experiments
    pub fn average_completed_cost(&self) -> Option<f64> {
        aggregate::average(self.completed().map(|e| e.total_cost))
    }

    /// Mean GPU utilization of completed experiments
    pub fn average_completed_utilization(&self) -> Option<f64> {
        aggregate::average(self.completed().map(|e| e.avg_gpu_utilization))
    }

    /// Most expensive historical experiments
    pub fn top_expensive(&self, n: usize) -> Vec<&ExperimentRecord> {
        aggregate::top_by(&self.experiments, n, |e| e.total_cost)
    }

    /// Completed experiments with the best ROI
    pub fn best_roi(&self, n: usize) -> Vec<&ExperimentRecord> {
        let mut completed: Vec<&ExperimentRecord> = self.completed().collect();
        completed.sort_by(|a, b| b.roi.total_cmp(&a.roi));
        completed.truncate(n);
        completed
    }

    pub fn spend_by_team(&self) -> Vec<SpendBreakdown> {
        aggregate::spend_by(&self.experiments, |e| e.team.as_str())
    }

    pub fn spend_by_researcher(&self) -> Vec<SpendBreakdown> {
        aggregate::spend_by(&self.experiments, |e| e.researcher.as_str())
    }

    /// Per-epoch metrics for an experiment
    pub fn epoch_metrics(
        &self,
        id: &str,
        generator: &mut ExperimentGenerator,
    ) -> Result<Vec<EpochMetrics>> {
        let record = self
            .get(id)
            .ok_or_else(|| SpendError::UnknownExperiment(id.to_string()))?;
        Ok(generator.epoch_metrics(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ExperimentCatalog {
        ExperimentCatalog::from_seed(Some(42))
    }

    #[test]
    fn test_catalog_sizes() {
        let catalog = catalog();
        assert_eq!(catalog.experiments().len(), HISTORICAL_EXPERIMENTS);
        assert_eq!(catalog.running().len(), 3);
        assert!(catalog.running().iter().all(|e| e.is_running()));
    }

    #[test]
    fn test_get_finds_historical_and_running() {
        let catalog = catalog();
        assert!(catalog.get("exp-00001").is_some());
        assert!(catalog.get("exp-01002").is_some());
        assert!(catalog.get_running("exp-01002").is_some());
        assert!(catalog.get_running("exp-00001").is_none());
        assert!(catalog.get("exp-99999").is_none());
    }

    #[test]
    fn test_filters() {
        let catalog = catalog();
        let completed = catalog.by_status(ExperimentStatus::Completed);
        assert!(completed.iter().all(|e| e.status == ExperimentStatus::Completed));

        let team = catalog.by_team("Research");
        assert!(team.iter().all(|e| e.team == "Research"));

        let researcher = catalog.by_researcher("Mei Zhang");
        assert!(researcher.iter().all(|e| e.researcher == "Mei Zhang"));
    }

    #[test]
    fn test_total_spend_matches_records() {
        let catalog = catalog();
        let expected: f64 = catalog.experiments().iter().map(|e| e.total_cost).sum();
        assert!((catalog.total_spend() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_averages_guard_empty_input() {
        let catalog = ExperimentCatalog::from_records(Vec::new(), Vec::new());
        assert_eq!(catalog.average_roi(), None);
        assert_eq!(catalog.average_completed_cost(), None);
        assert_eq!(catalog.average_completed_utilization(), None);
        assert_eq!(catalog.total_spend(), 0.0);
    }

    #[test]
    fn test_best_roi_only_completed() {
        let catalog = catalog();
        let best = catalog.best_roi(5);
        assert!(best.len() <= 5);
        assert!(best.iter().all(|e| e.status == ExperimentStatus::Completed));
        assert!(best.windows(2).all(|w| w[0].roi >= w[1].roi));
    }

    #[test]
    fn test_epoch_metrics_unknown_experiment() {
        let catalog = catalog();
        let mut generator = ExperimentGenerator::with_seed(1);
        let err = catalog
            .epoch_metrics("exp-99999", &mut generator)
            .unwrap_err();
        assert_eq!(err, SpendError::UnknownExperiment("exp-99999".to_string()));

        let epochs = catalog.epoch_metrics("exp-01001", &mut generator).unwrap();
        assert!(!epochs.is_empty());
    }
}
