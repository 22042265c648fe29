//! Presentation-side cache of live updates
//!
//! Holds the latest snapshot per running experiment on top of the base
//! 30-day spend, and derives total spend and budget usage from them.

use std::collections::BTreeMap;

use crate::error::{Result, SpendError};
use crate::models::LiveCostUpdate;
use crate::simulator::{budget_percentage, BudgetThresholds};

/// Colour band of the budget bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLevel {
    Normal,
    Warning,
    Critical,
}

impl BudgetLevel {
    /// Band for a usage percentage; the exceeded threshold shares the critical band
    pub fn from_percentage(percentage: f64, thresholds: &BudgetThresholds) -> Self {
        if percentage >= thresholds.critical() {
            BudgetLevel::Critical
        } else if percentage >= thresholds.warning() {
            BudgetLevel::Warning
        } else {
            BudgetLevel::Normal
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    base_spend: f64,
    monthly_budget: f64,
    latest: BTreeMap<String, LiveCostUpdate>,
}

impl DashboardState {
    pub fn new(base_spend: f64, monthly_budget: f64) -> Result<Self> {
        if !monthly_budget.is_finite() || monthly_budget <= 0.0 {
            return Err(SpendError::InvalidBudget(monthly_budget));
        }

        Ok(Self {
            base_spend,
            monthly_budget,
            latest: BTreeMap::new(),
        })
    }

    /// Replace the cached snapshot for the update's experiment
    pub fn apply(&mut self, update: LiveCostUpdate) {
        self.latest.insert(update.experiment_id.clone(), update);
    }

    pub fn latest(&self, experiment_id: &str) -> Option<&LiveCostUpdate> {
        self.latest.get(experiment_id)
    }

    /// Latest snapshots ordered by experiment id
    pub fn updates(&self) -> impl Iterator<Item = &LiveCostUpdate> {
        self.latest.values()
    }

    pub fn base_spend(&self) -> f64 {
        self.base_spend
    }

    pub fn monthly_budget(&self) -> f64 {
        self.monthly_budget
    }

    /// Sum of the latest cost of every experiment that has reported
    pub fn running_spend(&self) -> f64 {
        self.latest.values().map(|u| u.current_cost).sum()
    }

    pub fn current_total_spend(&self) -> f64 {
        self.base_spend + self.running_spend()
    }

    pub fn budget_used(&self) -> f64 {
        budget_percentage(self.current_total_spend(), self.monthly_budget).unwrap_or(0.0)
    }

    pub fn remaining_budget(&self) -> f64 {
        self.monthly_budget - self.current_total_spend()
    }

    pub fn budget_level(&self, thresholds: &BudgetThresholds) -> BudgetLevel {
        BudgetLevel::from_percentage(self.budget_used(), thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str, cost: f64) -> LiveCostUpdate {
        LiveCostUpdate {
            experiment_id: id.to_string(),
            current_cost: cost,
            elapsed_hours: 0.5,
            estimated_time_remaining: "2h".to_string(),
            current_epoch: 1,
            total_epochs: 10,
            gpu_utilization: 90.0,
            throughput: "850 tokens/sec".to_string(),
        }
    }

    #[test]
    fn test_rejects_unusable_budget() {
        assert_eq!(
            DashboardState::new(100.0, 0.0).unwrap_err(),
            SpendError::InvalidBudget(0.0)
        );
        assert!(DashboardState::new(100.0, -5.0).is_err());
        assert!(DashboardState::new(100.0, f64::NAN).is_err());
    }

    #[test]
    fn test_latest_update_wins() {
        let mut state = DashboardState::new(30_000.0, 50_000.0).unwrap();
        assert_eq!(state.running_spend(), 0.0);

        state.apply(update("exp-01001", 800.0));
        state.apply(update("exp-01002", 60.0));
        state.apply(update("exp-01001", 812.5));

        assert_eq!(state.latest("exp-01001").map(|u| u.current_cost), Some(812.5));
        assert_eq!(state.running_spend(), 872.5);
        assert_eq!(state.current_total_spend(), 30_872.5);
        assert_eq!(state.updates().count(), 2);
    }

    #[test]
    fn test_budget_usage_and_level() {
        let thresholds = BudgetThresholds::default();
        let mut state = DashboardState::new(37_000.0, 50_000.0).unwrap();
        assert_eq!(state.budget_level(&thresholds), BudgetLevel::Normal);

        state.apply(update("exp-01001", 500.0));
        assert_eq!(state.budget_used(), 75.0);
        assert_eq!(state.budget_level(&thresholds), BudgetLevel::Warning);

        state.apply(update("exp-01001", 8_000.0));
        assert_eq!(state.budget_level(&thresholds), BudgetLevel::Critical);
        assert_eq!(state.remaining_budget(), 5_000.0);
    }
}
