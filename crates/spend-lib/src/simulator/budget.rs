//! Budget threshold alerts
//!
//! Handles:
//! - Classifying spend as a share of the monthly budget
//! - Deduplication of alerts of the same kind within a configurable window
//! - Age-based purging of recorded alerts

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SpendError};
use crate::observability::SpendMetrics;

/// Default deduplication window (5 minutes)
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default retention of recorded alerts (1 hour)
pub const DEFAULT_ALERT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Severity of a budget threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetAlertKind {
    Warning,
    Critical,
    Exceeded,
}

impl BudgetAlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetAlertKind::Warning => "warning",
            BudgetAlertKind::Critical => "critical",
            BudgetAlertKind::Exceeded => "exceeded",
        }
    }
}

impl std::fmt::Display for BudgetAlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub id: String,
    pub kind: BudgetAlertKind,
    pub message: String,
    pub current_spend: f64,
    pub budget_limit: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
}

/// Percent-of-budget thresholds; each band is half-open `[lower, next)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetThresholds {
    warning: f64,
    critical: f64,
    exceeded: f64,
}

impl BudgetThresholds {
    pub fn new(warning: f64, critical: f64, exceeded: f64) -> Result<Self> {
        let valid = [warning, critical, exceeded].iter().all(|t| t.is_finite())
            && warning > 0.0
            && warning < critical
            && critical < exceeded;

        if !valid {
            return Err(SpendError::InvalidThresholds {
                warning,
                critical,
                exceeded,
            });
        }

        Ok(Self {
            warning,
            critical,
            exceeded,
        })
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn critical(&self) -> f64 {
        self.critical
    }

    pub fn exceeded(&self) -> f64 {
        self.exceeded
    }

    /// Alert kind for a usage percentage, if any threshold is crossed
    pub fn classify(&self, percentage: f64) -> Option<BudgetAlertKind> {
        if percentage >= self.exceeded {
            Some(BudgetAlertKind::Exceeded)
        } else if percentage >= self.critical {
            Some(BudgetAlertKind::Critical)
        } else if percentage >= self.warning {
            Some(BudgetAlertKind::Warning)
        } else {
            None
        }
    }
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            warning: 75.0,
            critical: 90.0,
            exceeded: 100.0,
        }
    }
}

/// Usage as a percentage of budget, or `None` for an unusable budget
pub fn budget_percentage(current_spend: f64, monthly_budget: f64) -> Option<f64> {
    if !monthly_budget.is_finite() || monthly_budget <= 0.0 || !current_spend.is_finite() {
        return None;
    }
    Some(current_spend / monthly_budget * 100.0)
}

#[derive(Debug, Default)]
struct AlertState {
    alerts: Vec<BudgetAlert>,
    /// Last recorded alert per kind, for deduplication
    last_recorded: HashMap<BudgetAlertKind, DateTime<Utc>>,
}

/// Budget alert evaluator with deduplication
pub struct BudgetMonitor {
    thresholds: BudgetThresholds,
    dedup_window: Duration,
    retention: Duration,
    state: Mutex<AlertState>,
    sequence: AtomicU64,
    metrics: SpendMetrics,
}

impl BudgetMonitor {
    /// Create a monitor with a 5-minute dedup window and 1-hour retention
    pub fn new(thresholds: BudgetThresholds) -> Self {
        Self {
            thresholds,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            retention: DEFAULT_ALERT_RETENTION,
            state: Mutex::new(AlertState::default()),
            sequence: AtomicU64::new(0),
            metrics: SpendMetrics::new(),
        }
    }

    /// Set custom deduplication window
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Set custom alert retention
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn thresholds(&self) -> &BudgetThresholds {
        &self.thresholds
    }

    fn state(&self) -> MutexGuard<'_, AlertState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evaluate spend against the budget and deliver a new alert if one is due
    pub fn check_budget_alerts<F>(
        &self,
        current_spend: f64,
        monthly_budget: f64,
        on_alert: F,
    ) -> Option<BudgetAlert>
    where
        F: FnOnce(&BudgetAlert),
    {
        self.check_budget_alerts_at(current_spend, monthly_budget, Utc::now(), on_alert)
    }

    /// Same as [`check_budget_alerts`](Self::check_budget_alerts) at an explicit time
    pub fn check_budget_alerts_at<F>(
        &self,
        current_spend: f64,
        monthly_budget: f64,
        now: DateTime<Utc>,
        on_alert: F,
    ) -> Option<BudgetAlert>
    where
        F: FnOnce(&BudgetAlert),
    {
        let Some(percentage) = budget_percentage(current_spend, monthly_budget) else {
            warn!(
                current_spend = current_spend,
                monthly_budget = monthly_budget,
                "Skipping budget check for unusable budget"
            );
            return None;
        };

        self.metrics.set_budget_used_percent(percentage);

        let kind = self.thresholds.classify(percentage)?;
        let alert = self.record_if_due(kind, percentage, current_spend, monthly_budget, now)?;

        // Delivered outside the lock; a panicking callback cannot re-trigger the alert
        if catch_unwind(AssertUnwindSafe(|| on_alert(&alert))).is_err() {
            warn!(alert_id = %alert.id, kind = %alert.kind, "Budget alert callback panicked");
            self.metrics.inc_callback_panics();
        }

        Some(alert)
    }

    fn record_if_due(
        &self,
        kind: BudgetAlertKind,
        percentage: f64,
        current_spend: f64,
        monthly_budget: f64,
        now: DateTime<Utc>,
    ) -> Option<BudgetAlert> {
        let mut state = self.state();

        if let Some(last) = state.last_recorded.get(&kind) {
            let since = now.signed_duration_since(*last);
            if since.to_std().map(|d| d < self.dedup_window).unwrap_or(true) {
                debug!(kind = %kind, percentage = percentage, "Suppressing duplicate budget alert");
                return None;
            }
        }

        let message = match kind {
            BudgetAlertKind::Warning => {
                format!("You've used {:.0}% of your monthly GPU budget", percentage)
            }
            BudgetAlertKind::Critical => {
                format!("Critical: {:.0}% of monthly GPU budget used", percentage)
            }
            BudgetAlertKind::Exceeded => {
                format!("Budget exceeded! Current spend: ${:.2}", current_spend)
            }
        };

        let alert = BudgetAlert {
            id: format!(
                "alert-{}-{}",
                now.timestamp_millis(),
                self.sequence.fetch_add(1, Ordering::Relaxed)
            ),
            kind,
            message,
            current_spend,
            budget_limit: monthly_budget,
            timestamp: now,
            experiment_id: None,
        };

        state.last_recorded.insert(kind, now);
        state.alerts.push(alert.clone());
        self.metrics.inc_alerts(kind.as_str());

        Some(alert)
    }

    /// All recorded alerts, most recent first
    pub fn alerts(&self) -> Vec<BudgetAlert> {
        let mut alerts = self.state().alerts.clone();
        alerts.reverse();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    /// Purge alerts older than the retention window
    pub fn clear_old_alerts(&self) -> usize {
        self.clear_old_alerts_at(Utc::now())
    }

    pub fn clear_old_alerts_at(&self, now: DateTime<Utc>) -> usize {
        let retention = to_chrono(self.retention);
        let dedup = to_chrono(self.dedup_window);

        let mut state = self.state();
        let before = state.alerts.len();
        state
            .alerts
            .retain(|alert| now.signed_duration_since(alert.timestamp) < retention);
        state
            .last_recorded
            .retain(|_, last| now.signed_duration_since(*last) < dedup);

        let purged = before - state.alerts.len();
        if purged > 0 {
            debug!(purged = purged, "Purged old budget alerts");
        }
        purged
    }
}

/// Windows beyond chrono's range are treated as effectively unbounded
fn to_chrono(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

impl Default for BudgetMonitor {
    fn default() -> Self {
        Self::new(BudgetThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;

    const BUDGET: f64 = 50_000.0;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn spend_for(percentage: f64) -> f64 {
        BUDGET * percentage / 100.0
    }

    #[test]
    fn test_deduplication_within_window() {
        let monitor = BudgetMonitor::default();
        let delivered = RefCell::new(Vec::new());

        let first = monitor.check_budget_alerts_at(spend_for(80.0), BUDGET, t0(), |a| {
            delivered.borrow_mut().push(a.kind)
        });
        let second = monitor.check_budget_alerts_at(
            spend_for(80.0),
            BUDGET,
            t0() + chrono::Duration::minutes(2),
            |a| delivered.borrow_mut().push(a.kind),
        );

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(*delivered.borrow(), vec![BudgetAlertKind::Warning]);

        let third = monitor.check_budget_alerts_at(
            spend_for(80.0),
            BUDGET,
            t0() + chrono::Duration::minutes(6),
            |a| delivered.borrow_mut().push(a.kind),
        );
        assert!(third.is_some());
        assert_eq!(delivered.borrow().len(), 2);
        assert_eq!(monitor.alerts().len(), 2);
    }

    #[test]
    fn test_threshold_boundaries_are_exact() {
        let thresholds = BudgetThresholds::default();
        assert_eq!(thresholds.classify(74.99), None);
        assert_eq!(thresholds.classify(75.0), Some(BudgetAlertKind::Warning));
        assert_eq!(thresholds.classify(89.99), Some(BudgetAlertKind::Warning));
        assert_eq!(thresholds.classify(90.0), Some(BudgetAlertKind::Critical));
        assert_eq!(thresholds.classify(99.99), Some(BudgetAlertKind::Critical));
        assert_eq!(thresholds.classify(100.0), Some(BudgetAlertKind::Exceeded));
        assert_eq!(thresholds.classify(250.0), Some(BudgetAlertKind::Exceeded));
    }

    #[test]
    fn test_boundary_alerts_through_monitor() {
        let monitor = BudgetMonitor::default();

        let warning = monitor.check_budget_alerts_at(8_999.0, 10_000.0, t0(), |_| {});
        let critical = monitor.check_budget_alerts_at(9_000.0, 10_000.0, t0(), |_| {});
        let exceeded = monitor.check_budget_alerts_at(10_000.0, 10_000.0, t0(), |_| {});

        assert_eq!(warning.map(|a| a.kind), Some(BudgetAlertKind::Warning));
        assert_eq!(critical.map(|a| a.kind), Some(BudgetAlertKind::Critical));
        assert_eq!(exceeded.map(|a| a.kind), Some(BudgetAlertKind::Exceeded));
    }

    #[test]
    fn test_different_kinds_not_deduplicated() {
        let monitor = BudgetMonitor::default();
        assert!(monitor
            .check_budget_alerts_at(spend_for(80.0), BUDGET, t0(), |_| {})
            .is_some());
        assert!(monitor
            .check_budget_alerts_at(spend_for(95.0), BUDGET, t0(), |_| {})
            .is_some());
        assert_eq!(monitor.alerts().len(), 2);
    }

    #[test]
    fn test_below_threshold_records_nothing() {
        let monitor = BudgetMonitor::default();
        assert!(monitor
            .check_budget_alerts_at(spend_for(50.0), BUDGET, t0(), |_| panic!("no alert expected"))
            .is_none());
        assert!(monitor.alerts().is_empty());
    }

    #[test]
    fn test_unusable_budget_is_ignored() {
        let monitor = BudgetMonitor::default();
        assert!(monitor.check_budget_alerts_at(100.0, 0.0, t0(), |_| {}).is_none());
        assert!(monitor.check_budget_alerts_at(100.0, -5.0, t0(), |_| {}).is_none());
        assert!(monitor.check_budget_alerts_at(f64::NAN, 10.0, t0(), |_| {}).is_none());
    }

    #[test]
    fn test_alert_messages() {
        let monitor = BudgetMonitor::default();
        let warning = monitor
            .check_budget_alerts_at(spend_for(80.0), BUDGET, t0(), |_| {})
            .unwrap();
        let exceeded = monitor
            .check_budget_alerts_at(51_234.5, BUDGET, t0(), |_| {})
            .unwrap();

        assert_eq!(warning.message, "You've used 80% of your monthly GPU budget");
        assert_eq!(exceeded.message, "Budget exceeded! Current spend: $51234.50");
        assert_eq!(exceeded.budget_limit, BUDGET);
        assert_ne!(warning.id, exceeded.id);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let monitor = BudgetMonitor::default();

        let alert = monitor.check_budget_alerts_at(spend_for(95.0), BUDGET, t0(), |_| {
            panic!("subscriber failure")
        });
        assert!(alert.is_some());

        // The alert was recorded before delivery, so it is not re-fired
        let again = monitor.check_budget_alerts_at(
            spend_for(95.0),
            BUDGET,
            t0() + chrono::Duration::seconds(10),
            |_| {},
        );
        assert!(again.is_none());
        assert_eq!(monitor.alerts().len(), 1);
    }

    #[test]
    fn test_alerts_most_recent_first() {
        let monitor = BudgetMonitor::default().with_dedup_window(Duration::from_secs(1));
        for minute in 0..3 {
            monitor.check_budget_alerts_at(
                spend_for(80.0),
                BUDGET,
                t0() + chrono::Duration::minutes(minute),
                |_| {},
            );
        }

        let alerts = monitor.alerts();
        assert_eq!(alerts.len(), 3);
        assert!(alerts.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(alerts[0].timestamp, t0() + chrono::Duration::minutes(2));
    }

    #[test]
    fn test_clear_old_alerts() {
        let monitor = BudgetMonitor::default();
        monitor.check_budget_alerts_at(spend_for(80.0), BUDGET, t0(), |_| {});
        monitor.check_budget_alerts_at(
            spend_for(95.0),
            BUDGET,
            t0() + chrono::Duration::minutes(50),
            |_| {},
        );

        let purged = monitor.clear_old_alerts_at(t0() + chrono::Duration::minutes(70));
        assert_eq!(purged, 1);

        let remaining = monitor.alerts();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, BudgetAlertKind::Critical);
    }

    #[test]
    fn test_custom_thresholds_validation() {
        assert!(BudgetThresholds::new(50.0, 80.0, 100.0).is_ok());
        assert!(BudgetThresholds::new(90.0, 80.0, 100.0).is_err());
        assert!(BudgetThresholds::new(0.0, 80.0, 100.0).is_err());
        assert!(BudgetThresholds::new(50.0, f64::NAN, 100.0).is_err());
    }
}
