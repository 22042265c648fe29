//! Historical daily spend and short-range cost projection

use chrono::{Days, NaiveDate};
use rand::Rng;

use crate::aggregate::average;
use crate::models::{round_to, CostProjection, HistoricalCostData, ProjectionConfidence};

/// Days averaged to seed a projection
const PROJECTION_BASELINE_DAYS: usize = 7;

/// Daily growth applied on top of the baseline
const PROJECTION_DAILY_TREND: f64 = 0.02;

/// Daily spend for the `days` days ending at `today` (oldest first)
pub fn generate_historical_data<R: Rng>(
    rng: &mut R,
    today: NaiveDate,
    days: u32,
) -> Vec<HistoricalCostData> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset as u64)))
        .map(|date| HistoricalCostData {
            date,
            total_cost: round_to(rng.random_range(800.0..1200.0), 2),
            experiments: rng.random_range(2..7),
            avg_utilization: round_to(rng.random_range(45.0..80.0), 1),
        })
        .collect()
}

/// Project daily cost forward from the recent average of `history`
pub fn generate_cost_projection<R: Rng>(
    rng: &mut R,
    history: &[HistoricalCostData],
    days_to_project: u32,
) -> Vec<CostProjection> {
    let Some(last) = history.last() else {
        return Vec::new();
    };

    let recent = &history[history.len().saturating_sub(PROJECTION_BASELINE_DAYS)..];
    let Some(avg_daily_cost) = average(recent.iter().map(|d| d.total_cost)) else {
        return Vec::new();
    };

    (1..=days_to_project)
        .filter_map(|i| {
            let date = last.date.checked_add_days(Days::new(i as u64))?;
            let variance = rng.random_range(-0.15..0.15);
            let trend = 1.0 + i as f64 * PROJECTION_DAILY_TREND;

            Some(CostProjection {
                date,
                projected_cost: round_to(avg_daily_cost * trend * (1.0 + variance), 2),
                confidence: match i {
                    0..=3 => ProjectionConfidence::High,
                    4..=5 => ProjectionConfidence::Medium,
                    _ => ProjectionConfidence::Low,
                },
            })
        })
        .collect()
}
