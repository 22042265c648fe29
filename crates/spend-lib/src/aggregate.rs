//! Aggregate reductions over experiment collections
//!
//! Averages return `None` for empty input so callers never render NaN.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::ExperimentRecord;

pub fn sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().sum()
}

/// Arithmetic mean, or `None` when there are no values
pub fn average<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (total, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(total, count), v| (total + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}

/// Spend grouped under one key (team, researcher, ...)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendBreakdown {
    pub key: String,
    pub total_cost: f64,
    pub experiments: usize,
    pub avg_roi: Option<f64>,
}

/// Group spend by a record attribute, highest spend first
pub fn spend_by<F>(records: &[ExperimentRecord], key_fn: F) -> Vec<SpendBreakdown>
where
    F: Fn(&ExperimentRecord) -> &str,
{
    let mut groups: HashMap<&str, Vec<&ExperimentRecord>> = HashMap::new();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record);
    }

    let mut breakdown: Vec<SpendBreakdown> = groups
        .into_iter()
        .map(|(key, members)| SpendBreakdown {
            key: key.to_string(),
            total_cost: sum(members.iter().map(|r| r.total_cost)),
            experiments: members.len(),
            avg_roi: average(members.iter().map(|r| r.roi)),
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total_cost
            .total_cmp(&a.total_cost)
            .then_with(|| a.key.cmp(&b.key))
    });
    breakdown
}

/// The `n` records ranking highest by `score`
pub fn top_by<'a, F>(records: &'a [ExperimentRecord], n: usize, score: F) -> Vec<&'a ExperimentRecord>
where
    F: Fn(&ExperimentRecord) -> f64,
{
    let mut ranked: Vec<&ExperimentRecord> = records.iter().collect();
    ranked.sort_by(|a, b| score(b).total_cmp(&score(a)));
    ranked.truncate(n);
    ranked
}
