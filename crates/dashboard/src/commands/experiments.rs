//! Experiment listing

use anyhow::Result;
use chrono::Utc;
use spend_lib::format::{format_currency, relative_time};
use spend_lib::generator::ExperimentCatalog;
use spend_lib::models::{ExperimentRecord, ExperimentStatus};
use tabled::Tabled;

use crate::output::{self, color_status, color_utilization, OutputFormat};

#[derive(Tabled)]
struct ExperimentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Researcher")]
    researcher: String,
    #[tabled(rename = "GPUs")]
    gpus: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Util")]
    utilization: String,
    #[tabled(rename = "ROI")]
    roi: String,
    #[tabled(rename = "Started")]
    started: String,
}

impl From<&ExperimentRecord> for ExperimentRow {
    fn from(record: &ExperimentRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            model: record.model_name.clone(),
            researcher: record.researcher.clone(),
            gpus: format!("{}x {}", record.num_gpus, record.gpu_type),
            provider: record.provider.to_string(),
            status: color_status(record.status),
            cost: format_currency(record.total_cost),
            utilization: color_utilization(record.avg_gpu_utilization),
            roi: format!("{:.3}", record.roi),
            started: relative_time(record.start_time, Utc::now()),
        }
    }
}

/// Optional narrowing of the experiment list
#[derive(Debug, Default)]
pub struct ExperimentFilter {
    pub status: Option<ExperimentStatus>,
    pub team: Option<String>,
    pub researcher: Option<String>,
    pub limit: usize,
}

impl ExperimentFilter {
    fn matches(&self, record: &ExperimentRecord) -> bool {
        self.status.map_or(true, |status| record.status == status)
            && self.team.as_deref().map_or(true, |team| record.team == team)
            && self
                .researcher
                .as_deref()
                .map_or(true, |researcher| record.researcher == researcher)
    }

    /// Matching records, running first then most recent
    fn apply<'a>(&self, catalog: &'a ExperimentCatalog) -> Vec<&'a ExperimentRecord> {
        let mut records: Vec<&ExperimentRecord> = catalog
            .running()
            .iter()
            .chain(catalog.experiments())
            .filter(|record| self.matches(record))
            .collect();

        records.sort_by(|a, b| {
            b.is_running()
                .cmp(&a.is_running())
                .then_with(|| b.start_time.cmp(&a.start_time))
        });
        records.truncate(self.limit);
        records
    }
}

pub fn list_experiments(
    catalog: &ExperimentCatalog,
    filter: &ExperimentFilter,
    format: OutputFormat,
) -> Result<()> {
    let records = filter.apply(catalog);

    match format {
        OutputFormat::Json => output::print_json(&records)?,
        OutputFormat::Table => {
            output::print_heading("Experiments", '=');
            output::print_table(records.into_iter().map(ExperimentRow::from).collect());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ExperimentCatalog {
        ExperimentCatalog::from_seed(Some(7))
    }

    #[test]
    fn test_running_experiments_listed_first() {
        let filter = ExperimentFilter {
            limit: 10,
            ..ExperimentFilter::default()
        };
        let catalog = catalog();
        let records = filter.apply(&catalog);

        assert_eq!(records.len(), 10);
        assert!(records[..3].iter().all(|r| r.is_running()));
        assert!(records[3..]
            .windows(2)
            .all(|w| w[0].start_time >= w[1].start_time));
    }

    #[test]
    fn test_filters_combine() {
        let catalog = catalog();
        let filter = ExperimentFilter {
            status: Some(ExperimentStatus::Completed),
            team: Some("Research".to_string()),
            researcher: None,
            limit: usize::MAX,
        };

        let records = filter.apply(&catalog);
        assert!(records
            .iter()
            .all(|r| r.status == ExperimentStatus::Completed && r.team == "Research"));

        let expected = catalog
            .by_team("Research")
            .into_iter()
            .filter(|r| r.status == ExperimentStatus::Completed)
            .count();
        assert_eq!(records.len(), expected);
    }

    #[test]
    fn test_unknown_researcher_matches_nothing() {
        let filter = ExperimentFilter {
            researcher: Some("Nobody".to_string()),
            limit: usize::MAX,
            ..ExperimentFilter::default()
        };
        assert!(filter.apply(&catalog()).is_empty());
    }
}
