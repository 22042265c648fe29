//! Per-epoch breakdown of one experiment

use anyhow::{Context, Result};
use colored::Colorize;
use spend_lib::format::{format_currency, format_duration, format_percent};
use spend_lib::generator::{ExperimentCatalog, ExperimentGenerator};
use tabled::Tabled;

use crate::output::{self, color_status, color_utilization, OutputFormat};

#[derive(Tabled)]
struct EpochRow {
    #[tabled(rename = "Epoch")]
    epoch: u32,
    #[tabled(rename = "Cumulative Cost")]
    cost: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Loss")]
    loss: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "GPU Util")]
    utilization: String,
}

pub fn show_epochs(
    catalog: &ExperimentCatalog,
    generator: &mut ExperimentGenerator,
    id: &str,
    format: OutputFormat,
) -> Result<()> {
    let epochs = catalog
        .epoch_metrics(id, generator)
        .with_context(|| format!("Cannot show epochs for {}", id))?;

    match format {
        OutputFormat::Json => output::print_json(&epochs)?,
        OutputFormat::Table => {
            if let Some(record) = catalog.get(id) {
                output::print_heading(&format!("{} ({})", record.name, record.id), '=');
                println!(
                    "Model: {}   Status: {}   Total: {}",
                    record.model_name.cyan(),
                    color_status(record.status),
                    format_currency(record.total_cost)
                );
                println!();
            }

            output::print_table(
                epochs
                    .iter()
                    .map(|e| EpochRow {
                        epoch: e.epoch,
                        cost: format_currency(e.cost),
                        accuracy: format_percent(e.accuracy),
                        loss: format!("{:.4}", e.loss),
                        duration: format_duration(e.duration_minutes / 60.0),
                        utilization: color_utilization(e.gpu_utilization),
                    })
                    .collect(),
            );
        }
    }

    Ok(())
}
