//! Daily spend history and projection

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use spend_lib::aggregate;
use spend_lib::format::{format_currency, format_percent};
use spend_lib::generator::{generate_cost_projection, generate_historical_data};
use spend_lib::models::{CostProjection, HistoricalCostData, ProjectionConfidence};
use tabled::Tabled;

use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct SpendHistory {
    history: Vec<HistoricalCostData>,
    projection: Vec<CostProjection>,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Spend")]
    cost: String,
    #[tabled(rename = "Experiments")]
    experiments: u32,
    #[tabled(rename = "Avg Util")]
    utilization: String,
}

#[derive(Tabled)]
struct ProjectionRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Projected")]
    cost: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

pub fn show_history(days: u32, project: u32, seed: Option<u64>, format: OutputFormat) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let history = generate_historical_data(&mut rng, Utc::now().date_naive(), days);
    let projection = generate_cost_projection(&mut rng, &history, project);
    let report = SpendHistory { history, projection };

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => {
            output::print_heading(&format!("Daily Spend (last {} days)", days), '=');
            output::print_table(
                report
                    .history
                    .iter()
                    .map(|d| HistoryRow {
                        date: d.date.format("%b %-d").to_string(),
                        cost: format_currency(d.total_cost),
                        experiments: d.experiments,
                        utilization: format_percent(d.avg_utilization),
                    })
                    .collect(),
            );

            let total = aggregate::sum(report.history.iter().map(|d| d.total_cost));
            let daily = aggregate::average(report.history.iter().map(|d| d.total_cost));
            println!("Total:          {}", format_currency(total).cyan());
            if let Some(daily) = daily {
                println!("Daily average:  {}", format_currency(daily));
            }
            println!();

            output::print_heading(&format!("Projection (next {} days)", project), '-');
            output::print_table(
                report
                    .projection
                    .iter()
                    .map(|p| ProjectionRow {
                        date: p.date.format("%b %-d").to_string(),
                        cost: format_currency(p.projected_cost),
                        confidence: match p.confidence {
                            ProjectionConfidence::High => "high".green().to_string(),
                            ProjectionConfidence::Medium => "medium".yellow().to_string(),
                            ProjectionConfidence::Low => "low".red().to_string(),
                        },
                    })
                    .collect(),
            );
        }
    }

    Ok(())
}
