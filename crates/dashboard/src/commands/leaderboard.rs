//! Spend leaderboards

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use spend_lib::aggregate::SpendBreakdown;
use spend_lib::format::format_currency;
use spend_lib::generator::ExperimentCatalog;
use spend_lib::models::ExperimentRecord;
use tabled::Tabled;

use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct Leaderboard<'a> {
    most_expensive: Vec<&'a ExperimentRecord>,
    best_roi: Vec<&'a ExperimentRecord>,
    by_team: Vec<SpendBreakdown>,
    by_researcher: Vec<SpendBreakdown>,
}

#[derive(Tabled)]
struct RankedRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Experiment")]
    name: String,
    #[tabled(rename = "Researcher")]
    researcher: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Gain")]
    gain: String,
    #[tabled(rename = "ROI")]
    roi: String,
}

#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Name")]
    key: String,
    #[tabled(rename = "Spend")]
    spend: String,
    #[tabled(rename = "Experiments")]
    experiments: usize,
    #[tabled(rename = "Avg ROI")]
    avg_roi: String,
}

fn ranked(records: &[&ExperimentRecord]) -> Vec<RankedRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| RankedRow {
            rank: i + 1,
            name: r.name.clone(),
            researcher: r.researcher.clone(),
            cost: format_currency(r.total_cost),
            gain: format!("+{:.1}%", r.accuracy_gain),
            roi: format!("{:.3}", r.roi),
        })
        .collect()
}

fn breakdown(rows: &[SpendBreakdown], top: usize) -> Vec<BreakdownRow> {
    rows.iter()
        .take(top)
        .enumerate()
        .map(|(i, b)| BreakdownRow {
            rank: i + 1,
            key: b.key.clone(),
            spend: format_currency(b.total_cost),
            experiments: b.experiments,
            avg_roi: b
                .avg_roi
                .map(|roi| format!("{:.3}", roi))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn show_leaderboard(catalog: &ExperimentCatalog, top: usize, format: OutputFormat) -> Result<()> {
    let board = Leaderboard {
        most_expensive: catalog.top_expensive(top),
        best_roi: catalog.best_roi(top),
        by_team: catalog.spend_by_team(),
        by_researcher: catalog.spend_by_researcher(),
    };

    match format {
        OutputFormat::Json => output::print_json(&board)?,
        OutputFormat::Table => {
            output::print_heading("Most Expensive Experiments", '=');
            output::print_table(ranked(&board.most_expensive));
            println!();

            output::print_heading("Best ROI (completed)", '=');
            output::print_table(ranked(&board.best_roi));
            println!();

            output::print_heading("Spend by Team", '-');
            output::print_table(breakdown(&board.by_team, top));
            println!();

            output::print_heading("Spend by Researcher", '-');
            output::print_table(breakdown(&board.by_researcher, top));

            println!(
                "\n{} {}",
                "Total historical spend:".bold(),
                format_currency(catalog.total_spend()).cyan()
            );
        }
    }

    Ok(())
}
